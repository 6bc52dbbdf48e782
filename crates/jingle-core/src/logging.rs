//! Session-scoped tracing
//!
//! Every queued negotiation task runs inside a `negotiation` span and the
//! primitive event forwarder inside a `jingle_session` span, both carrying
//! the session id. A directive such as
//! `jingle_core[negotiation{sid=abc}]=trace` therefore isolates one session,
//! and [`LogSettings::with_task_timing`] logs how long each negotiation task
//! took when its span closes.
//!
//! Installing a subscriber is left to the embedding application;
//! [`LogSettings::init`] is a convenience for binaries and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::session::SessionId;

/// Directives used when neither `RUST_LOG` nor the settings name any
pub const DEFAULT_FILTER: &str = "jingle_core=info";

/// Span wrapping everything done on behalf of one session
pub fn session_span(sid: &SessionId) -> Span {
    tracing::info_span!("jingle_session", sid = %sid)
}

/// Span wrapping one queued negotiation task
pub fn task_span(sid: &SessionId, task: &str) -> Span {
    tracing::debug_span!("negotiation", sid = %sid, task = task)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

/// Subscriber settings, loadable alongside an application's own config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub filter: String,
    pub format: LogFormat,
    /// Log the duration of each negotiation task when it finishes
    pub task_timing: bool,
    /// Route output through the test harness's captured writer
    #[serde(skip)]
    pub test_writer: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Full,
            task_timing: false,
            test_writer: false,
        }
    }
}

impl LogSettings {
    /// Quiet by default; raise with `RUST_LOG` when debugging a test
    pub fn for_tests() -> Self {
        Self {
            filter: "warn".to_string(),
            format: LogFormat::Compact,
            test_writer: true,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_task_timing(mut self) -> Self {
        self.task_timing = true;
        self
    }

    /// Filter built from `RUST_LOG`, or from the configured directives
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|e| LoggingError::InvalidFilter {
            filter: self.filter.clone(),
            reason: e.to_string(),
        })
    }

    /// Install these settings as the global subscriber
    pub fn init(&self) -> Result<(), LoggingError> {
        let span_events = if self.task_timing {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_span_events(span_events);

        let installed = match (self.format, self.test_writer) {
            (LogFormat::Full, false) => builder.try_init(),
            (LogFormat::Full, true) => builder.with_test_writer().try_init(),
            (LogFormat::Compact, false) => builder.compact().try_init(),
            (LogFormat::Compact, true) => builder.compact().with_test_writer().try_init(),
            (LogFormat::Json, false) => builder.json().try_init(),
            (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
        };
        installed.map_err(|_| LoggingError::AlreadyInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn settings_load_with_defaults_for_missing_fields() {
        let settings: LogSettings = serde_yaml::from_str("format: json\ntask_timing: true\n").unwrap();
        assert_eq!(
            settings,
            LogSettings::default().with_format(LogFormat::Json).with_task_timing()
        );
        assert_eq!(settings.filter, DEFAULT_FILTER);
    }

    #[test]
    fn malformed_filter_is_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let err = LogSettings::default()
            .with_filter("jingle_core=loud")
            .env_filter()
            .unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { ref filter, .. } if filter == "jingle_core=loud"));
    }

    #[test]
    fn second_install_reports_already_installed() {
        let settings = LogSettings::for_tests();
        let _ = settings.init();
        assert_eq!(settings.init(), Err(LoggingError::AlreadyInstalled));
    }
}
