//! SSRC source-set reconciliation
//!
//! Signaling messages after session establishment only carry deltas: a
//! source-add lists the SSRCs (and groups) to add, a source-remove those to
//! take away. These functions apply such deltas to a point-in-time snapshot
//! of a description, and build the sources-only payloads sent for local
//! stream changes.
//!
//! Group validity: a [`SourceGroup`] survives only while every SSRC it
//! references is present in the same content's sources.

use std::collections::HashSet;

use tracing::debug;

use crate::jingle::{Application, Content, Description, SourceGroup};

/// Source parameters never echoed in outbound descriptions
const UNUSED_LABELS: [&str; 2] = ["mslabel", "label"];

/// Append the delta's sources and groups to `current`
///
/// Sources are concatenated without de-duplication: adding an SSRC that is
/// already present yields two entries. Groups are concatenated and then
/// checked against the combined source set.
pub fn add_sources(current: &mut Application, delta: &Application) {
    current.sources.extend(delta.sources.iter().cloned());
    current
        .source_groups
        .extend(delta.source_groups.iter().cloned());
    prune_orphan_groups(current);
}

/// Remove the delta's sources and groups from `current`
///
/// Each delta SSRC removes the first entry with the same SSRC; unknown SSRCs
/// are ignored. A group is removed only by an exact structural match (same
/// semantics, same SSRCs in the same order). Groups left referencing a
/// removed SSRC are dropped afterwards.
pub fn remove_sources(current: &mut Application, delta: &Application) {
    for source in &delta.sources {
        if let Some(index) = current.sources.iter().position(|s| s.ssrc == source.ssrc) {
            current.sources.remove(index);
        }
    }

    for group in &delta.source_groups {
        if let Some(index) = current
            .source_groups
            .iter()
            .position(|g| groups_match(g, group))
        {
            current.source_groups.remove(index);
        }
    }

    prune_orphan_groups(current);
}

fn groups_match(a: &SourceGroup, b: &SourceGroup) -> bool {
    a.semantics == b.semantics
        && a.sources.len() == b.sources.len()
        && a.sources.iter().zip(&b.sources).all(|(x, y)| x == y)
}

/// Drop groups that reference an SSRC missing from the application's sources
pub fn prune_orphan_groups(application: &mut Application) {
    let ssrcs: HashSet<u32> = application.sources.iter().map(|s| s.ssrc).collect();
    let before = application.source_groups.len();
    application
        .source_groups
        .retain(|group| !group.sources.is_empty() && group.sources.iter().all(|ssrc| ssrcs.contains(ssrc)));
    let dropped = before - application.source_groups.len();
    if dropped > 0 {
        debug!("Dropped {} orphaned source group(s)", dropped);
    }
}

/// Restrict an RTP content to the sources of one media stream
///
/// Sources whose msid parameter (slot 1) does not name `stream_id`, or that
/// have no such parameter, are removed, and transient attributes are
/// stripped. Non-RTP contents are left untouched.
pub fn filter_for_stream(content: &mut Content, stream_id: &str) {
    if !content.application.is_rtp() {
        return;
    }
    strip_transient_attributes(content);

    content
        .application
        .sources
        .retain(|source| source.stream_id() == Some(stream_id));
    prune_orphan_groups(&mut content.application);
}

/// Remove transport, codec payload and header extension data from a content
/// so it can be sent in a sources-only delta
pub fn strip_transient_attributes(content: &mut Content) {
    content.transport = None;
    content.application.payloads.clear();
    content.application.header_extensions.clear();
    content.application.mux = false;
}

/// Remove `mslabel` and `label` source parameters
pub fn strip_unused_labels(content: &mut Content) {
    for source in &mut content.application.sources {
        source
            .parameters
            .retain(|parameter| !UNUSED_LABELS.contains(&parameter.key.as_str()));
    }
}

/// Keep only RTP contents that still carry sources, and drop bundle groups
pub fn retain_source_contents(description: &mut Description) {
    description
        .contents
        .retain(|content| content.application.is_rtp() && !content.application.sources.is_empty());
    description.groups.clear();
}

/// Build the source-add / source-remove payload for one local stream
///
/// Returns `None` when no content carries a source of the stream.
pub fn stream_delta(mut description: Description, stream_id: &str) -> Option<Description> {
    for content in &mut description.contents {
        filter_for_stream(content, stream_id);
    }
    sources_delta(description)
}

/// Reduce a whole description to a sources-only payload
///
/// Contents left without sources are dropped. Returns `None` when nothing
/// remains to announce.
pub fn sources_delta(mut description: Description) -> Option<Description> {
    description.contents.iter_mut().for_each(strip_transient_attributes);
    retain_source_contents(&mut description);
    (!description.contents.is_empty()).then_some(description)
}

/// Merge a remote source-add into a remote description snapshot
///
/// Contents are matched by name; delta contents with no counterpart are
/// ignored. Returns the number of matched contents.
pub fn apply_source_add(remote: &mut Description, delta: &Description) -> usize {
    apply_by_name(remote, delta, add_sources)
}

/// Subtract a remote source-remove from a remote description snapshot
pub fn apply_source_remove(remote: &mut Description, delta: &Description) -> usize {
    apply_by_name(remote, delta, remove_sources)
}

fn apply_by_name(
    remote: &mut Description,
    delta: &Description,
    op: fn(&mut Application, &Application),
) -> usize {
    let mut matched = 0;
    for content in &mut remote.contents {
        for change in delta.contents.iter().filter(|c| c.name == content.name) {
            op(&mut content.application, &change.application);
            matched += 1;
        }
    }
    matched
}
