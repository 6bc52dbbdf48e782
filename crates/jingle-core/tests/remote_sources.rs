//! Remote source-add / source-remove reconciliation

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

use jingle_core::jingle::{Source, SourceGroup};
use jingle_core::peer::NegotiationPrimitive;
use jingle_core::prelude::*;

async fn established() -> Harness {
    let h = harness_with_stream(SessionConfig::new("alice@example.com"), Some(av_stream("local")));
    h.session
        .process(JingleMessage::SessionInitiate(remote_offer("remote", 5000)))
        .await
        .unwrap();
    h.session.accept(None).await.unwrap();
    h
}

fn video_delta(sources: &[(u32, &str)], groups: Vec<SourceGroup>) -> Description {
    let mut content = Content::new("video", Application::rtp(MediaKind::Video));
    for (ssrc, stream) in sources {
        content = content.with_source(
            Source::new(*ssrc)
                .with_parameter("cname", "remote-cname")
                .with_parameter("msid", format!("{stream} {stream}-video")),
        );
    }
    content.application.source_groups = groups;
    Description::new(vec![content])
}

fn remote(h: &Harness) -> Description {
    h.peer.remote_description().expect("remote description applied")
}

fn remote_video(h: &Harness) -> Vec<u32> {
    remote(h)
        .content("video")
        .map(|c| c.application.sources.iter().map(|s| s.ssrc).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn source_add_merges_into_remote_description_and_renegotiates() {
    let mut h = established().await;
    let handled = h.peer.count("handle_offer");

    h.session
        .process(JingleMessage::SourceAdd(video_delta(&[(7000, "screen")], vec![])))
        .await
        .unwrap();

    assert_eq!(remote_video(&h), vec![5001, 7000]);
    assert_eq!(h.peer.count("handle_offer"), handled + 1);
    assert_eq!(h.peer.calls().last().map(String::as_str), Some("answer"));

    let event = expect_event(&mut h.events, |e| {
        matches!(e, SessionEvent::PeerStreamAdded(s) if s.id == "screen")
    })
    .await;
    assert!(matches!(event, SessionEvent::PeerStreamAdded(_)));
    assert!(h.session.streams().iter().any(|s| s.id == "screen"));
}

#[tokio::test]
async fn repeated_source_add_duplicates_entries() {
    let h = established().await;
    let delta = video_delta(&[(7000, "screen")], vec![]);

    h.session.process(JingleMessage::SourceAdd(delta.clone())).await.unwrap();
    h.session.process(JingleMessage::SourceAdd(delta)).await.unwrap();

    assert_eq!(remote_video(&h), vec![5001, 7000, 7000]);
}

#[tokio::test]
async fn source_remove_takes_out_exact_ssrc() {
    let mut h = established().await;
    h.session
        .process(JingleMessage::SourceAdd(video_delta(&[(7000, "screen")], vec![])))
        .await
        .unwrap();

    h.session
        .process(JingleMessage::SourceRemove(video_delta(&[(7000, "screen")], vec![])))
        .await
        .unwrap();

    assert_eq!(remote_video(&h), vec![5001]);
    expect_event(&mut h.events, |e| {
        matches!(e, SessionEvent::PeerStreamRemoved(s) if s.id == "screen")
    })
    .await;

    // Unknown ssrcs are ignored
    h.session
        .process(JingleMessage::SourceRemove(video_delta(&[(9999, "ghost")], vec![])))
        .await
        .unwrap();
    assert_eq!(remote_video(&h), vec![5001]);
}

#[tokio::test]
async fn groups_follow_their_sources() {
    let h = established().await;
    let fid = SourceGroup::new("FID", vec![7000, 7001]);

    h.session
        .process(JingleMessage::SourceAdd(video_delta(
            &[(7000, "screen"), (7001, "screen")],
            vec![fid.clone(), SourceGroup::new("FID", vec![8000, 8001])],
        )))
        .await
        .unwrap();
    let snapshot = remote(&h);
    assert_eq!(
        snapshot.content("video").unwrap().application.source_groups,
        vec![fid]
    );

    h.session
        .process(JingleMessage::SourceRemove(video_delta(&[(7001, "screen")], vec![])))
        .await
        .unwrap();
    let snapshot = remote(&h);
    let video = snapshot.content("video").unwrap();
    assert!(video.application.source_groups.is_empty());
    assert_eq!(remote_video(&h), vec![5001, 7000]);
}

#[tokio::test]
async fn unmatched_contents_are_ignored() {
    let h = established().await;
    let before = remote(&h);
    let mut delta = video_delta(&[(7000, "screen")], vec![]);
    delta.contents[0].name = "screenshare".to_string();

    h.session.process(JingleMessage::SourceAdd(delta)).await.unwrap();

    assert_eq!(remote(&h), before);
}

#[tokio::test]
async fn renegotiation_failure_is_general_error() {
    let h = established().await;

    h.peer.inject("handle_offer", Fault::Fail);
    let err = h
        .session
        .process(JingleMessage::SourceAdd(video_delta(&[(7000, "screen")], vec![])))
        .await
        .unwrap_err();
    assert_eq!(err.condition, Condition::GeneralError);

    h.peer.inject("answer", Fault::Fail);
    let err = h
        .session
        .process(JingleMessage::SourceRemove(video_delta(&[(5001, "remote")], vec![])))
        .await
        .unwrap_err();
    assert_eq!(err.condition, Condition::GeneralError);

    // Still usable afterwards
    h.session
        .process(JingleMessage::SourceAdd(video_delta(&[(7002, "screen")], vec![])))
        .await
        .unwrap();
}

#[tokio::test]
async fn source_add_without_remote_description_is_general_error() {
    let h = harness(SessionConfig::new("alice@example.com"));

    let err = h
        .session
        .process(JingleMessage::SourceAdd(video_delta(&[(7000, "screen")], vec![])))
        .await
        .unwrap_err();
    assert_eq!(err.condition, Condition::GeneralError);
}

#[tokio::test]
async fn raw_source_add_is_decoded_from_json() {
    let h = established().await;

    h.session
        .process_raw(
            "source-add",
            json!({
                "contents": [{
                    "name": "video",
                    "creator": "initiator",
                    "application": {
                        "applicationType": "rtp",
                        "media": "video",
                        "sources": [{
                            "ssrc": 7100,
                            "parameters": [
                                { "key": "cname", "value": "x" },
                                { "key": "msid", "value": "raw raw-video" }
                            ]
                        }],
                        "sourceGroups": []
                    }
                }]
            }),
        )
        .await
        .unwrap();

    assert_eq!(remote_video(&h), vec![5001, 7100]);

    let err = h
        .session
        .process_raw("source-add", json!({ "contents": [{ "creator": "initiator" }] }))
        .await
        .unwrap_err();
    assert_eq!(err.condition, Condition::BadRequest);
}
