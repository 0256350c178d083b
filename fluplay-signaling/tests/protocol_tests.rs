//! Control protocol tests
//!
//! Covers parsing of the two inbound control messages, rejection of unknown
//! or malformed frames and decoding of init payloads.

use fluplay_core::{FluError, WireMessage};
use fluplay_signaling::*;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn init_message() -> String {
    json!({
        "type": "mse_init_segment",
        "metadata": {
            "tracks": [
                { "content": "video", "bitrate": 2500, "width": 1280 },
                { "content": "audio", "bitrate": 128 }
            ]
        },
        "tracks": [
            { "id": 1, "content": "video", "payload": "AAAAGGZ0eXA=" },
            { "id": 2, "content": "audio", "payload": "AAAAHGZ0eXA=" },
            { "id": 3, "content": "video", "payload": "AAAA" }
        ]
    })
    .to_string()
}

#[test]
fn test_parse_event_message() {
    let text = json!({ "type": "event", "event": { "kind": "resumed" } }).to_string();
    let message = assert_ok!(ServerMessage::parse(&text));
    assert_eq!(message, ServerMessage::Event(json!({ "kind": "resumed" })));
}

#[test]
fn test_parse_event_without_payload() {
    let message = assert_ok!(ServerMessage::parse(r#"{"type":"event"}"#));
    assert_eq!(message, ServerMessage::Event(serde_json::Value::Null));
}

#[test]
fn test_parse_init_segment() {
    let message = assert_ok!(ServerMessage::parse(&init_message()));
    let ServerMessage::InitSegment(init) = message else {
        panic!("expected an init segment");
    };

    assert_eq!(init.metadata.tracks.len(), 2);
    assert_eq!(init.metadata.tracks[0].content, "video");
    assert_eq!(init.metadata.tracks[0].extra["width"], json!(1280));
    assert_eq!(init.tracks.len(), 3);

    // first entry per content wins
    assert_eq!(init.track_for("video").map(|t| t.id), Some(1));
    assert_eq!(init.track_for("audio").map(|t| t.id), Some(2));
    assert!(init.track_for("subtitles").is_none());
}

#[test]
fn test_decode_init_payload() {
    let track = InitTrack {
        id: 1,
        content: "video".to_string(),
        payload: "AAAAGGZ0eXA=".to_string(),
    };
    let payload = assert_ok!(track.decode_payload());
    assert_eq!(&payload[..], &[0, 0, 0, 0x18, b'f', b't', b'y', b'p']);
}

#[test]
fn test_decode_invalid_payload() {
    let track = InitTrack {
        id: 7,
        content: "audio".to_string(),
        payload: "not base64!".to_string(),
    };
    match assert_err!(track.decode_payload()) {
        FluError::PayloadDecode { track_id, .. } => assert_eq!(track_id, 7),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_unknown_type_is_unhandled() {
    let err = assert_err!(ServerMessage::parse(r#"{"type":"stats","bitrate":1}"#));
    assert_eq!(err.error_code(), "UNHANDLED_MESSAGE_TYPE");

    let err = assert_err!(ServerMessage::parse(r#"{"event":"x"}"#));
    match err {
        FluError::UnhandledMessageType { message_type } => assert!(message_type.is_empty()),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_malformed_json_is_invalid() {
    let err = assert_err!(ServerMessage::parse("{not json"));
    assert_eq!(err.error_code(), "INVALID_MESSAGE");
}

#[test]
fn test_classify_frames() {
    let media = assert_ok!(Inbound::classify(WireMessage::Binary(bytes::Bytes::from_static(
        b"\x00\x01"
    ))));
    assert!(matches!(media, Inbound::Media(ref data) if data.len() == 2));

    let control = assert_ok!(Inbound::classify(WireMessage::Text(
        r#"{"type":"event"}"#.to_string()
    )));
    assert!(matches!(control, Inbound::Server(ServerMessage::Event(_))));

    assert_err!(Inbound::classify(WireMessage::Text("[]".to_string())));
}

#[test]
fn test_seek_target_serialization() {
    let json = serde_json::to_string(&SeekTarget::Live).unwrap();
    assert_eq!(json, r#""live""#);

    let target: SeekTarget = serde_json::from_str(r#"{"at":1700000000.0}"#).unwrap();
    assert_eq!(target, SeekTarget::At(1700000000.0));
    assert_eq!(target.to_string(), "1700000000");
}
