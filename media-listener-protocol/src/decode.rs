//! Frame decoding
//!
//! Turns one frame into an [`Event`]. Failures are per record: callers
//! report them and carry on with the next frame.

use serde::de::Error as _;
use serde_json::{Map, Value};

use crate::event::{Event, Timestamp};

/// Field names accepted as the record discriminant, in priority order.
/// Older daemon builds send `event_type`.
const DISCRIMINANTS: [&str; 2] = ["kind", "event_type"];

/// Per-record decoding failure
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed record: {cause}")]
    Malformed {
        raw: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Record has no kind discriminant")]
    MissingKind,
}

impl DecodeError {
    /// Text of the offending frame, for malformed records
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Malformed { raw, .. } => Some(raw),
            Self::MissingKind => None,
        }
    }
}

/// Decode a single frame
///
/// Returns `Ok(None)` for blank frames. Fields with an unexpected type are
/// dropped from the payload instead of failing the record; an absent or
/// unusable `timestamp` becomes [`Timestamp::Missing`].
pub fn decode(frame: &[u8]) -> Result<Option<Event>, DecodeError> {
    if frame.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(frame).map_err(|cause| malformed(frame, cause))?;

    let Value::Object(mut fields) = value else {
        return Err(malformed(
            frame,
            serde_json::Error::custom("expected a JSON object"),
        ));
    };

    let kind = take_kind(&mut fields).ok_or(DecodeError::MissingKind)?;

    let timestamp = match fields.remove("timestamp") {
        Some(Value::String(text)) => Timestamp::Text(text),
        Some(Value::Number(number)) => number
            .as_f64()
            .map_or(Timestamp::Missing, Timestamp::Unix),
        _ => Timestamp::Missing,
    };

    Ok(Some(Event::from_fields(kind, timestamp, fields)))
}

fn take_kind(fields: &mut Map<String, Value>) -> Option<String> {
    let key = DISCRIMINANTS.iter().find(|key| {
        fields
            .get(**key)
            .and_then(Value::as_str)
            .is_some_and(|kind| !kind.is_empty())
    })?;

    match fields.remove(*key) {
        Some(Value::String(kind)) => Some(kind),
        _ => None,
    }
}

fn malformed(frame: &[u8], cause: serde_json::Error) -> DecodeError {
    DecodeError::Malformed {
        raw: String::from_utf8_lossy(frame).into_owned(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        ApplicationChanged, NowPlaying, Payload, PlaybackState, TrackInfo, NOW_PLAYING_KIND,
    };
    use serde_json::json;

    fn decode_str(line: &str) -> Result<Option<Event>, DecodeError> {
        decode(line.as_bytes())
    }

    // ==================== Known Kind Tests ====================

    #[test]
    fn test_decode_application_changed() {
        let event = decode_str(
            r#"{"kind":"application_changed","timestamp":"T","app_name":"X","playback_state":"playing"}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(event.kind(), "application_changed");
        assert_eq!(event.timestamp(), &Timestamp::Text("T".into()));
        match event.payload() {
            Payload::ApplicationChanged(change) => {
                assert_eq!(change.app_name.as_deref(), Some("X"));
                assert_eq!(change.playback_state, Some(PlaybackState::Playing));
            }
            other => panic!("Expected ApplicationChanged, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_now_playing() {
        let line = json!({
            "event_type": "now_playing_info_changed",
            "timestamp": "2025-06-01T09:30:00Z",
            "event_number": 42,
            "app_name": "Music",
            "playback_state": "paused",
            "track_changed": true,
            "track_info": {
                "title": "Roygbiv",
                "artist": "Boards of Canada",
                "album": "Music Has the Right to Children",
                "duration": 151,
                "elapsed": 12.5
            }
        })
        .to_string();

        let event = decode_str(&line).unwrap().unwrap();
        assert_eq!(event.kind(), NOW_PLAYING_KIND);

        let Payload::NowPlaying(info) = event.payload() else {
            panic!("Expected NowPlaying, got {:?}", event.payload());
        };
        assert_eq!(info.event_number, Some(42));
        assert_eq!(info.app_name.as_deref(), Some("Music"));
        assert_eq!(info.playback_state, Some(PlaybackState::Paused));
        assert_eq!(info.track_changed, Some(true));
        assert_eq!(info.track.title.as_deref(), Some("Roygbiv"));
        assert_eq!(info.track.duration, Some(151.0));
        assert_eq!(info.track.elapsed, Some(12.5));
    }

    #[test]
    fn test_decode_numeric_timestamp() {
        let event = decode_str(r#"{"kind":"application_changed","timestamp":1700000000}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.timestamp(), &Timestamp::Unix(1_700_000_000.0));
    }

    // ==================== Best-Effort Coercion Tests ====================

    #[test]
    fn test_wrong_typed_fields_dropped() {
        let line = json!({
            "kind": "now_playing_info_changed",
            "timestamp": "T",
            "event_number": "seven",
            "app_name": 12,
            "track_changed": "yes",
            "track_info": {
                "title": "Kept",
                "artist": ["not", "a", "string"],
                "duration": "3:20",
                "elapsed": 20
            }
        })
        .to_string();

        let event = decode_str(&line).unwrap().unwrap();
        let Payload::NowPlaying(info) = event.payload() else {
            panic!("Expected NowPlaying");
        };
        assert_eq!(info.event_number, None);
        assert_eq!(info.app_name, None);
        assert_eq!(info.track_changed, None);
        assert_eq!(
            info.track,
            TrackInfo {
                title: Some("Kept".into()),
                elapsed: Some(20.0),
                ..TrackInfo::default()
            }
        );
    }

    #[test]
    fn test_track_info_wrong_type() {
        let event = decode_str(
            r#"{"kind":"now_playing_info_changed","timestamp":"T","track_info":"none"}"#,
        )
        .unwrap()
        .unwrap();
        let Payload::NowPlaying(info) = event.payload() else {
            panic!("Expected NowPlaying");
        };
        assert!(info.track.is_empty());
    }

    // ==================== Unknown Kind Tests ====================

    #[test]
    fn test_unknown_kind_preserves_payload() {
        let event = decode_str(r#"{"kind":"x","timestamp":"T","volume":0.8,"muted":false}"#)
            .unwrap()
            .unwrap();

        assert_eq!(event.kind(), "x");
        let Payload::Unknown(fields) = event.payload() else {
            panic!("Expected Unknown");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["volume"], json!(0.8));
        assert_eq!(fields["muted"], json!(false));
        assert!(!fields.contains_key("kind"));
        assert!(!fields.contains_key("timestamp"));
    }

    #[test]
    fn test_kind_preferred_over_event_type() {
        let event = decode_str(r#"{"kind":"x","event_type":"y","timestamp":"T"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.kind(), "x");
    }

    // ==================== Blank Frame Tests ====================

    #[test]
    fn test_blank_frames_skipped() {
        assert!(decode(b"").unwrap().is_none());
        assert!(decode(b"   \t ").unwrap().is_none());
        assert!(decode(b"\r").unwrap().is_none());
    }

    #[test]
    fn test_trailing_carriage_return_tolerated() {
        let event = decode(b"{\"kind\":\"x\",\"timestamp\":\"T\"}\r").unwrap();
        assert!(event.is_some());
    }

    // ==================== Error Tests ====================

    #[test]
    fn test_malformed_record() {
        let err = decode_str("garbage").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert_eq!(err.raw(), Some("garbage"));
        assert!(err.to_string().starts_with("Malformed record"));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = decode_str("[1,2,3]").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = decode(&[b'{', 0xff, 0xfe, b'}']).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_missing_kind() {
        let err = decode_str(r#"{"timestamp":"T","app_name":"X"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingKind));
        assert!(err.raw().is_none());
    }

    #[test]
    fn test_non_string_kind_is_missing() {
        let err = decode_str(r#"{"kind":5,"timestamp":"T"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingKind));

        let err = decode_str(r#"{"kind":"","timestamp":"T"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingKind));
    }

    // ==================== Timestamp Tests ====================

    #[test]
    fn test_wrong_typed_timestamp_keeps_record() {
        let event = decode_str(
            r#"{"kind":"application_changed","timestamp":true,"app_name":"X","playback_state":"playing"}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(event.timestamp(), &Timestamp::Missing);
        assert_eq!(
            event.payload(),
            &Payload::ApplicationChanged(ApplicationChanged {
                app_name: Some("X".into()),
                playback_state: Some(PlaybackState::Playing),
            })
        );
    }

    #[test]
    fn test_absent_timestamp_keeps_record() {
        let event = decode_str(r#"{"event_type":"application_changed","app_name":"X"}"#)
            .unwrap()
            .unwrap();

        assert_eq!(event.kind(), "application_changed");
        assert!(event.timestamp().is_missing());
        let Payload::ApplicationChanged(change) = event.payload() else {
            panic!("Expected ApplicationChanged, got {:?}", event.payload());
        };
        assert_eq!(change.app_name.as_deref(), Some("X"));
    }

    #[test]
    fn test_null_timestamp_on_unknown_kind() {
        let event = decode_str(r#"{"kind":"x","timestamp":null,"volume":1}"#)
            .unwrap()
            .unwrap();
        assert!(event.timestamp().is_missing());
        let Payload::Unknown(fields) = event.payload() else {
            panic!("Expected Unknown");
        };
        assert!(!fields.contains_key("timestamp"));
    }

    // ==================== Round-Trip Tests ====================

    #[test]
    fn test_now_playing_round_trip() {
        let event = Event::now_playing(
            Timestamp::Text("2025-06-01T09:30:00Z".into()),
            NowPlaying {
                event_number: Some(3),
                app_name: Some("Music".into()),
                playback_state: Some(PlaybackState::Other("buffering".into())),
                track_changed: Some(false),
                track: TrackInfo {
                    title: Some("Windowlicker".into()),
                    artist: Some("Aphex Twin".into()),
                    album: None,
                    duration: Some(367.84),
                    elapsed: Some(0.0),
                },
            },
        );

        let line = event.to_line().unwrap();
        let decoded = decode(line.trim_end().as_bytes()).unwrap().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_unknown_round_trip() {
        let mut fields = Map::new();
        fields.insert("volume".into(), json!(0.25));
        fields.insert("devices".into(), json!(["speaker", "headphones"]));
        let event = Event::from_fields("output_changed", Timestamp::Unix(1_717_000_000.5), fields);

        let line = event.to_line().unwrap();
        let decoded = decode(line.trim_end().as_bytes()).unwrap().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_known_kind_from_fields_round_trip() {
        let mut fields = Map::new();
        fields.insert("app_name".into(), json!("X"));
        let event = Event::from_fields("application_changed", Timestamp::Text("T".into()), fields);

        let line = event.to_line().unwrap();
        let decoded = decode(line.trim_end().as_bytes()).unwrap().unwrap();
        assert_eq!(decoded, event);
        assert!(matches!(decoded.payload(), Payload::ApplicationChanged(_)));
    }

    #[test]
    fn test_missing_timestamp_round_trip() {
        let event = Event::application_changed(Timestamp::Missing, ApplicationChanged::default());

        let line = event.to_line().unwrap();
        assert_eq!(line, "{\"kind\":\"application_changed\"}\n");
        let decoded = decode(line.trim_end().as_bytes()).unwrap().unwrap();
        assert_eq!(decoded, event);
    }
}
