//! Typed event model
//!
//! Every record carries a `kind` discriminant and normally a `timestamp`.
//! Known kinds decode into dedicated payload variants; anything else is kept
//! verbatim in [`Payload::Unknown`] so new daemon events are never lost.
//!
//! The wire form is produced by `Serialize`. Decoding is hand-written in
//! [`crate::decode`] because it tolerates wrongly typed fields.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Kind emitted when the now-playing track or its metadata changes
pub const NOW_PLAYING_KIND: &str = "now_playing_info_changed";

/// Kind emitted when a different application takes over playback
pub const APPLICATION_CHANGED_KIND: &str = "application_changed";

/// Record keys written from the event header rather than the payload
const HEADER_FIELDS: [&str; 2] = ["kind", "timestamp"];

/// A decoded media event
///
/// Events are immutable once built: the decoder constructs them and they are
/// moved through the event channel to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    kind: String,
    #[serde(skip_serializing_if = "Timestamp::is_missing")]
    timestamp: Timestamp,
    #[serde(flatten)]
    payload: Payload,
}

impl Event {
    /// Create a `now_playing_info_changed` event
    pub fn now_playing(timestamp: Timestamp, info: NowPlaying) -> Self {
        Self::from_parts(NOW_PLAYING_KIND.into(), timestamp, Payload::NowPlaying(info))
    }

    /// Create an `application_changed` event
    pub fn application_changed(timestamp: Timestamp, change: ApplicationChanged) -> Self {
        Self::from_parts(
            APPLICATION_CHANGED_KIND.into(),
            timestamp,
            Payload::ApplicationChanged(change),
        )
    }

    /// Build an event from a kind and the record's remaining fields
    ///
    /// Known kinds are parsed into their typed payload exactly as the
    /// decoder would, so the result survives an encode/decode cycle. Any
    /// `kind` or `timestamp` key in `fields` is discarded.
    pub fn from_fields(
        kind: impl Into<String>,
        timestamp: Timestamp,
        mut fields: Map<String, Value>,
    ) -> Self {
        let kind = kind.into();
        for key in HEADER_FIELDS {
            fields.remove(key);
        }
        let payload = Payload::from_fields(&kind, fields);
        Self::from_parts(kind, timestamp, payload)
    }

    fn from_parts(kind: String, timestamp: Timestamp, payload: Payload) -> Self {
        Self {
            kind,
            timestamp,
            payload,
        }
    }

    /// The wire discriminant (e.g. `"application_changed"`)
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consume the event, returning its payload
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Build the JSON object this event is transmitted as
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Render the event as a single wire record, delimiter included
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push(crate::DELIMITER as char);
        Ok(line)
    }
}

/// Payload variants keyed by [`Event::kind`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    NowPlaying(NowPlaying),
    ApplicationChanged(ApplicationChanged),
    /// Unrecognised kind; all fields except `kind`/`timestamp`, untouched
    Unknown(Map<String, Value>),
}

impl Payload {
    /// Select the payload variant for `kind`; `fields` holds no header keys
    pub(crate) fn from_fields(kind: &str, fields: Map<String, Value>) -> Self {
        match kind {
            NOW_PLAYING_KIND => Self::NowPlaying(NowPlaying::from_fields(&fields)),
            APPLICATION_CHANGED_KIND => {
                Self::ApplicationChanged(ApplicationChanged::from_fields(&fields))
            }
            _ => Self::Unknown(fields),
        }
    }
}

/// Event timestamp as sent by the daemon
///
/// The daemon normally sends RFC 3339 text, but any string or number is
/// accepted and preserved. A record whose timestamp is absent or of another
/// type is still delivered, with [`Timestamp::Missing`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Text(String),
    /// Seconds since the Unix epoch
    Unix(f64),
    /// No usable `timestamp` field; omitted when encoding
    Missing,
}

impl Timestamp {
    /// Current wall-clock time as RFC 3339 text
    pub fn now() -> Self {
        Utc::now().into()
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Interpret the timestamp as a UTC instant, if possible
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Unix(secs) => {
                if !secs.is_finite() {
                    return None;
                }
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
                Utc.timestamp_opt(whole as i64, nanos).single()
            }
            Self::Missing => None,
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Text(dt.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Unix(secs) => write!(f, "{}", secs),
            Self::Missing => f.write_str("N/A"),
        }
    }
}

/// Player state reported alongside application and track changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    /// A state string this crate does not know about
    Other(String),
}

impl PlaybackState {
    pub fn parse(value: &str) -> Self {
        match value {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Other(other) => other,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PlaybackState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Track metadata from the `track_info` object
///
/// Every field is optional: the daemon only sends what the player exposes,
/// and fields with an unexpected type are dropped during decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Track length in seconds
    #[serde(skip_serializing_if = "no_seconds")]
    pub duration: Option<f64>,
    /// Playback position in seconds
    #[serde(skip_serializing_if = "no_seconds")]
    pub elapsed: Option<f64>,
}

impl TrackInfo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.duration.is_none()
            && self.elapsed.is_none()
    }

    /// Duration as `m:ss`
    pub fn duration_clock(&self) -> Option<String> {
        self.duration.map(format_clock)
    }

    /// Elapsed position as `m:ss`
    pub fn elapsed_clock(&self) -> Option<String> {
        self.elapsed.map(format_clock)
    }

    pub(crate) fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            title: string_field(fields, "title"),
            artist: string_field(fields, "artist"),
            album: string_field(fields, "album"),
            duration: seconds_field(fields, "duration"),
            elapsed: seconds_field(fields, "elapsed"),
        }
    }
}

/// Payload of a `now_playing_info_changed` event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NowPlaying {
    /// Daemon-side sequence number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_state: Option<PlaybackState>,
    /// Set when the change moved to a different track
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_changed: Option<bool>,
    #[serde(rename = "track_info", skip_serializing_if = "TrackInfo::is_empty")]
    pub track: TrackInfo,
}

impl NowPlaying {
    pub(crate) fn from_fields(fields: &Map<String, Value>) -> Self {
        let track = match fields.get("track_info") {
            Some(Value::Object(track_fields)) => TrackInfo::from_fields(track_fields),
            _ => TrackInfo::default(),
        };

        Self {
            event_number: fields.get("event_number").and_then(Value::as_u64),
            app_name: string_field(fields, "app_name"),
            playback_state: string_field(fields, "playback_state")
                .map(|state| PlaybackState::parse(&state)),
            track_changed: fields.get("track_changed").and_then(Value::as_bool),
            track,
        }
    }
}

/// Payload of an `application_changed` event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationChanged {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_state: Option<PlaybackState>,
}

impl ApplicationChanged {
    pub(crate) fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            app_name: string_field(fields, "app_name"),
            playback_state: string_field(fields, "playback_state")
                .map(|state| PlaybackState::parse(&state)),
        }
    }
}

/// Format a number of seconds as `m:ss`
///
/// Negative and non-finite inputs are shown as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn seconds_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields
        .get(key)
        .and_then(Value::as_f64)
        .filter(|secs| secs.is_finite())
}

/// JSON has no representation for non-finite numbers
fn no_seconds(value: &Option<f64>) -> bool {
    !value.is_some_and(f64::is_finite)
}
