//! media-listener-client: subscribe to media playback events
//!
//! Connects to the media_listener daemon's UNIX socket, decodes its
//! newline-delimited JSON records and hands typed [`Event`]s to the
//! consumer. Connection loss is handled with exponential backoff; bad
//! records are reported to an [`ErrorSink`] and skipped.
//!
//! This crate provides:
//! - [`MediaClient`] / [`ClientHandle`], the consumer API
//! - [`ClientConfig`] and its TOML [`ConfigLoader`]
//! - The bounded [`event_channel`] with [`OverflowPolicy`] control
//! - The [`Connector`] seam for alternative transports

pub mod backoff;
pub mod channel;
pub mod client;
pub mod config;
pub mod connection;
pub mod sink;
pub mod state;

pub use backoff::Backoff;
pub use channel::{event_channel, EventReceiver, EventSender, OverflowPolicy, PushOutcome};
pub use client::{ClientBuilder, ClientHandle, MediaClient, StopHandle};
pub use config::{BackoffConfig, ClientConfig, ConfigLoader, SOCKET_ENV};
#[cfg(unix)]
pub use connection::UnixConnector;
pub use connection::{Connector, EventStream};
pub use sink::{CallbackSink, ErrorSink, TracingSink};
pub use state::ConnectionState;

// Re-export the event model so consumers need only this crate
pub use media_listener_protocol::{
    ApplicationChanged, Event, NowPlaying, Payload, PlaybackState, Timestamp, TrackInfo,
};
pub use media_listener_utils::{ClientError, Result};
