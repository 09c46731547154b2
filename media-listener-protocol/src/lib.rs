//! media-listener-protocol: wire contract for the media_listener socket
//!
//! The daemon publishes one JSON object per line. This crate defines:
//! - The typed [`Event`] model and its payload variants
//! - [`Framer`], which splits raw socket bytes into newline-delimited frames
//! - [`decode`], which turns a frame into an [`Event`]
//! - [`LineEncoder`], which writes events back into wire form

pub mod codec;
pub mod decode;
pub mod event;
pub mod framer;

// Re-export main types at crate root
pub use codec::{encode_line, LineEncoder};
pub use decode::{decode, DecodeError};
pub use event::{
    format_clock, ApplicationChanged, Event, NowPlaying, Payload, PlaybackState, Timestamp,
    TrackInfo, APPLICATION_CHANGED_KIND, NOW_PLAYING_KIND,
};
pub use framer::{Framer, Frames};

/// Record delimiter on the wire
pub const DELIMITER: u8 = b'\n';
