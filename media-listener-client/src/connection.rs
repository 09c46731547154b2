//! Connection to the media daemon
//!
//! Provides the reconnecting read loop that turns socket bytes into
//! [`Event`](media_listener_protocol::Event)s, and the [`Connector`]
//! abstraction it opens sockets through.

mod connector;
mod manager;

#[cfg(unix)]
pub use connector::UnixConnector;
pub use connector::{Connector, EventStream};
pub(crate) use manager::ConnectionManager;
