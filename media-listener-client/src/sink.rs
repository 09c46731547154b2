//! Error sink trait and built-in sinks
//!
//! The connection manager never surfaces recoverable errors through the
//! event stream. Malformed records and connection faults are handed to an
//! [`ErrorSink`] instead, and the stream keeps going.

use media_listener_utils::{ClientError, ERROR_TARGET};

/// Longest slice of a bad record included in log output
const RAW_PREVIEW_LEN: usize = 120;

/// Receiver for non-fatal errors raised by the connection manager
pub trait ErrorSink: Send + 'static {
    /// Report a recoverable error
    fn report(&mut self, error: &ClientError);

    /// Called when a connection is established
    fn on_connected(&mut self, _endpoint: &str) {}

    /// Called once for every session that reached `on_connected`, when it
    /// ends for any reason, including stop and a closed event channel
    fn on_disconnected(&mut self) {}
}

/// Default sink: forwards everything to `tracing` under [`ERROR_TARGET`]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&mut self, error: &ClientError) {
        match error {
            ClientError::Decode(decode) => match decode.raw() {
                Some(raw) => tracing::warn!(
                    target: ERROR_TARGET,
                    error = %decode,
                    raw = %preview(raw),
                    "Skipping malformed record"
                ),
                None => {
                    tracing::warn!(target: ERROR_TARGET, error = %decode, "Skipping invalid record")
                }
            },
            ClientError::SocketNotFound { .. } | ClientError::ConnectionRefused { .. } => {
                tracing::debug!(target: ERROR_TARGET, error = %error, "Daemon not reachable")
            }
            ClientError::Io(_)
            | ClientError::Connection(_)
            | ClientError::ConnectionClosed
            | ClientError::FrameTooLarge { .. } => {
                tracing::warn!(target: ERROR_TARGET, error = %error, "Connection lost")
            }
            ClientError::RetriesExhausted { .. } => {
                tracing::error!(target: ERROR_TARGET, error = %error, "Giving up on daemon")
            }
            ClientError::FileRead { .. }
            | ClientError::FileWrite { .. }
            | ClientError::ChannelClosed
            | ClientError::Config(_)
            | ClientError::ConfigInvalid { .. }
            | ClientError::Internal(_) => {
                tracing::error!(target: ERROR_TARGET, error = %error, "Client error")
            }
        }
    }

    fn on_connected(&mut self, endpoint: &str) {
        tracing::info!(target: ERROR_TARGET, endpoint, "Connected to media daemon");
    }

    fn on_disconnected(&mut self) {
        tracing::info!(target: ERROR_TARGET, "Disconnected from media daemon");
    }
}

/// Simple callback-based sink
pub struct CallbackSink<F>
where
    F: FnMut(&ClientError) + Send + 'static,
{
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(&ClientError) + Send + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ErrorSink for CallbackSink<F>
where
    F: FnMut(&ClientError) + Send + 'static,
{
    fn report(&mut self, error: &ClientError) {
        (self.callback)(error);
    }
}

fn preview(raw: &str) -> &str {
    if raw.len() <= RAW_PREVIEW_LEN {
        return raw;
    }
    let mut end = RAW_PREVIEW_LEN;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}
