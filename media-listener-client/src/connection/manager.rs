//! Reconnecting read loop
//!
//! The manager owns the socket and the [`Framer`] and is the only writer of
//! [`ConnectionState`]. Every suspension point (connect, read, blocked push
//! and backoff wait) races the cancellation token so a stop request is
//! honoured promptly.

use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use media_listener_protocol::{decode, Framer};
use media_listener_utils::{ClientError, Result};

use super::Connector;
use crate::backoff::Backoff;
use crate::channel::{EventSender, PushOutcome};
use crate::config::ClientConfig;
use crate::sink::ErrorSink;
use crate::state::ConnectionState;

/// Why a connected session ended
enum SessionEnd {
    /// Stop requested
    Cancelled,
    /// Consumer went away
    ChannelClosed,
    /// Connection-level fault; reconnect
    Failed(ClientError),
}

pub(crate) struct ConnectionManager<C: Connector> {
    connector: C,
    backoff: Backoff,
    max_retries: Option<u32>,
    max_frame_size: usize,
    read_buffer_size: usize,
    framer: Framer,
    events: EventSender,
    sink: Box<dyn ErrorSink>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl<C: Connector> ConnectionManager<C> {
    pub(crate) fn new(
        connector: C,
        config: &ClientConfig,
        events: EventSender,
        sink: Box<dyn ErrorSink>,
        state: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            backoff: Backoff::from_config(&config.backoff),
            max_retries: config.backoff.max_retries,
            max_frame_size: config.max_frame_size.max(1),
            read_buffer_size: config.read_buffer_size.max(1),
            framer: Framer::with_capacity(config.read_buffer_size.max(1)),
            events,
            sink,
            state,
            cancel,
        }
    }

    /// Drive the connection until stopped, the consumer leaves, or retries run out
    pub(crate) async fn run(mut self) {
        let endpoint = self.connector.endpoint();
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect() => result,
            };

            let end = match connected {
                Ok(stream) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    self.sink.on_connected(&endpoint);

                    let end = self.read_stream(stream).await;
                    self.framer.clear();
                    self.sink.on_disconnected();
                    end
                }
                Err(err) => SessionEnd::Failed(err),
            };

            match end {
                SessionEnd::Cancelled => break,
                SessionEnd::ChannelClosed => {
                    tracing::debug!("Event receiver dropped, stopping");
                    break;
                }
                SessionEnd::Failed(err) => self.sink.report(&err),
            }

            attempt = attempt.saturating_add(1);
            if let Some(max) = self.max_retries {
                if attempt > max {
                    self.sink
                        .report(&ClientError::RetriesExhausted { attempts: attempt });
                    break;
                }
            }

            let delay = self.backoff.delay(attempt);
            let backoff_until = Instant::now() + delay;
            self.set_state(ConnectionState::Reconnecting {
                attempt,
                backoff_until,
            });
            tracing::info!(
                endpoint = %endpoint,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to media daemon"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep_until(backoff_until) => {}
            }
        }

        self.set_state(ConnectionState::Closed);
        self.events.close();
        tracing::debug!(endpoint = %endpoint, "Connection manager stopped");
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::trace!(state = %state, "Connection state changed");
        self.state.send_replace(state);
    }

    async fn read_stream(&mut self, mut stream: C::Stream) -> SessionEnd {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
                read = stream.read(&mut buf) => read,
            };

            let n = match read {
                Ok(0) => return SessionEnd::Failed(ClientError::ConnectionClosed),
                Ok(n) => n,
                Err(e) => return SessionEnd::Failed(ClientError::Io(e)),
            };

            if let Some(end) = self.process_chunk(&buf[..n]).await {
                return end;
            }
        }
    }

    /// Frame, decode and deliver one chunk
    ///
    /// Returns `Some` when the session has to end.
    async fn process_chunk(&mut self, chunk: &[u8]) -> Option<SessionEnd> {
        let Self {
            framer,
            events,
            sink,
            cancel,
            max_frame_size,
            ..
        } = self;
        let max = *max_frame_size;

        for frame in framer.feed(chunk) {
            if frame.len() > max {
                return Some(SessionEnd::Failed(ClientError::FrameTooLarge {
                    size: frame.len(),
                    max,
                }));
            }

            let event = match decode(&frame) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(err) => {
                    sink.report(&ClientError::Decode(err));
                    continue;
                }
            };

            let pushed: Result<PushOutcome> = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Some(SessionEnd::Cancelled),
                pushed = events.push(event) => pushed,
            };

            match pushed {
                Ok(PushOutcome::Queued) => {}
                Ok(PushOutcome::Evicted(old)) => {
                    tracing::debug!(kind = old.kind(), "Event buffer full, dropped oldest event");
                }
                Err(_) => return Some(SessionEnd::ChannelClosed),
            }
        }

        let pending = framer.pending();
        if pending > max {
            return Some(SessionEnd::Failed(ClientError::FrameTooLarge {
                size: pending,
                max,
            }));
        }

        None
    }
}
