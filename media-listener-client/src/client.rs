//! Consumer-facing client handle

#[cfg(unix)]
use std::path::{Path, PathBuf};

use futures::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use media_listener_protocol::Event;
#[cfg(unix)]
use media_listener_utils::Result;

use crate::channel::{event_channel, ChannelCloser, EventReceiver};
use crate::config::ClientConfig;
#[cfg(unix)]
use crate::config::ConfigLoader;
#[cfg(unix)]
use crate::connection::UnixConnector;
use crate::connection::{ConnectionManager, Connector};
use crate::sink::{ErrorSink, TracingSink};
use crate::state::ConnectionState;

/// Entry point for subscribing to the media daemon
///
/// ```no_run
/// use media_listener_client::{ClientConfig, MediaClient};
///
/// # async fn run() {
/// let mut client = MediaClient::start(ClientConfig::default());
/// while let Some(event) = client.next_event().await {
///     println!("{}: {:?}", event.kind(), event.payload());
/// }
/// # }
/// ```
pub struct MediaClient;

#[cfg(unix)]
impl MediaClient {
    /// Start a client on the current tokio runtime
    ///
    /// Never fails: an unreachable daemon shows up as
    /// [`ConnectionState::Reconnecting`] and is retried in the background.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(config: ClientConfig) -> ClientHandle {
        Self::builder(config).start()
    }

    /// Start a client configured by the TOML file at `path`
    ///
    /// Fails if the file cannot be read, does not parse, or holds invalid
    /// settings. Connection problems are still retried in the background.
    pub fn start_from_config_file(path: impl AsRef<Path>) -> Result<ClientHandle> {
        let config = ConfigLoader::load_and_validate_from_path(path.as_ref())?;
        Ok(Self::start(config))
    }

    /// Start a client from the user's config file, or defaults when absent
    ///
    /// `MEDIA_LISTENER_SOCKET` overrides the socket path.
    pub fn start_with_default_config() -> Result<ClientHandle> {
        Ok(Self::start(ConfigLoader::load_and_validate()?))
    }

    /// Start a client against `socket_path`, overriding the configured path
    pub fn connect(socket_path: impl Into<PathBuf>, config: ClientConfig) -> ClientHandle {
        Self::builder(config.with_socket_path(socket_path)).start()
    }

    /// Builder for customising the error sink or connector
    pub fn builder(config: ClientConfig) -> ClientBuilder<UnixConnector> {
        let connector = UnixConnector::new(config.socket_path.clone());
        ClientBuilder::with_connector(config, connector)
    }
}

/// Client builder
pub struct ClientBuilder<C> {
    config: ClientConfig,
    connector: C,
    sink: Box<dyn ErrorSink>,
}

impl<C: Connector> ClientBuilder<C> {
    /// Builder using a custom connector
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the default [`TracingSink`]
    pub fn sink(mut self, sink: impl ErrorSink) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Replace the connector
    pub fn connector<D: Connector>(self, connector: D) -> ClientBuilder<D> {
        ClientBuilder {
            config: self.config,
            connector,
            sink: self.sink,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawn the connection manager and return the consumer handle
    pub fn start(self) -> ClientHandle {
        let (tx, rx) = event_channel(self.config.channel_capacity, self.config.overflow_policy);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let stopper = StopHandle {
            cancel: cancel.clone(),
            closer: rx.closer(),
        };

        tracing::debug!(
            endpoint = %self.connector.endpoint(),
            capacity = rx.capacity(),
            policy = ?rx.policy(),
            "Starting media client"
        );

        let manager =
            ConnectionManager::new(self.connector, &self.config, tx, self.sink, state_tx, cancel);
        let task = tokio::spawn(manager.run());

        ClientHandle {
            receiver: rx,
            state: state_rx,
            stopper,
            task: Some(task),
        }
    }
}

/// Cloneable handle that stops a running client from any task
#[derive(Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
    closer: ChannelCloser,
}

impl StopHandle {
    /// Stop the client; repeated calls are no-ops
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("Stopping media client");
        }
        self.cancel.cancel();
        self.closer.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A running client
///
/// Dropping the handle stops the client.
pub struct ClientHandle {
    receiver: EventReceiver,
    state: watch::Receiver<ConnectionState>,
    stopper: StopHandle,
    task: Option<JoinHandle<()>>,
}

impl ClientHandle {
    /// Wait for the next event
    ///
    /// Returns `None` once the client is stopped and buffered events have
    /// been drained.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take the next event if one is buffered
    pub fn try_next_event(&mut self) -> Option<Event> {
        self.receiver.try_recv()
    }

    /// Stream of events, ending when the client stops
    pub fn events(&mut self) -> impl Stream<Item = Event> + '_ {
        self.receiver.stream()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Events evicted because the consumer fell behind
    pub fn dropped_events(&self) -> u64 {
        self.receiver.dropped()
    }

    /// Number of events waiting to be read
    pub fn buffered(&self) -> usize {
        self.receiver.len()
    }

    pub fn stopper(&self) -> StopHandle {
        self.stopper.clone()
    }

    /// Stop the client; idempotent
    pub fn stop(&self) {
        self.stopper.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopper.is_stopped()
    }

    /// Stop the client and wait for the connection manager to finish
    pub async fn close(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Connection manager task failed");
            }
        }
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
