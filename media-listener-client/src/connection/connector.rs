//! Socket establishment

use std::future::Future;
#[cfg(unix)]
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;
#[cfg(unix)]
use tokio::net::UnixStream;

use media_listener_utils::Result;
#[cfg(unix)]
use media_listener_utils::ClientError;

/// Trait alias for streams the read loop can consume
pub trait EventStream: AsyncRead + Unpin + Send + 'static {}
impl<T: AsyncRead + Unpin + Send + 'static> EventStream for T {}

/// Opens a fresh stream to the daemon for each connection attempt
pub trait Connector: Send + 'static {
    type Stream: EventStream;

    /// Attempt one connection
    fn connect(&mut self) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Human-readable description of the remote end, for logs
    fn endpoint(&self) -> String;
}

/// Connects to a UNIX domain socket at a fixed path
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: PathBuf,
}

#[cfg(unix)]
impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl Connector for UnixConnector {
    type Stream = UnixStream;

    async fn connect(&mut self) -> Result<UnixStream> {
        tracing::debug!(path = %self.path.display(), "Connecting to media daemon");
        UnixStream::connect(&self.path)
            .await
            .map_err(|e| ClientError::from_connect_error(e, &self.path))
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }
}
