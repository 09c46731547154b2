//! Configuration schema structs

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use media_listener_utils::default_socket_path;

use crate::channel::{OverflowPolicy, DEFAULT_CAPACITY};

/// Largest frame accepted before the connection is dropped (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Bytes requested per socket read
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Daemon socket (default: /tmp/media_listener.sock)
    pub socket_path: PathBuf,
    /// Events buffered between the socket and the consumer (default: 256)
    pub channel_capacity: usize,
    /// What to do when the buffer is full (default: drop_oldest)
    pub overflow_policy: OverflowPolicy,
    pub max_frame_size: usize,
    pub read_buffer_size: usize,
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            channel_capacity: DEFAULT_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults with a custom socket path
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Self::default()
        }
    }

    pub fn with_socket_path(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.socket_path = socket_path.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff.base_ms = duration_ms(base);
        self.backoff.cap_ms = duration_ms(cap);
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.backoff.jitter_ms = duration_ms(jitter);
        self
    }

    /// Give up after `retries` consecutive failed attempts
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.backoff.max_retries = Some(retries);
        self
    }

    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }
}

/// Reconnect schedule, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First retry delay (default: 500)
    pub base_ms: u64,
    /// Upper bound before jitter (default: 30000)
    pub cap_ms: u64,
    /// Maximum random extra delay (default: 100)
    pub jitter_ms: u64,
    /// Consecutive failures before giving up; unset retries forever
    pub max_retries: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 500,
            cap_ms: 30_000,
            jitter_ms: 100,
            max_retries: None,
        }
    }
}

impl BackoffConfig {
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    pub fn cap(&self) -> Duration {
        Duration::from_millis(self.cap_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
