//! media-listener-utils: Common utilities shared across client crates
//!
//! This crate provides:
//! - Unified error types ([`ClientError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{ClientError, Result};
pub use logging::{
    init_logging, init_logging_with_config, library_filter, LogConfig, LogOutput, ERROR_TARGET,
    LOG_ENV,
};

// Re-export commonly used path functions
pub use paths::{config_dir, config_file, default_socket_path, log_dir, state_dir};
