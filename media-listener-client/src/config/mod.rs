//! Client configuration

mod loader;
mod schema;

pub use loader::{ConfigLoader, SOCKET_ENV};
pub use schema::{BackoffConfig, ClientConfig};
