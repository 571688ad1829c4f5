//! Connection configuration.

use serde::{Deserialize, Serialize};

/// The public Voltr service endpoint.
pub const DEFAULT_ADDR: &str = "198.58.112.213:8004";

/// Configuration for [`Connection::open`](crate::Connection::open).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Remote `host:port` to connect to.
    pub addr: String,

    /// Capacity of the command channel between handles and the
    /// connection task. Callers that outrun it wait for a slot.
    pub command_buffer: usize,
}

impl ConnectConfig {
    /// Configuration for a specific endpoint, other fields default.
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            command_buffer: 64,
        }
    }
}
