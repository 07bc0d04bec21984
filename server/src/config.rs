//! Relay configuration
//!
//! All values are fixed when the process starts. The server binary builds a
//! [`RelayConfig`] from command-line flags (with `CHAT_RELAY_*` environment
//! fallbacks) and validates it before binding.

use crate::error::ConfigError;
use crate::utils::Redactor;
use std::time::Duration;

/// Settings shared by the acceptor, reader/writer tasks and the relay actor
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the listener to
    pub host: String,
    /// TCP port to listen on; 0 picks a free port
    pub port: u16,
    /// Replace peer addresses with a placeholder in all log output
    pub safe_mode: bool,
    /// Minimum interval between two accepted messages from one client
    pub message_rate: Duration,
    /// How long an IP stays banned
    pub ban_duration: Duration,
    /// Consecutive throttled messages that trigger a ban
    pub strike_limit: u32,
    /// Per-connection outbound queue size, in chunks
    pub outbound_capacity: usize,
    /// Evict recipients whose writes fail or whose queue overflows
    pub evict_on_write_failure: bool,
    /// Maximum bytes per socket read
    pub read_buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: shared::DEFAULT_HOST.to_string(),
            port: shared::DEFAULT_PORT,
            safe_mode: false,
            message_rate: shared::DEFAULT_MESSAGE_RATE,
            ban_duration: shared::DEFAULT_BAN_DURATION,
            strike_limit: shared::DEFAULT_STRIKE_LIMIT,
            outbound_capacity: 64,
            evict_on_write_failure: true,
            read_buffer_size: shared::READ_CHUNK_SIZE,
        }
    }
}

impl RelayConfig {
    /// Checks every value the relay cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strike_limit == 0 {
            return Err(ConfigError::ZeroStrikeLimit);
        }
        if self.ban_duration.is_zero() {
            return Err(ConfigError::ZeroBanDuration);
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::ZeroOutboundCapacity);
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::ZeroReadBuffer);
        }
        Ok(())
    }

    /// `host:port` string for binding the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn redactor(&self) -> Redactor {
        Redactor::new(self.safe_mode)
    }
}
