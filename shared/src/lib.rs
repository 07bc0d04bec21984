use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6969;

/// Written to a client right before the relay closes it for being banned.
pub const BAN_NOTICE: &[u8] = b"You are banned\n";

/// Largest chunk handed to the relay per socket read. Chunks are relayed as-is.
pub const READ_CHUNK_SIZE: usize = 512;

/// Shown in place of peer addresses when safe mode is on.
pub const REDACTED: &str = "[REDACTED]";

pub const DEFAULT_MESSAGE_RATE: Duration = Duration::from_secs(1);
pub const DEFAULT_BAN_DURATION: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_STRIKE_LIMIT: u32 = 10;

/// Default `host:port` the client dials.
pub fn default_server_addr() -> String {
    format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT)
}
