//! Error types for the relay

use std::io;
use thiserror::Error;

/// Rejected configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("strike limit must be greater than 0")]
    ZeroStrikeLimit,
    #[error("ban duration must be greater than 0")]
    ZeroBanDuration,
    #[error("outbound queue capacity must be greater than 0")]
    ZeroOutboundCapacity,
    #[error("read buffer size must be greater than 0")]
    ZeroReadBuffer,
}

/// Errors that stop the relay from starting
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Why a chunk could not be queued for a connection
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}
