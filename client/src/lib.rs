//! # Chat Client Library
//!
//! A small terminal client for the chat relay. It connects over plain TCP,
//! sends every line typed on stdin to the relay and prints whatever the relay
//! forwards from other clients.
//!
//! The relay does no framing, so the client does none either: lines are sent
//! with a trailing newline and received bytes are printed exactly as they
//! arrive. When the relay bans the client it sends a notice and closes the
//! socket, which ends the session.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{connect, run_session};
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = connect("127.0.0.1:6969").await?;
//!     let stdin = BufReader::new(tokio::io::stdin());
//!     run_session(stream, stdin, tokio::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod network;
