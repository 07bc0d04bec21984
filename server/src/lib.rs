//! # Chat Relay Server Library
//!
//! This library provides a minimal TCP broadcast chat relay. Clients connect
//! over a raw socket and every chunk one client sends is relayed verbatim to
//! all other connected clients. Abuse is kept in check with per-client rate
//! limiting, strike accumulation and timed IP bans.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Event Loop
//! All mutable state (the client registry and the ban list) lives inside one
//! actor task, [`relay::Relay`]. Every other task talks to it only through a
//! single unbounded, ordered event queue. Events are processed one at a time
//! to completion, so there are no locks and no data races by construction.
//!
//! ### Task Layout
//! - **Acceptor**: accepts sockets, sends `Connected`, spawns the per-connection tasks
//! - **Reader Task** (one per connection): turns socket reads into
//!   `MessageReceived` events and finishes with exactly one `Disconnected`
//! - **Writer Task** (one per connection): drains a bounded outbound queue
//!   into the socket, so a slow client cannot stall the relay
//! - **Relay**: applies rate-limit and ban policy, fans messages out
//!
//! ### No Framing
//! Whatever a single socket read returns is treated as one message. Lines are
//! a client convention only.
//!
//! ## Module Organization
//!
//! ### Ban List Module (`ban_list`)
//! Timed IP bans, expired lazily on the next connection attempt.
//!
//! ### Client Manager Module (`client_manager`)
//! Registered connections with their last-accepted-message time and strike count.
//!
//! ### Config Module (`config`)
//! Startup configuration and validation.
//!
//! ### Connection Module (`connection`)
//! Cloneable connection handles and the writer task behind them.
//!
//! ### Event Module (`event`)
//! The tagged event type carried by the queue.
//!
//! ### Network Module (`network`)
//! Listener bootstrap, accept loop and the reader task.
//!
//! ### Relay Module (`relay`)
//! The actor itself.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::RelayConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(RelayConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod ban_list;
pub mod client_manager;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod network;
pub mod relay;
pub mod utils;
