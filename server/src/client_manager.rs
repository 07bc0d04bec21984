//! Registry of connected chat clients
//!
//! This module tracks every registered connection together with the state the
//! relay needs for rate limiting:
//! - When the client's last accepted message arrived
//! - How many consecutive throttled messages it has sent since then
//!
//! The registry is owned by the relay actor and never shared, so it needs no
//! locking.

use crate::connection::{ConnectionHandle, ConnectionId};
use log::debug;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::time::Instant;

/// A registered connection and its rate-limit state
#[derive(Debug)]
pub struct ClientEntry {
    /// Handle used for relaying to and closing this client
    pub connection: ConnectionHandle,
    /// Time of the last accepted message, or of registration
    pub last_message_at: Instant,
    /// Throttled messages since the last accepted one
    pub strike_count: u32,
}

impl ClientEntry {
    /// Creates an entry with no strikes, timed from `now`
    pub fn new(connection: ConnectionHandle, now: Instant) -> Self {
        Self {
            connection,
            last_message_at: now,
            strike_count: 0,
        }
    }

    /// Records an accepted message, clearing all strikes
    pub fn accept_message(&mut self, now: Instant) {
        self.last_message_at = now;
        self.strike_count = 0;
    }

    /// Records a throttled message and returns the new strike count
    pub fn add_strike(&mut self) -> u32 {
        self.strike_count = self.strike_count.saturating_add(1);
        self.strike_count
    }
}

/// Manages all registered clients, keyed by peer address
///
/// An entry exists exactly while its connection is open and not yet evicted.
/// Removal by connection checks the [`ConnectionId`] so that a late event for
/// an old connection cannot evict a newer one that reuses the same address.
#[derive(Debug, Default)]
pub struct ClientManager {
    clients: HashMap<SocketAddr, ClientEntry>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Registers a connection, replacing any stale entry with the same identity
    ///
    /// Returns the replaced entry's handle so the caller can close it.
    pub fn register(&mut self, connection: ConnectionHandle, now: Instant) -> Option<ConnectionHandle> {
        let identity = connection.identity();
        self.clients
            .insert(identity, ClientEntry::new(connection, now))
            .map(|old| old.connection)
    }

    /// Removes the entry for an identity, whichever connection it holds
    pub fn remove(&mut self, identity: &SocketAddr) -> Option<ClientEntry> {
        self.clients.remove(identity)
    }

    /// Removes the entry only if it belongs to this exact connection
    pub fn remove_connection(&mut self, connection: &ConnectionHandle) -> Option<ClientEntry> {
        let identity = connection.identity();
        match self.clients.get(&identity) {
            Some(entry) if entry.connection.id() == connection.id() => self.clients.remove(&identity),
            Some(entry) => {
                debug!(
                    "Ignoring removal of {} for {}: registered as {}",
                    connection.id(),
                    identity,
                    entry.connection.id()
                );
                None
            }
            None => None,
        }
    }

    /// Looks up the entry for this exact connection
    pub fn get_mut(&mut self, connection: &ConnectionHandle) -> Option<&mut ClientEntry> {
        self.clients
            .get_mut(&connection.identity())
            .filter(|entry| entry.connection.id() == connection.id())
    }

    pub fn get(&self, identity: &SocketAddr) -> Option<&ClientEntry> {
        self.clients.get(identity)
    }

    pub fn contains(&self, identity: &SocketAddr) -> bool {
        self.clients.contains_key(identity)
    }

    /// Handles of every registered client except `sender`
    pub fn recipients_except(&self, sender: &SocketAddr) -> Vec<ConnectionHandle> {
        self.clients
            .iter()
            .filter(|(identity, _)| *identity != sender)
            .map(|(_, entry)| entry.connection.clone())
            .collect()
    }

    /// Ids of all registered connections
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.clients.values().map(|entry| entry.connection.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
