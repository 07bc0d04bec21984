//! The relay actor
//!
//! [`Relay`] is the single consumer of the event queue and the only owner of
//! the client registry and the ban list. It processes one event to completion
//! before looking at the next, which totally orders every state change without
//! any locks. Handling an event never awaits: relaying a message only pushes
//! chunks into each recipient's bounded outbound queue.
//!
//! Per-client lifecycle:
//!
//! ```text
//! Unregistered --Connected--> Active --Disconnected--> Evicted
//!                                    \--strike limit--> Banned
//! ```

use crate::ban_list::{BanList, BanStatus};
use crate::client_manager::ClientManager;
use crate::config::RelayConfig;
use crate::connection::ConnectionHandle;
use crate::error::SendError;
use crate::event::{Event, EventReceiver};
use crate::utils::Redactor;
use bytes::Bytes;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::Instant;

/// What happened to one `MessageReceived` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Relayed to `recipients` other clients
    Broadcast { recipients: usize },
    /// Dropped for arriving too soon; the sender now has `strikes`
    Throttled { strikes: u32 },
    /// The sender hit the strike limit and was banned
    Banned,
    /// The sender is not registered (already evicted)
    UnknownSender,
}

pub struct Relay {
    clients: ClientManager,
    bans: BanList,
    message_rate: Duration,
    strike_limit: u32,
    evict_on_write_failure: bool,
    redactor: Redactor,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            clients: ClientManager::new(),
            bans: BanList::new(config.ban_duration),
            message_rate: config.message_rate,
            strike_limit: config.strike_limit,
            evict_on_write_failure: config.evict_on_write_failure,
            redactor: config.redactor(),
        }
    }

    /// Processes events until every sender has been dropped
    pub async fn run(mut self, mut events: EventReceiver) {
        info!("Relay started");
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        info!("Event queue closed, relay stopping");
    }

    /// Applies one event to the registries
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected(conn) => self.handle_connected(conn),
            Event::MessageReceived { conn, text } => {
                self.handle_message(&conn, text);
            }
            Event::Disconnected(conn) => self.handle_disconnected(&conn),
        }
    }

    fn handle_connected(&mut self, conn: ConnectionHandle) {
        let now = Instant::now();
        let ip = conn.ip();

        match self.bans.check(&ip, now) {
            BanStatus::Banned { remaining } => {
                info!(
                    "Rejected banned client {} ({}s of ban left)",
                    self.redactor.addr(&conn.identity()),
                    remaining.as_secs()
                );
                // A fresh queue always has room, so the notice is never lost
                let _ = conn.send(Bytes::from_static(shared::BAN_NOTICE));
                conn.close();
                return;
            }
            BanStatus::Expired => {
                info!("Ban on {} has expired", self.redactor.ip(&ip));
            }
            BanStatus::NotBanned => {}
        }

        info!(
            "Client connected {} ({})",
            self.redactor.addr(&conn.identity()),
            conn.id()
        );
        if let Some(stale) = self.clients.register(conn, now) {
            debug!("Replaced stale registration {}", stale.id());
            stale.close();
        }
    }

    fn handle_disconnected(&mut self, conn: &ConnectionHandle) {
        conn.close();
        if self.clients.remove_connection(conn).is_some() {
            info!(
                "Client disconnected {} ({})",
                self.redactor.addr(&conn.identity()),
                conn.id()
            );
        }
    }

    /// Rate-checks a message and relays it, throttles it, or bans its sender
    pub fn handle_message(&mut self, conn: &ConnectionHandle, text: Bytes) -> MessageOutcome {
        let now = Instant::now();
        let sender = conn.identity();

        let Some(author) = self.clients.get_mut(conn) else {
            debug!(
                "Dropping message from unregistered {}",
                self.redactor.addr(&sender)
            );
            return MessageOutcome::UnknownSender;
        };

        let elapsed = now.saturating_duration_since(author.last_message_at);
        if elapsed >= self.message_rate {
            author.accept_message(now);
            info!(
                "Client {} sent message: {}",
                self.redactor.addr(&sender),
                String::from_utf8_lossy(&text)
            );
            let recipients = self.broadcast(conn, text);
            return MessageOutcome::Broadcast { recipients };
        }

        let strikes = author.add_strike();
        if strikes >= self.strike_limit {
            self.ban(conn, now);
            return MessageOutcome::Banned;
        }

        debug!(
            "Throttled message from {} (strike {}/{})",
            self.redactor.addr(&sender),
            strikes,
            self.strike_limit
        );
        MessageOutcome::Throttled { strikes }
    }

    /// Queues `text` for every registered client except the sender
    ///
    /// Returns how many recipients accepted it.
    fn broadcast(&mut self, sender: &ConnectionHandle, text: Bytes) -> usize {
        let mut delivered = 0;
        for recipient in self.clients.recipients_except(&sender.identity()) {
            match recipient.send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(SendError::Full) => {
                    warn!(
                        "Could not send data to {}: {}",
                        self.redactor.addr(&recipient.identity()),
                        SendError::Full
                    );
                    if self.evict_on_write_failure {
                        self.evict(&recipient);
                    }
                }
                Err(SendError::Closed) => {
                    // The reader task reports the disconnect on its own
                    debug!(
                        "Could not send data to {}: {}",
                        self.redactor.addr(&recipient.identity()),
                        SendError::Closed
                    );
                }
            }
        }
        delivered
    }

    fn evict(&mut self, conn: &ConnectionHandle) {
        conn.close();
        if self.clients.remove_connection(conn).is_some() {
            info!(
                "Evicted slow client {} ({})",
                self.redactor.addr(&conn.identity()),
                conn.id()
            );
        }
    }

    fn ban(&mut self, conn: &ConnectionHandle, now: Instant) {
        let ip = conn.ip();
        self.bans.ban(ip, now);
        let _ = conn.send(Bytes::from_static(shared::BAN_NOTICE));
        conn.close();
        self.clients.remove_connection(conn);
        warn!(
            "Banned {} for {}s after {} strikes",
            self.redactor.ip(&ip),
            self.bans.duration().as_secs(),
            self.strike_limit
        );
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn bans(&self) -> &BanList {
        &self.bans
    }
}
