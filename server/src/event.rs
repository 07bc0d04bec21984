//! Events flowing from the acceptor and reader tasks into the relay actor

use crate::connection::ConnectionHandle;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Connection lifecycle and data events, processed one at a time by the relay
#[derive(Debug)]
pub enum Event {
    /// Sent by the acceptor before the connection's reader task starts
    Connected(ConnectionHandle),
    /// One chunk read from the socket, relayed verbatim
    MessageReceived { conn: ConnectionHandle, text: Bytes },
    /// Last event a reader task ever sends for its connection
    Disconnected(ConnectionHandle),
}

impl Event {
    /// The connection this event refers to
    pub fn connection(&self) -> &ConnectionHandle {
        match self {
            Event::Connected(conn) => conn,
            Event::MessageReceived { conn, .. } => conn,
            Event::Disconnected(conn) => conn,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
