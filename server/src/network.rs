//! Server network layer: accepting sockets and turning reads into events

use crate::config::RelayConfig;
use crate::connection::{spawn_writer, ConnectionHandle, ConnectionId};
use crate::error::RelayError;
use crate::event::{event_channel, Event, EventSender};
use crate::relay::Relay;
use crate::utils::Redactor;
use bytes::Bytes;
use log::{debug, error, info};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections and feeds the relay actor
pub struct Server {
    listener: TcpListener,
    config: RelayConfig,
    next_connection_id: u64,
}

impl Server {
    /// Validates `config` and binds the listener
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;

        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Listening to TCP connections on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            config,
            next_connection_id: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Spawns the relay actor and accepts connections forever
    pub async fn run(mut self) -> Result<(), RelayError> {
        let (events, receiver) = event_channel();
        tokio::spawn(Relay::new(&self.config).run(receiver));

        let redactor = self.config.redactor();
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let id = ConnectionId(self.next_connection_id);
                    self.next_connection_id += 1;
                    info!("Accepted connection from {}", redactor.addr(&peer));

                    if !spawn_connection(stream, peer, id, &self.config, &events) {
                        error!("Relay is gone, stopping acceptor");
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("Connection not accepted: {}", e);
                }
            }
        }
    }
}

/// Wires up one accepted socket: writer task, `Connected` event, reader task
///
/// `Connected` is queued before the reader starts, so the relay always sees
/// it before any event the reader produces. Returns false if the relay has
/// stopped consuming events.
pub fn spawn_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    config: &RelayConfig,
    events: &EventSender,
) -> bool {
    let redactor = config.redactor();
    let (read_half, write_half) = stream.into_split();
    let (conn, outbound) = ConnectionHandle::new(id, peer, config.outbound_capacity);

    spawn_writer(
        write_half,
        outbound,
        &conn,
        config.evict_on_write_failure,
        redactor,
    );

    if events.send(Event::Connected(conn.clone())).is_err() {
        conn.close();
        return false;
    }

    let events = events.clone();
    let buffer_size = config.read_buffer_size;
    tokio::spawn(async move {
        reader_loop(read_half, conn, events, buffer_size, redactor).await;
    });
    true
}

/// Reads chunks until EOF, a read error, or the relay closing the connection
///
/// Each chunk becomes one `MessageReceived`; chunk boundaries are whatever
/// the socket returns. Exactly one `Disconnected` is sent at the end.
pub async fn reader_loop<R>(
    mut reader: R,
    conn: ConnectionHandle,
    events: EventSender,
    buffer_size: usize,
    redactor: Redactor,
) where
    R: AsyncRead + Unpin,
{
    let peer = redactor.addr(&conn.identity());
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let read = tokio::select! {
            biased;
            _ = conn.closed() => None,
            result = reader.read(&mut buffer) => Some(result),
        };

        match read {
            Some(Ok(0)) => {
                info!("Connection closed by client {}", peer);
                break;
            }
            Some(Ok(n)) => {
                let event = Event::MessageReceived {
                    conn: conn.clone(),
                    text: Bytes::copy_from_slice(&buffer[..n]),
                };
                if events.send(event).is_err() {
                    debug!("Relay is gone, reader for {} exiting", peer);
                    return;
                }
            }
            Some(Err(e)) => {
                info!("Could not read from client {}: {}", peer, e);
                break;
            }
            None => {
                debug!("Connection {} closed by relay", peer);
                break;
            }
        }
    }

    let _ = events.send(Event::Disconnected(conn));
}
