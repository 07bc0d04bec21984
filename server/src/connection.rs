//! Connection handles and the per-connection writer task
//!
//! Every accepted socket is split in two. The read half belongs to the reader
//! task in [`crate::network`]; the write half belongs to a writer task spawned
//! here. The relay actor never touches a socket directly: it pushes chunks
//! into a bounded outbound queue through a [`ConnectionHandle`] and closes
//! connections by cancelling the handle's token. A recipient that stops
//! reading can therefore only fill its own queue, never stall the actor.

use crate::error::SendError;
use crate::utils::Redactor;
use bytes::Bytes;
use log::{debug, warn};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on flushing one queued chunk after a connection was closed
pub const DRAIN_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Process-unique id assigned by the acceptor, in accept order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cheap, cloneable reference to one live connection
///
/// Clones share the same outbound queue and the same close token, so closing
/// any clone closes the connection for everyone. Closing is idempotent.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Creates a handle and the receiving end of its outbound queue
    ///
    /// `capacity` must be non-zero.
    pub fn new(id: ConnectionId, peer: SocketAddr, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (outbound, rx) = mpsc::channel(capacity);
        let handle = Self {
            id,
            peer,
            outbound,
            closed: CancellationToken::new(),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Registry key: the peer's full address
    pub fn identity(&self) -> SocketAddr {
        self.peer
    }

    /// Ban key: the peer's address without the port
    pub fn ip(&self) -> IpAddr {
        self.peer.ip()
    }

    /// Queues a chunk for the writer task without waiting
    pub fn send(&self, chunk: Bytes) -> Result<(), SendError> {
        if self.closed.is_cancelled() {
            return Err(SendError::Closed);
        }
        self.outbound.try_send(chunk).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Closes the connection. Chunks already queued are still flushed.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection has been closed by anyone
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

/// Spawns the task that owns `writer` and drains `rx` into it
pub fn spawn_writer<W>(
    writer: W,
    rx: mpsc::Receiver<Bytes>,
    conn: &ConnectionHandle,
    evict_on_failure: bool,
    redactor: Redactor,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let closed = conn.close_token();
    let peer = conn.identity();
    tokio::spawn(async move {
        writer_loop(writer, rx, closed, peer, evict_on_failure, redactor).await;
    })
}

/// Writes queued chunks in order until the connection is closed
///
/// On close, whatever is still queued (a ban notice, typically) is flushed
/// with a per-chunk timeout and the write side is shut down. A failed write
/// closes the connection when `evict_on_failure` is set, which makes the
/// reader task report the disconnect to the relay.
async fn writer_loop<W>(
    mut writer: W,
    mut rx: mpsc::Receiver<Bytes>,
    closed: CancellationToken,
    peer: SocketAddr,
    evict_on_failure: bool,
    redactor: Redactor,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            _ = closed.cancelled() => {
                drain(&mut writer, &mut rx, peer, redactor).await;
                break;
            }

            chunk = rx.recv() => {
                let Some(chunk) = chunk else {
                    break;
                };
                let result = tokio::select! {
                    result = writer.write_all(&chunk) => result,
                    // Back to the top of the loop, which drains and exits
                    _ = closed.cancelled() => continue,
                };
                if let Err(e) = result {
                    warn!("Could not send data to {}: {}", redactor.addr(&peer), e);
                    if evict_on_failure {
                        closed.cancel();
                    }
                }
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of {} failed: {}", redactor.addr(&peer), e);
    }
}

async fn drain<W>(writer: &mut W, rx: &mut mpsc::Receiver<Bytes>, peer: SocketAddr, redactor: Redactor)
where
    W: AsyncWrite + Unpin,
{
    while let Ok(chunk) = rx.try_recv() {
        match tokio::time::timeout(DRAIN_WRITE_TIMEOUT, writer.write_all(&chunk)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Dropping queued output for {}: {}", redactor.addr(&peer), e);
                return;
            }
            Err(_) => {
                debug!("Timed out flushing output for {}", redactor.addr(&peer));
                return;
            }
        }
    }
}
