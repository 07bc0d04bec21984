use log::{debug, info};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Why a chat session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The relay closed the connection (disconnect or ban)
    ServerClosed,
    /// Local input reached EOF
    InputClosed,
}

pub async fn connect(server_addr: &str) -> io::Result<TcpStream> {
    info!("Connecting to {}...", server_addr);
    let stream = TcpStream::connect(server_addr).await?;
    info!("Connected to {}", stream.peer_addr()?);
    Ok(stream)
}

/// Pumps input lines to the relay and relay output to `output`
///
/// Runs until either the relay closes the socket or `input` is exhausted.
/// Bytes from the relay are written out unmodified.
pub async fn run_session<S, I, O>(stream: S, input: I, mut output: O) -> io::Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (mut from_server, mut to_server) = tokio::io::split(stream);
    let mut buffer = vec![0u8; shared::READ_CHUNK_SIZE];
    let mut lines = input.lines();

    loop {
        tokio::select! {
            read = from_server.read(&mut buffer) => {
                let n = read?;
                if n == 0 {
                    debug!("Server closed the connection");
                    output.flush().await?;
                    return Ok(SessionEnd::ServerClosed);
                }
                output.write_all(&buffer[..n]).await?;
                output.flush().await?;
            }
            line = lines.next_line() => {
                let Some(mut line) = line? else {
                    debug!("Input closed");
                    to_server.shutdown().await?;
                    return Ok(SessionEnd::InputClosed);
                };
                line.push('\n');
                to_server.write_all(line.as_bytes()).await?;
            }
        }
    }
}
