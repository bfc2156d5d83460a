//! Connection Handler Module
//!
//! This module handles individual client connections to LineKV.
//! Each client gets its own handler task that runs in a loop,
//! reading lines and sending replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned with a fresh ConnectionContext
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Split complete lines off    │
//!    │  the buffer ─> handle_line   │
//!    │  ─> write "reply\n"          │
//!    │                              │
//!    │  No complete line? Read more │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. DISCONNECT / client closes / I/O error
//!        │
//!        ▼
//! 5. Handler task ends, context dropped
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a `BytesMut`. TCP is a stream, so one read may
//! hold half a line or several lines; only complete lines are handled. A line
//! longer than [`MAX_LINE_LENGTH`] closes the connection.

use crate::commands::{CommandError, CommandHandler, ConnectionContext, Response};
use crate::protocol::Reply;
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Maximum length of a single line (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total lines handled
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct owns the stream, the read buffer and the connection's
/// [`ConnectionContext`]. It is generic over the stream so that anything
/// byte-oriented (a `TcpStream`, an in-memory duplex) can be served.
pub struct ConnectionHandler<S> {
    /// The client stream
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared databases)
    command_handler: CommandHandler,

    /// Selected database and transaction state for this client only
    context: ConnectionContext,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            context: ConnectionContext::new(),
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// This method reads lines from the client, executes them, and sends
    /// back replies until the client disconnects, sends DISCONNECT, or an
    /// error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Handle every complete line already buffered
            while let Some(line) = self.next_line() {
                if self.process_line(line).await? {
                    return self.close().await;
                }
            }

            // Need more data - read from the socket
            if !self.read_more_data().await? {
                // EOF: a final line without a newline still counts
                if !self.buffer.is_empty() {
                    let line = self.buffer.split().freeze();
                    if self.process_line(line).await? {
                        return self.close().await;
                    }
                }
                return Err(ConnectionError::ClientDisconnected);
            }
        }
    }

    /// Splits the next complete line off the buffer, without its line ending.
    fn next_line(&mut self) -> Option<Bytes> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(end + 1);
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }

        trace!(
            client = %self.addr,
            length = line.len(),
            remaining = self.buffer.len(),
            "Split line"
        );
        Some(line.freeze())
    }

    /// Handles one line and writes its reply.
    ///
    /// Returns `true` when the client asked to disconnect.
    async fn process_line(&mut self, line: Bytes) -> Result<bool, ConnectionError> {
        let text = match std::str::from_utf8(&line) {
            Ok(text) => text,
            Err(_) => {
                debug!(client = %self.addr, "Line is not valid UTF-8");
                self.stats.command_processed();
                self.send_reply(&Reply::Error(CommandError::malformed())).await?;
                return Ok(false);
            }
        };

        self.stats.command_processed();
        match self.command_handler.handle_line(text, &mut self.context) {
            Response::Reply(reply) => {
                self.send_reply(&reply).await?;
                Ok(false)
            }
            Response::Close => {
                debug!(client = %self.addr, "Client sent DISCONNECT");
                Ok(true)
            }
        }
    }

    /// Reads more data from the socket into the buffer.
    ///
    /// Returns `false` once the client has closed its side.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        // Check line length limit
        if self.buffer.len() >= MAX_LINE_LENGTH {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Line length limit exceeded"
            );
            return Err(ConnectionError::LineTooLong);
        }

        // Ensure we have some capacity
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        // Read data
        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(false);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(true)
    }

    /// Sends a reply to the client, newline-terminated.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = format!("{}\n", reply);
        self.stream.write_all(bytes.as_bytes()).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent reply"
        );
        Ok(())
    }

    /// Flushes and shuts down the write side.
    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Line length limit exceeded
    #[error("Line length limit exceeded")]
    LineTooLong,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
///
/// # Arguments
///
/// * `stream` - The client stream
/// * `addr` - The client's socket address
/// * `command_handler` - The command handler for executing commands
/// * `stats` - Shared connection statistics
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DatabaseRegistry;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn create_handler() -> CommandHandler {
        CommandHandler::new(Arc::new(DatabaseRegistry::new()))
    }

    async fn create_test_server() -> (SocketAddr, Arc<DatabaseRegistry>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let registry = Arc::new(DatabaseRegistry::new());
        let stats = Arc::new(ConnectionStats::new());

        let handler = CommandHandler::new(Arc::clone(&registry));
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = handler.clone();
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, handler, stats));
            }
        });

        (addr, registry, stats)
    }

    /// A line-oriented test client.
    struct Client {
        reader: BufReader<TcpStream>,
    }

    impl Client {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            Self {
                reader: BufReader::new(stream),
            }
        }

        /// Sends a line and reads `lines` lines of reply.
        async fn send(&mut self, line: &str, lines: usize) -> String {
            self.reader
                .get_mut()
                .write_all(format!("{}\n", line).as_bytes())
                .await
                .unwrap();

            let mut reply = String::new();
            for _ in 0..lines {
                self.reader.read_line(&mut reply).await.unwrap();
            }
            reply
        }

        async fn command(&mut self, line: &str) -> String {
            self.send(line, 1).await
        }
    }

    #[tokio::test]
    async fn test_mock_ping() {
        let stream = tokio_test::io::Builder::new()
            .read(b"PING\n")
            .write(b"PONG\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            create_handler(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_mock_split_and_pipelined_lines() {
        let stream = tokio_test::io::Builder::new()
            .read(b"SET foo ")
            .read(b"bar\r\nGET foo\nGET missing\n")
            .write(b"OK\n")
            .write(b"\"bar\"\n")
            .write(b"(nil)\n")
            .build();

        let stats = Arc::new(ConnectionStats::new());
        let handler = ConnectionHandler::new(stream, test_addr(), create_handler(), Arc::clone(&stats));
        let _ = handler.run().await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_mock_invalid_utf8() {
        let stream = tokio_test::io::Builder::new()
            .read(b"GET \xff\xfe\nPING\n")
            .write(b"(error) ERR unknown command\n")
            .write(b"PONG\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            create_handler(),
            Arc::new(ConnectionStats::new()),
        );
        let _ = handler.run().await;
    }

    #[tokio::test]
    async fn test_mock_blank_lines_get_replies() {
        let stream = tokio_test::io::Builder::new()
            .read(b"\n  \r\nPING\n")
            .write(b"(error) ERR unknown command\n")
            .write(b"(error) ERR unknown command\n")
            .write(b"PONG\n")
            .build();

        let stats = Arc::new(ConnectionStats::new());
        let handler = ConnectionHandler::new(stream, test_addr(), create_handler(), Arc::clone(&stats));
        let _ = handler.run().await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_mock_disconnect_stops_reading() {
        let stream = tokio_test::io::Builder::new()
            .read(b"PING\nDISCONNECT\n")
            .write(b"PONG\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            create_handler(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(handler.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_line_too_long() {
        let long = vec![b'a'; MAX_LINE_LENGTH];
        let stream = tokio_test::io::Builder::new().read(&long).build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            create_handler(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::LineTooLong)
        ));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _) = create_test_server().await;
        let mut client = Client::connect(addr).await;

        assert_eq!(client.command("PING").await, "PONG\n");
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let (addr, _, _) = create_test_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"INCR n").await.unwrap();
        stream.shutdown().await.unwrap();

        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert_eq!(reply, "(integer) 1\n");
    }

    #[tokio::test]
    async fn test_blank_line_is_unknown_command() {
        let (addr, _, _) = create_test_server().await;
        let mut client = Client::connect(addr).await;

        assert_eq!(client.command("   ").await, "(error) ERR unknown command\n");
        assert_eq!(client.command("").await, "(error) ERR unknown command\n");
        assert_eq!(client.command("PING").await, "PONG\n");
    }

    #[tokio::test]
    async fn test_many_connections() {
        let (addr, _, _) = create_test_server().await;

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                tokio::spawn(async move {
                    let mut client = Client::connect(addr).await;
                    client.command("PING").await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), "PONG\n");
        }
    }

    #[tokio::test]
    async fn test_set_get() {
        let (addr, _, _) = create_test_server().await;
        let mut client = Client::connect(addr).await;

        assert_eq!(client.command("SET name John").await, "OK\n");
        assert_eq!(client.command("GET name").await, "\"John\"\n");
    }

    #[tokio::test]
    async fn test_transaction_over_tcp() {
        let (addr, _, _) = create_test_server().await;
        let mut client = Client::connect(addr).await;

        assert_eq!(client.command("MULTI").await, "OK\n");
        assert_eq!(client.command("SET foo bar").await, "QUEUED\n");
        assert_eq!(client.command("GET foo").await, "QUEUED\n");
        assert_eq!(client.send("EXEC", 2).await, "1) OK\n2) \"bar\"\n");
    }

    #[tokio::test]
    async fn test_same_index_is_shared() {
        let (addr, registry, _) = create_test_server().await;

        let mut first = Client::connect(addr).await;
        assert_eq!(first.command("SET name John").await, "OK\n");
        assert_eq!(first.command("INCRBY age 23").await, "(integer) 23\n");

        let mut second = Client::connect(addr).await;
        assert_eq!(second.command("GET name").await, "\"John\"\n");
        assert_eq!(second.command("GET age").await, "\"23\"\n");

        assert_eq!(registry.select(0).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_different_indexes_are_isolated() {
        let (addr, _, _) = create_test_server().await;

        let mut first = Client::connect(addr).await;
        let mut second = Client::connect(addr).await;

        assert_eq!(first.command("SELECT 1").await, "OK\n");
        assert_eq!(first.command("SET name John").await, "OK\n");
        assert_eq!(second.command("SELECT 2").await, "OK\n");
        assert_eq!(second.command("SET name Mills").await, "OK\n");

        assert_eq!(first.command("GET name").await, "\"John\"\n");
        assert_eq!(second.command("GET name").await, "\"Mills\"\n");

        // A new connection starts on database 0
        let mut third = Client::connect(addr).await;
        assert_eq!(third.command("GET name").await, "(nil)\n");
        assert_eq!(third.command("SELECT 1").await, "OK\n");
        assert_eq!(third.command("GET name").await, "\"John\"\n");
    }

    #[tokio::test]
    async fn test_concurrent_incrby_over_tcp() {
        let (addr, registry, _) = create_test_server().await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                tokio::spawn(async move {
                    let mut client = Client::connect(addr).await;
                    for _ in 0..50 {
                        client.command("INCRBY hits 1").await;
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.select(0).unwrap().get("hits").unwrap(), "400");
    }

    #[tokio::test]
    async fn test_disconnect_closes_socket() {
        let (addr, _, stats) = create_test_server().await;
        let mut client = Client::connect(addr).await;

        assert_eq!(client.command("PING").await, "PONG\n");
        client
            .reader
            .get_mut()
            .write_all(b"DISCONNECT\n")
            .await
            .unwrap();

        let mut rest = String::new();
        let n = client.reader.read_line(&mut rest).await.unwrap();
        assert_eq!(n, 0);

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = Client::connect(addr).await;

        // Give the server time to accept the connection
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.command("PING").await;

        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        // Close connection
        drop(client);

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
