//! Telnet connections to DX cluster nodes.
//!
//! This module owns the TCP side of the protocol: establishing a
//! connection with bounded retries for one-shot spot submissions, and a
//! long-lived monitoring client that logs in and streams the live spot
//! feed.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::dialect::ClusterDialect;
use crate::error::SubmitError;

/// Default node accepting spot submissions.
pub const CLUSTER_HOST: &str = "dxc.k0xm.net";

/// Default submission port.
pub const CLUSTER_PORT: u16 = 7300;

/// Default node serving the live spot feed.
pub const FEED_HOST: &str = "dxusa.net";

/// Default feed port.
pub const FEED_PORT: u16 = 7300;

/// Lifecycle of a cluster connection. Terminal on `Closed`; there is no
/// reconnection within one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// Settings for establishing a submission connection.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Hostname of the cluster node.
    pub host: String,

    /// Port number.
    pub port: u16,

    /// Deadline for each connection attempt.
    pub connect_timeout: Duration,

    /// Total number of attempts before giving up.
    pub attempts: u32,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            host: CLUSTER_HOST.to_string(),
            port: CLUSTER_PORT,
            connect_timeout: Duration::from_secs(3),
            attempts: 5,
        }
    }
}

impl ConnectConfig {
    /// Set the host and port.
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// One TCP session with a cluster node.
///
/// Owned exclusively by the submission that created it and closed
/// exactly once at the end of that submission, on every path.
pub struct ClusterConnection {
    peer: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    state: ConnectionState,
}

impl ClusterConnection {
    /// Connect to the configured node, retrying timed-out attempts up
    /// to the configured budget.
    pub async fn connect(config: &ConnectConfig) -> Result<Self, SubmitError> {
        let addr = format!("{}:{}", config.host, config.port);
        Self::connect_with(config, move |_attempt| {
            let addr = addr.clone();
            async move { TcpStream::connect(addr).await }
        })
        .await
    }

    /// Connect using an injectable dial function. Each attempt is
    /// bounded by the per-attempt timeout; a timed-out attempt is
    /// logged and retried, any other connection error is fatal on first
    /// occurrence. Exhausting the budget yields `ClusterUnreachable`.
    pub(crate) async fn connect_with<F, Fut>(
        config: &ConnectConfig,
        mut dial: F,
    ) -> Result<Self, SubmitError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = io::Result<TcpStream>>,
    {
        let peer = format!("{}:{}", config.host, config.port);

        for attempt in 1..=config.attempts {
            match timeout(config.connect_timeout, dial(attempt)).await {
                Ok(Ok(stream)) => {
                    debug!("Connected to cluster {} on attempt {}", peer, attempt);
                    let (reader, writer) = stream.into_split();
                    return Ok(Self {
                        peer,
                        reader: BufReader::new(reader),
                        writer,
                        state: ConnectionState::Connected,
                    });
                }
                Ok(Err(e)) => {
                    error!("Failed to connect to cluster at {}: {}", peer, e);
                    return Err(SubmitError::ClusterUnreachable);
                }
                Err(_) => {
                    error!(
                        "Failed to connect to cluster at {}, attempt {} timed out",
                        peer, attempt
                    );
                }
            }
        }

        Err(SubmitError::ClusterUnreachable)
    }

    /// The line stream from the node.
    pub fn reader(&mut self) -> &mut BufReader<OwnedReadHalf> {
        &mut self.reader
    }

    /// Write one newline-terminated line and flush it, so the bytes are
    /// on the wire before any wait for a response begins.
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await?;
        self.writer.flush().await
    }

    /// Close the connection. Idempotent and best-effort: a close
    /// failure is logged, never surfaced.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        if let Err(e) = self.writer.shutdown().await {
            debug!("Error closing connection to {}: {}", self.peer, e);
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Configuration for the monitoring client.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Hostname of the feed node.
    pub host: String,

    /// Port number.
    pub port: u16,

    /// Callsign to use for login.
    pub callsign: String,

    /// Session options sent once after login.
    pub setup_commands: Vec<String>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Read timeout for individual lines; a feed silent for this long
    /// is treated as stale.
    pub read_timeout: Duration,

    /// Whether to automatically reconnect on disconnect.
    pub auto_reconnect: bool,

    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            host: FEED_HOST.to_string(),
            port: FEED_PORT,
            callsign: "N0CALL".to_string(),
            setup_commands: ClusterDialect::default().setup_commands,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(120),
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration with the given callsign.
    pub fn with_callsign(callsign: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
            ..Default::default()
        }
    }

    /// Set the host and port.
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// Events from the monitoring client.
#[derive(Debug)]
pub enum ClusterEvent {
    /// A line was received from the node.
    Line(String),

    /// Connection was established and login completed.
    Connected,

    /// Connection was lost.
    Disconnected(String),

    /// An error occurred.
    Error(String),
}

/// Async monitoring client for the live spot feed.
pub struct ClusterMonitor {
    config: MonitorConfig,
}

impl ClusterMonitor {
    /// Create a new monitor with the given configuration.
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Connect to the feed node and start streaming lines.
    ///
    /// Returns a receiver channel that will receive `ClusterEvent`s.
    /// The connection runs in a background task.
    pub async fn connect(self) -> Result<mpsc::Receiver<ClusterEvent>> {
        let (tx, rx) = mpsc::channel(1000);

        tokio::spawn(async move {
            self.run_connection_loop(tx).await;
        });

        Ok(rx)
    }

    /// Run the main connection loop with auto-reconnect.
    async fn run_connection_loop(self, tx: mpsc::Sender<ClusterEvent>) {
        loop {
            match self.connect_and_stream(&tx).await {
                Ok(()) => {
                    info!("Connection closed normally");
                }
                Err(e) => {
                    error!("Connection error: {}", e);
                    let _ = tx.send(ClusterEvent::Error(e.to_string())).await;
                }
            }

            let _ = tx
                .send(ClusterEvent::Disconnected("Connection lost".to_string()))
                .await;

            if !self.config.auto_reconnect {
                break;
            }

            info!(
                "Reconnecting in {} seconds...",
                self.config.reconnect_delay.as_secs()
            );
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// Connect to the node and stream lines until disconnected.
    async fn connect_and_stream(&self, tx: &mpsc::Sender<ClusterEvent>) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Connecting to {}...", addr);

        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .context("Failed to connect")?;

        info!("Connected to {}", addr);

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line_buf = Vec::with_capacity(256);

        // Wait for the login prompt and send the callsign. Nodes differ
        // here: some prompt explicitly, some just print a banner, so
        // give up waiting for a recognizable prompt after a few lines.
        let mut login_sent = false;
        let mut welcome_lines = 0;

        loop {
            line_buf.clear();

            let read_result = timeout(
                self.config.read_timeout,
                reader.read_until(b'\n', &mut line_buf),
            )
            .await;

            match read_result {
                Ok(Ok(0)) => {
                    // EOF - connection closed
                    return Ok(());
                }
                Ok(Ok(_n)) => {
                    let line = String::from_utf8_lossy(&line_buf);
                    let line = line.trim_end();
                    debug!("Received: {}", line);

                    if !login_sent {
                        welcome_lines += 1;

                        if line.contains("call:")
                            || line.contains("callsign")
                            || line.contains("login")
                            || welcome_lines >= 3
                        {
                            info!("Sending callsign: {}", self.config.callsign);
                            writer
                                .write_all(format!("{}\n", self.config.callsign).as_bytes())
                                .await
                                .context("Failed to send callsign")?;
                            writer.flush().await?;

                            for command in &self.config.setup_commands {
                                debug!("Sending setup command: {}", command);
                                writer
                                    .write_all(format!("{}\n", command).as_bytes())
                                    .await
                                    .context("Failed to send setup command")?;
                                writer.flush().await?;
                            }

                            login_sent = true;
                            let _ = tx.send(ClusterEvent::Connected).await;
                        }
                    } else {
                        // After login, forward all lines
                        if tx.send(ClusterEvent::Line(line.to_string())).await.is_err() {
                            // Receiver dropped
                            return Ok(());
                        }
                    }
                }
                Ok(Err(e)) => {
                    return Err(e).context("Read error");
                }
                Err(_) => {
                    warn!("Read timeout, connection may be stale");
                    return Err(anyhow::anyhow!("Read timeout"));
                }
            }
        }
    }
}
