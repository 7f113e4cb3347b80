//! Background connection to the hub's keyword stream.
//!
//! [`HubListener::start`] spawns a tokio task that connects to the hub, reads
//! reply lines, and forwards keyword updates through an `mpsc` channel. When
//! the connection drops the task waits and reconnects; the consumer sees a
//! [`HubEvent::Disconnected`] followed by a fresh [`HubEvent::Connected`].

use std::time::Duration;

use chrono::Utc;
use ginga_core::config::HubConfig;
use ginga_keys::keyvar::KeyVar;
use ginga_keys::protocol::Reply;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// What the listener reports to the actor.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// A connection to the hub was established.
    Connected,
    /// Keyword updates carried by one reply line.
    Keys(Vec<KeyVar>),
    /// The connection was lost or could not be read.
    Disconnected,
}

// ── HubListener ───────────────────────────────────────────────────────────────

/// Connects to the hub and streams its keyword updates.
pub struct HubListener {
    host: String,
    port: u16,
    reconnect_delay: Duration,
}

impl HubListener {
    /// # Parameters
    /// - `host`, `port`: hub address.
    /// - `reconnect_delay`: pause between a dropped or failed connection and
    ///   the next attempt.
    pub fn new(host: impl Into<String>, port: u16, reconnect_delay: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            reconnect_delay,
        }
    }

    /// Listener for the `[hub]` configuration section.
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            Duration::from_secs(config.reconnect_secs),
        )
    }

    /// Spawn the connection loop.
    ///
    /// Returns the receiving end of the event channel and a handle that
    /// aborts the loop.
    pub fn start(self) -> (mpsc::Receiver<HubEvent>, HubHandle) {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(async move {
            self.connection_loop(tx).await;
        });
        (rx, HubHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn connection_loop(self, tx: mpsc::Sender<HubEvent>) {
        loop {
            match TcpStream::connect((self.host.as_str(), self.port)).await {
                Ok(stream) => {
                    info!(host = %self.host, port = self.port, "connected to hub");
                    if tx.send(HubEvent::Connected).await.is_err() {
                        break;
                    }
                    pump_lines(BufReader::new(stream), &tx).await;
                    warn!(host = %self.host, port = self.port, "hub connection closed");
                    if tx.send(HubEvent::Disconnected).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(host = %self.host, port = self.port, error = %e, "failed to connect to hub");
                }
            }

            if tx.is_closed() {
                debug!("hub event channel closed; exiting loop");
                break;
            }
            time::sleep(self.reconnect_delay).await;
        }
    }
}

/// Read reply lines until EOF or a read error, forwarding keyword updates.
///
/// Lines that are not UTF-8 or fail to parse are logged and skipped.
async fn pump_lines<S: AsyncBufRead + Unpin>(mut reader: S, tx: &mpsc::Sender<HubEvent>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "error reading from hub");
                break;
            }
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "skipping non-UTF-8 hub line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match Reply::parse(line) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "skipping unparseable hub line");
                continue;
            }
        };

        let keys = KeyVar::from_reply(&reply, Utc::now());
        if keys.is_empty() {
            continue;
        }
        if tx.send(HubEvent::Keys(keys)).await.is_err() {
            break;
        }
    }
}

// ── HubHandle ─────────────────────────────────────────────────────────────────

/// A handle to the background hub task.
pub struct HubHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl HubHandle {
    /// Immediately abort the connection loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn recv(rx: &mut mpsc::Receiver<HubEvent>) -> HubEvent {
        time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for hub event")
            .expect("hub channel closed")
    }

    #[tokio::test]
    async fn test_pump_lines_skips_garbage_and_empty_replies() {
        let input: &[u8] =
            b"garbage\n\ncmdr 0 ccd_r1 i filepath=\"/r\",\"n\",\"f.fits\"\ncmdr 0 ccd_r1 :\n";
        let (tx, mut rx) = mpsc::channel(8);

        pump_lines(BufReader::new(input), &tx).await;
        drop(tx);

        let Some(HubEvent::Keys(keys)) = rx.recv().await else {
            panic!("expected a keyword update");
        };
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].qualified_name(), "ccd_r1.filepath");
        assert_eq!(keys[0].values, vec!["/r", "n", "f.fits"]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_lines_skips_non_utf8_line_and_keeps_reading() {
        let input: &[u8] =
            b"cmdr 0 ccd_r1 i filepath=\"/r\",\"n\",\"caf\xe9.fits\"\ncmdr 0 ccd_r1 i filepath=\"/r\",\"n\",\"good.fits\"\n";
        let (tx, mut rx) = mpsc::channel(8);

        pump_lines(BufReader::new(input), &tx).await;
        drop(tx);

        let Some(HubEvent::Keys(keys)) = rx.recv().await else {
            panic!("expected the update after the bad line");
        };
        assert_eq!(keys[0].values, vec!["/r", "n", "good.fits"]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_lines_handles_final_line_without_newline() {
        let input: &[u8] = b"cmdr 0 sac i filepath=\"a\",\"b\"";
        let (tx, mut rx) = mpsc::channel(8);

        pump_lines(BufReader::new(input), &tx).await;
        drop(tx);

        let Some(HubEvent::Keys(keys)) = rx.recv().await else {
            panic!("expected a keyword update");
        };
        assert_eq!(keys[0].qualified_name(), "sac.filepath");
    }

    #[tokio::test]
    async fn test_listener_connects_reads_and_reconnects() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let (mut rx, handle) =
            HubListener::new("127.0.0.1", port, Duration::from_millis(20)).start();

        let (mut socket, _) = server.accept().await.unwrap();
        assert_eq!(recv(&mut rx).await, HubEvent::Connected);

        socket
            .write_all(b".hub 0 drp i detrend=\"/d/PFJA00123456_b4.fits\"\n")
            .await
            .unwrap();
        let HubEvent::Keys(keys) = recv(&mut rx).await else {
            panic!("expected a keyword update");
        };
        assert_eq!(keys[0].qualified_name(), "drp.detrend");

        drop(socket);
        assert_eq!(recv(&mut rx).await, HubEvent::Disconnected);

        let (_socket, _) = server.accept().await.unwrap();
        assert_eq!(recv(&mut rx).await, HubEvent::Connected);

        handle.abort();
    }
}
