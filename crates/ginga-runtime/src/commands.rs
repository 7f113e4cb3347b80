//! Actor command handling.
//!
//! The hub forwards commands addressed to this actor as lines of the form
//! `<commander> <mid> <verb> [args...]`. Each command is answered with one or
//! more reply lines, the last of which carries a terminal code (`:` or `f`).

use std::net::SocketAddr;

use ginga_core::config::CommandsConfig;
use ginga_core::{ActorError, Result};
use ginga_keys::protocol::{format_reply, Keyword, ReplyCode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

// ── CommandHandler ────────────────────────────────────────────────────────────

/// Answers the actor's vocabulary: `ping` and `status`.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    actor_name: String,
    version: String,
}

impl CommandHandler {
    /// Handler reporting this crate's version in `status`.
    pub fn new(actor_name: impl Into<String>) -> Self {
        Self::with_version(actor_name, env!("CARGO_PKG_VERSION"))
    }

    pub fn with_version(actor_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            actor_name: actor_name.into(),
            version: version.into(),
        }
    }

    /// Reply lines for one command line.
    ///
    /// Lines too short to carry a commander and message id cannot be
    /// answered and are reported as errors.
    pub fn handle(&self, line: &str) -> Result<Vec<String>> {
        let mut tokens = line.split_whitespace();
        let (Some(commander), Some(mid)) = (tokens.next(), tokens.next()) else {
            return Err(ActorError::Protocol(format!("unaddressed command: {line:?}")));
        };
        let mid: i64 = mid
            .parse()
            .map_err(|_| ActorError::Protocol(format!("invalid message id in {line:?}")))?;
        let verb = tokens.next();
        debug!(actor = %self.actor_name, commander, mid, ?verb, "command received");

        let text = |s: &str| vec![Keyword::new("text", vec![s.to_string()])];
        let replies = match verb {
            Some("ping") => vec![format_reply(commander, mid, ReplyCode::Finished, &text("ok"))],
            Some("status") => vec![
                format_reply(
                    commander,
                    mid,
                    ReplyCode::Info,
                    &[Keyword::new("version", vec![self.version.clone()])],
                ),
                format_reply(commander, mid, ReplyCode::Finished, &[]),
            ],
            Some(other) => vec![format_reply(
                commander,
                mid,
                ReplyCode::Failed,
                &text(&format!("Unmatched command: {other}")),
            )],
            None => vec![format_reply(commander, mid, ReplyCode::Failed, &text("No command given"))],
        };
        Ok(replies)
    }
}

// ── CommandServer ─────────────────────────────────────────────────────────────

/// TCP listener accepting command connections from the hub.
pub struct CommandServer {
    listener: TcpListener,
    handler: CommandHandler,
}

impl CommandServer {
    /// Bind the command listener. Port 0 picks a free port; see
    /// [`CommandServer::local_addr`].
    pub async fn bind(config: &CommandsConfig, handler: CommandHandler) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        Ok(Self { listener, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, serving each on its own task.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "listening for commands");
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "command connection accepted");
                    let handler = self.handler.clone();
                    tokio::spawn(serve_connection(stream, handler));
                }
                Err(e) => warn!(error = %e, "failed to accept command connection"),
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, handler: CommandHandler) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "error reading command");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let replies = match handler.handle(&line) {
            Ok(replies) => replies,
            Err(e) => {
                warn!(error = %e, "ignoring command");
                continue;
            }
        };
        for reply in replies {
            if let Err(e) = write.write_all(format!("{reply}\n").as_bytes()).await {
                warn!(error = %e, "failed to write reply");
                return;
            }
        }
    }
    debug!("command connection closed");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
