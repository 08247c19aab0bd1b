//! Session server
//!
//! Owns the shared [`Orchestrator`] and drives one [`GoalSession`] per
//! connection. In stdio mode the single connection is stdin/stdout: one JSON
//! message per input line, one JSON message per output line.

use crate::error::{Error, Result};
use crate::orchestrator::{GoalSession, Orchestrator};
use crate::protocol::OutboundMessage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, instrument};

/// Server state shared by every connection
#[derive(Clone)]
pub struct SessionServer {
    orchestrator: Orchestrator,
}

impl SessionServer {
    /// Create a server over `orchestrator`
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Shared orchestrator
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Open a session for a new connection
    pub fn connect(&self) -> GoalSession {
        self.orchestrator.metrics().inc_active_sessions();
        let session = self.orchestrator.session();
        info!(session = %session.id(), "Session opened");
        session
    }

    /// Release a connection's session
    pub fn disconnect(&self, session: GoalSession) {
        info!(session = %session.id(), state = %session.state(), "Session closed");
        self.orchestrator.metrics().dec_active_sessions();
        drop(session);
    }

    /// Serve one session over stdin/stdout until stdin closes
    #[instrument(skip(self))]
    pub async fn run_stdio(&self) -> Result<()> {
        info!("Serving one session over stdio");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve_lines(stdin, stdout).await
    }

    /// Serve one session over any line-oriented stream pair
    pub async fn serve_lines<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut session = self.connect();
        let mut lines = reader.lines();

        let outcome = async {
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                debug!("Received {} bytes", line.len());

                for message in session.handle_text(&line).await {
                    write_message(&mut writer, &message).await?;
                }
            }
            Ok::<(), Error>(())
        }
        .await;

        if let Err(e) = &outcome {
            error!("Stdio session aborted: {}", e);
        }
        self.disconnect(session);
        outcome
    }
}

async fn write_message<W>(writer: &mut W, message: &OutboundMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = message.to_json();
    debug!(kind = message.kind(), "Sending {} bytes", json.len());
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
