//! GoalPilot - Goal-Directed Browser Automation Orchestrator
//!
//! Given a natural-language goal and successive snapshots of a web page's
//! structure (optionally with a screenshot), GoalPilot answers with one
//! browser action at a time until the goal is reached.
//!
//! # Features
//!
//! - **Planning**: an anticipated step list built once per goal, rebuilt on request
//! - **Chunked analysis**: oversized pages are analysed chunk by chunk with a
//!   running digest of earlier chunks
//! - **Evaluation**: completed / replan / continue verdicts per snapshot
//! - **Login pause**: conservative login-wall detection with user resume
//! - **Transports**: WebSocket (axum) or newline-delimited JSON over stdio
//!
//! # Architecture
//!
//! ```text
//! Browser side ──▶ SessionServer ──▶ GoalSession (state machine)
//!                                          │
//!              ┌───────────────┬───────────┼──────────────┐
//!              ▼               ▼           ▼              ▼
//!         DOM summarize    Chunk + digest  ModelClient   JSON extraction
//!         login check      candidate pick  (timed)       + normalization
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use goalpilot::config::{ModelConfig, OrchestratorConfig};
//! use goalpilot::llm::ChatCompletionsClient;
//! use goalpilot::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = ChatCompletionsClient::new(ModelConfig::from_env()?);
//!     let orchestrator = Orchestrator::new(OrchestratorConfig::default(), Arc::new(model));
//!
//!     let mut session = orchestrator.session();
//!     for reply in session
//!         .handle_text(r#"{"type":"init","message":"search for rust and open the first result"}"#)
//!         .await
//!     {
//!         println!("{}", reply.to_json());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod action;
pub mod config;
pub mod dom;
pub mod error;
pub mod extraction;
pub mod journal;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod protocol;
pub mod sites;

// Re-exports for convenience
pub use action::{Action, ActionKind, Plan};
pub use config::{ModelConfig, OrchestratorConfig};
pub use error::{Error, Result};
pub use llm::{ChatCompletionsClient, ModelClient, ModelRequest, ScriptedModelClient};
pub use orchestrator::{GoalSession, OrchestrationState, Orchestrator};
pub use protocol::{InboundMessage, OutboundMessage, SessionServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
