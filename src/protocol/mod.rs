//! Caller-facing protocol
//!
//! Message types plus the two transports that carry them: newline-delimited
//! JSON over stdio, and a WebSocket endpoint served with axum.

mod server;
mod types;
pub mod ws;

pub use server::SessionServer;
pub use types::{
    now_rfc3339, InboundMessage, OutboundMessage, PageAnalysis, PageUnderstanding,
    ProgressEvaluation, SnapshotContext, SnapshotPayload, INBOUND_TYPES,
};
