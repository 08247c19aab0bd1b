//! Page structure handling
//!
//! Snapshots arrive as loosely-typed element lists captured by the browser
//! side. This module reduces them to [`DomElement`]s, slices large snapshots
//! into chunks, accumulates cross-chunk findings and detects login walls.

mod chunk;
mod context;
mod element;
mod login;

pub use chunk::{chunk, DEFAULT_CHUNK_SIZE};
pub use context::AccumulatedContext;
pub use element::{summarize, DomElement};
pub use login::{is_login_wall, LoginSignals};
