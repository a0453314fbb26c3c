//! Chat-completions protocol layer
//!
//! Wire types, SSE stream reassembly, and the streaming client the
//! orchestrator drives.

mod client;
mod error;
pub mod streaming;
mod types;

pub use client::{ChatApi, ChatCompletionsClient};
pub use error::LlmError;
pub use types::*;
