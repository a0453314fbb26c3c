//! Chat orchestration

mod chat;

pub use chat::ChatAgent;
