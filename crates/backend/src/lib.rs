//! The Backend Client (C2 in the scheduler design): a single
//! OpenAI-compatible streaming completions client.
//!
//! This crate deliberately supports exactly one wire contract — chat and
//! text completions against `/v1/chat/completions` and `/v1/completions`
//! with SSE streaming — rather than a multi-vendor abstraction. Concrete
//! payload shaping for other vendors is out of scope for the scheduler
//! this client feeds.

pub mod client;
pub mod error;
pub mod types;

pub use client::BackendClient;
pub use error::{BackendError, Result};
pub use types::{
    BackendConfig, BackendRequest, Endpoint, Message, MessageRole, StreamingEvent, UsageTotals,
};
