//! Claude Messages API client.
//!
//! Only the non-streaming endpoint is used: the shipping suggestion forces a
//! single tool call and reads the structured answer from its input.

mod client;
mod error;
pub mod types;

pub use client::ClaudeClient;
pub use error::ClaudeError;
pub use types::{ChatResponse, ContentBlock, Message, MessageContent, Tool, ToolChoice};
