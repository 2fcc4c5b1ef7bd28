//! These models represent the objects passed around by the agent
//!
//! Conversations arrive from the server as internal messages, travel to the LLM
//! in the OpenAI chat format, and tool calls are dispatched to the systems that
//! own them. We always immediately convert wire formats into these internal
//! structs using to/from helpers, so they are not an exact match for any one
//! of those formats.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
