pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod state;

// Re-export main types for convenience
pub use client::{AskBackend, AskClient, AskRequest, AskResponse};
pub use config::Config;
pub use dispatch::QueryDispatcher;
pub use error::RequestError;
pub use render::{citations, split_emphasis, Segment};
pub use state::{Conversation, Message, PendingQuery, Role, Submission, FALLBACK_ANSWER};
