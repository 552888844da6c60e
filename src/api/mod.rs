//! REST access to the Anonium backend.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{Account, ChatMessage, Community, Post, SessionState};
