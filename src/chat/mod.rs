//! Community moderator chat.
//!
//! Chat is read by polling: [`spawn_chat_poller`] runs a background task
//! that asks a [`ChatSource`] for messages newer than the last one seen and
//! forwards them over a channel.

pub mod poller;

pub use poller::{spawn_chat_poller, ChatPollerHandle, PollConfig};

use crate::api::types::ChatMessage;
use crate::comments::types::CommunityId;
use crate::error::Result;
use std::future::Future;

/// Backend operation the chat poller depends on.
pub trait ChatSource: Send + Sync + 'static {
    /// Fetches messages of a community chat with an id greater than `after`.
    fn chat_messages(
        &self,
        community: CommunityId,
        after: Option<u64>,
    ) -> impl Future<Output = Result<Vec<ChatMessage>>> + Send;
}
