//! Records returned by the Anonium REST API.
//!
//! Comment records live in [`crate::comments::types`]; this module covers
//! the remaining shapes the client reads: the signed-in account, posts,
//! communities and chat messages.

use crate::comments::types::{CommunityId, PostId, RawComment};
use crate::error::{AnoniumError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The account behind the current cookie session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id.
    pub id: u64,
    /// Public handle.
    #[serde(default)]
    pub username: String,
    /// True for throwaway guest accounts.
    #[serde(default)]
    pub is_guest: bool,
}

/// Who the backend thinks we are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A registered account is signed in.
    SignedIn(Account),
    /// A guest account is active.
    Guest(Account),
    /// No session cookie, or it expired.
    Anonymous,
}

impl SessionState {
    /// Maps an `/accounts/me/` account to a session state.
    pub fn from_account(account: Account) -> Self {
        if account.is_guest {
            SessionState::Guest(account)
        } else {
            SessionState::SignedIn(account)
        }
    }

    /// The active account, if any.
    pub fn account(&self) -> Option<&Account> {
        match self {
            SessionState::SignedIn(account) | SessionState::Guest(account) => Some(account),
            SessionState::Anonymous => None,
        }
    }

    /// Short label for display.
    pub fn label(&self) -> String {
        match self {
            SessionState::SignedIn(a) => format!("signed in as {}", a.username),
            SessionState::Guest(a) => format!("guest ({})", a.username),
            SessionState::Anonymous => "anonymous".to_string(),
        }
    }
}

/// A post, as shown above its comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id.
    pub id: PostId,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub body: String,
    /// Community the post was made in.
    #[serde(default)]
    pub community: Option<CommunityId>,
    /// Total comments, as counted by the server.
    #[serde(default)]
    pub comments_count: u64,
    /// Net score.
    #[serde(default)]
    pub score: i64,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Community id.
    pub id: CommunityId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Member count.
    #[serde(default)]
    pub members_count: u64,
}

/// A moderator group-chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Message id, increasing over time.
    pub id: u64,
    /// Author display name.
    pub author: Option<String>,
    /// Message text.
    pub body: String,
    /// Creation timestamp.
    pub created_at: Option<String>,
}

/// Chat message as it arrives from the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChatMessage {
    /// Message id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Author, as a string or object.
    #[serde(default)]
    pub author: Option<Value>,
    /// Message text.
    #[serde(default)]
    pub body: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl TryFrom<RawChatMessage> for ChatMessage {
    type Error = AnoniumError;

    fn try_from(raw: RawChatMessage) -> Result<Self> {
        let id = raw
            .id
            .filter(|id| *id > 0)
            .ok_or_else(|| AnoniumError::validation("Chat message is missing a valid id"))?;

        let author = match raw.author {
            Some(Value::String(s)) => Some(s),
            Some(Value::Object(map)) => map
                .get("username")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };

        Ok(Self {
            id: id as u64,
            author,
            body: raw.body.unwrap_or_default(),
            created_at: raw.created_at,
        })
    }
}

/// List endpoints answer either with a bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    /// `[...]`
    Plain(Vec<T>),
    /// `{"results": [...], ...}`
    Paged {
        /// The page items.
        results: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    /// Returns the items regardless of envelope.
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListResponse::Plain(items) | ListResponse::Paged { results: items } => items,
        }
    }
}

/// Top-level comments response.
pub type CommentListResponse = ListResponse<RawComment>;
