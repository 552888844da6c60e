//! HTTP client for the Anonium REST API.
//!
//! Requests carry the session cookie through reqwest's cookie store; the
//! client itself never stores credentials. Responses are read as text and
//! decoded through the `Raw*` records so malformed bodies surface as
//! [`AnoniumError::InvalidResponse`] rather than transport errors.

use crate::api::types::{
    Account, ChatMessage, CommentListResponse, Community, ListResponse, Post, RawChatMessage,
    SessionState,
};
use crate::chat::ChatSource;
use crate::comments::source::{ChildrenQuery, CommentQuery, CommentSource};
use crate::comments::types::{
    decode_comments, ChildrenPage, Comment, CommentId, CommunityId, PostId, RawChildrenPage,
    RawComment,
};
use crate::config::ClientConfig;
use crate::error::{AnoniumError, Result};
use crate::retry::retry_with_delays;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Longest error body kept in an [`AnoniumError::Api`] message
const MAX_ERROR_BODY: usize = 200;

// =============================================================================
// Paths
// =============================================================================

/// `/api/posts/{id}/comments/`
pub fn post_comments_path(post: PostId) -> String {
    format!("/api/posts/{}/comments/", post)
}

/// `/api/comments/{id}/children/`
pub fn comment_children_path(comment: CommentId) -> String {
    format!("/api/comments/{}/children/", comment)
}

/// `/api/comments/{id}/`
pub fn comment_path(comment: CommentId) -> String {
    format!("/api/comments/{}/", comment)
}

/// `/api/posts/{id}/`
pub fn post_path(post: PostId) -> String {
    format!("/api/posts/{}/", post)
}

/// `/api/communities/{id}/`
pub fn community_path(community: CommunityId) -> String {
    format!("/api/communities/{}/", community)
}

/// `/api/communities/{id}/chat/messages/`
pub fn chat_messages_path(community: CommunityId) -> String {
    format!("/api/communities/{}/chat/messages/", community)
}

/// Session endpoint.
pub const SESSION_PATH: &str = "/accounts/me/";

/// Logout endpoint.
pub const LOGOUT_PATH: &str = "/accounts/logout/";

/// Pulls a readable message out of an error body.
///
/// DRF-style `{"detail": "..."}` bodies yield the detail; anything else is
/// truncated text.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = map.get("detail").and_then(Value::as_str) {
            return detail.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

// =============================================================================
// Client
// =============================================================================

/// Client for the Anonium backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client with cookie store
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
}

impl ApiClient {
    /// Creates a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .user_agent(concat!("anonium/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client with default settings for a custom URL.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let mut config = ClientConfig::default();
        config.set_api_url(&url.into());
        config.validate()?;
        Self::new(&config)
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, String)]) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        if query.is_empty() {
            builder
        } else {
            builder.query(query)
        }
    }

    /// Turns a non-success response into an API error.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AnoniumError::api(status.as_u16(), error_message(status, &body)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.request(Method::GET, path, query).send().await?;
        let response = Self::check(response).await?;
        let body = response.text().await?;
        debug!(path, bytes = body.len(), "response received");

        serde_json::from_str(&body)
            .map_err(|e| AnoniumError::invalid_response(format!("{}: {}", path, e)))
    }

    /// Fetches top-level comments of a post with inline children.
    #[instrument(skip(self, query))]
    pub async fn post_comments(&self, post: PostId, query: &CommentQuery) -> Result<Vec<Comment>> {
        let list: CommentListResponse = self
            .get_json(&post_comments_path(post), &query.to_pairs())
            .await?;
        let comments = decode_comments(list.into_items());
        info!(count = comments.len(), "fetched top-level comments");
        Ok(comments)
    }

    /// Fetches one page of a comment's descendants.
    #[instrument(skip(self, query), fields(excluded = query.exclude_ids.len()))]
    pub async fn comment_children(
        &self,
        comment: CommentId,
        query: &ChildrenQuery,
    ) -> Result<ChildrenPage> {
        let raw: RawChildrenPage = self
            .get_json(&comment_children_path(comment), &query.to_pairs())
            .await?;
        let page = ChildrenPage::from(raw);
        info!(
            items = page.items.len(),
            more = page.has_more(),
            "fetched children page"
        );
        Ok(page)
    }

    /// Fetches a single comment.
    #[instrument(skip(self))]
    pub async fn comment(&self, comment: CommentId) -> Result<Comment> {
        let raw: RawComment = self.get_json(&comment_path(comment), &[]).await?;
        Comment::from_raw(raw, None)
    }

    /// Fetches a single comment, retrying after each delay while it fails.
    pub async fn comment_with_retry(&self, comment: CommentId, delays: &[Duration]) -> Result<Comment> {
        retry_with_delays(delays, "fetch comment", || self.comment(comment)).await
    }

    /// Fetches a post.
    #[instrument(skip(self))]
    pub async fn post(&self, post: PostId) -> Result<Post> {
        self.get_json(&post_path(post), &[]).await
    }

    /// Fetches a community.
    #[instrument(skip(self))]
    pub async fn community(&self, community: CommunityId) -> Result<Community> {
        self.get_json(&community_path(community), &[]).await
    }

    /// Fetches chat messages newer than `after`.
    #[instrument(skip(self))]
    pub async fn chat_messages(
        &self,
        community: CommunityId,
        after: Option<u64>,
    ) -> Result<Vec<ChatMessage>> {
        let query: Vec<(&str, String)> = after
            .map(|id| vec![("after", id.to_string())])
            .unwrap_or_default();
        let list: ListResponse<RawChatMessage> = self
            .get_json(&chat_messages_path(community), &query)
            .await?;

        let messages: Vec<ChatMessage> = list
            .into_items()
            .into_iter()
            .filter_map(|raw| match ChatMessage::try_from(raw) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(error = %e, "dropping invalid chat message");
                    None
                }
            })
            .collect();
        debug!(count = messages.len(), "fetched chat messages");
        Ok(messages)
    }

    /// Asks the backend who the current cookie session belongs to.
    #[instrument(skip(self))]
    pub async fn session(&self) -> Result<SessionState> {
        let response = self.request(Method::GET, SESSION_PATH, &[]).send().await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!(status = response.status().as_u16(), "no active session");
            return Ok(SessionState::Anonymous);
        }

        let response = Self::check(response).await?;
        let body = response.text().await?;
        let account: Account = serde_json::from_str(&body)
            .map_err(|e| AnoniumError::invalid_response(format!("{}: {}", SESSION_PATH, e)))?;
        Ok(SessionState::from_account(account))
    }

    /// Ends the current session.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let response = self.request(Method::POST, LOGOUT_PATH, &[]).send().await?;
        Self::check(response).await?;
        info!("logged out");
        Ok(())
    }
}

impl CommentSource for ApiClient {
    async fn post_comments(&self, post: PostId, query: &CommentQuery) -> Result<Vec<Comment>> {
        ApiClient::post_comments(self, post, query).await
    }

    async fn comment_children(&self, comment: CommentId, query: &ChildrenQuery) -> Result<ChildrenPage> {
        ApiClient::comment_children(self, comment, query).await
    }

    async fn comment(&self, comment: CommentId) -> Result<Comment> {
        ApiClient::comment(self, comment).await
    }
}

impl ChatSource for ApiClient {
    async fn chat_messages(&self, community: CommunityId, after: Option<u64>) -> Result<Vec<ChatMessage>> {
        ApiClient::chat_messages(self, community, after).await
    }
}
