//! Tests for the REST client against a canned local HTTP responder.
//!
//! Each test serves exactly one response on an ephemeral port and checks
//! both the request line the client sent and how the response was mapped.

use anonium::api::{ApiClient, SessionState};
use anonium::comments::{ChildrenQuery, CommentId, CommentQuery, CommunityId, PostId};
use anonium::AnoniumError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one HTTP response; resolves to the request line received.
async fn serve_once(status: &'static str, body: &'static str) -> (ApiClient, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        let text = String::from_utf8_lossy(&request).to_string();
        text.lines().next().unwrap_or_default().to_string()
    });

    let client = ApiClient::with_url(format!("http://{}", addr)).unwrap();
    (client, task)
}

// =============================================================================
// Comments
// =============================================================================

#[tokio::test]
async fn test_post_comments_request_and_decode() {
    let (client, server) = serve_once(
        "200 OK",
        r#"[{"id": 1, "children_count": 3, "children": [{"id": 2}]}, {"id": 0}]"#,
    )
    .await;

    let comments = client
        .post_comments(PostId(42), &CommentQuery::default())
        .await
        .unwrap();

    // The invalid id-0 node is dropped; the nested child inherits its parent
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].children[0].parent, Some(CommentId(1)));

    assert_eq!(
        server.await.unwrap(),
        "GET /api/posts/42/comments/?sort=popular&children_limit=10&include_deleted=true&skip_mute_filter=true HTTP/1.1"
    );
}

#[tokio::test]
async fn test_children_request_carries_exclude_ids() {
    let (client, server) = serve_once(
        "200 OK",
        r#"{"items": [{"id": 3, "parent": 1}, {"id": 4, "parent": 1}], "parents": [], "next": null}"#,
    )
    .await;

    let query = ChildrenQuery {
        exclude_ids: vec![CommentId(2)],
        ..Default::default()
    };
    let page = client.comment_children(CommentId(1), &query).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(!page.has_more());

    assert_eq!(
        server.await.unwrap(),
        "GET /api/comments/1/children/?limit=10&sort=popular&include_deleted=true&exclude_ids=2 HTTP/1.1"
    );
}

#[tokio::test]
async fn test_not_found_maps_to_api_error() {
    let (client, _server) = serve_once("404 Not Found", r#"{"detail": "Not found."}"#).await;

    let err = client.comment(CommentId(9)).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "API error 404: Not found.");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (client, _server) = serve_once("200 OK", "<html>oops</html>").await;

    let err = client.comment(CommentId(9)).await.unwrap_err();
    assert!(matches!(err, AnoniumError::InvalidResponse(_)));
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_session_guest() {
    let (client, server) =
        serve_once("200 OK", r#"{"id": 5, "username": "guest-5", "is_guest": true}"#).await;

    match client.session().await.unwrap() {
        SessionState::Guest(account) => assert_eq!(account.username, "guest-5"),
        other => panic!("expected guest, got {:?}", other),
    }
    assert_eq!(server.await.unwrap(), "GET /accounts/me/ HTTP/1.1");
}

#[tokio::test]
async fn test_session_signed_in() {
    let (client, _server) = serve_once("200 OK", r#"{"id": 6, "username": "alice"}"#).await;
    assert!(matches!(
        client.session().await.unwrap(),
        SessionState::SignedIn(_)
    ));
}

#[tokio::test]
async fn test_session_unauthorized_is_anonymous() {
    let (client, _server) = serve_once("403 Forbidden", r#"{"detail": "no"}"#).await;
    assert_eq!(client.session().await.unwrap(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_session_server_error_propagates() {
    let (client, _server) = serve_once("500 Internal Server Error", "").await;
    let err = client.session().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_logout_posts() {
    let (client, server) = serve_once("204 No Content", "").await;
    client.logout().await.unwrap();
    assert_eq!(server.await.unwrap(), "POST /accounts/logout/ HTTP/1.1");
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_messages_after_cursor() {
    let (client, server) = serve_once(
        "200 OK",
        r#"{"results": [{"id": 8, "author": "mod", "body": "hi"}, {"body": "no id"}]}"#,
    )
    .await;

    let messages = client.chat_messages(CommunityId(3), Some(7)).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].author.as_deref(), Some("mod"));
    assert_eq!(
        server.await.unwrap(),
        "GET /api/communities/3/chat/messages/?after=7 HTTP/1.1"
    );
}
