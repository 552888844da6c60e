//! Text rendering for CLI output.

use crate::api::types::{ChatMessage, Post};
use crate::comments::collapse::DisplayComment;
use crate::comments::types::PostId;
use std::fmt::Write;

/// Width of one nesting level
const INDENT: &str = "  ";

/// Longest body excerpt shown per comment
const MAX_EXCERPT_CHARS: usize = 120;

/// First line of a body, shortened for one-line display.
pub fn excerpt(body: &str) -> String {
    let line = body.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > MAX_EXCERPT_CHARS {
        let cut: String = line.chars().take(MAX_EXCERPT_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

/// Work left for one node while rendering.
enum Step<'t, 'a> {
    /// The comment line, then its replies.
    Node(&'t DisplayComment<'a>, usize),
    /// The "more replies" hint printed after the replies.
    More(&'t DisplayComment<'a>, usize),
}

/// Renders a display tree, one comment per line.
pub fn render_thread(display: &[DisplayComment<'_>], post: PostId) -> String {
    let mut out = String::new();
    let mut stack: Vec<Step<'_, '_>> = display.iter().rev().map(|node| Step::Node(node, 0)).collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Node(node, depth) => {
                render_line(node, depth, &mut out);
                if node.collapsed {
                    continue;
                }
                if node.can_load_more() {
                    stack.push(Step::More(node, depth));
                }
                stack.extend(node.children.iter().rev().map(|child| Step::Node(child, depth + 1)));
            }
            Step::More(node, depth) => {
                let _ = writeln!(
                    out,
                    "{}{}... more replies: anonium expand {} {}",
                    INDENT.repeat(depth),
                    INDENT,
                    post,
                    node.comment.id
                );
            }
        }
    }
    out
}

fn render_line(node: &DisplayComment<'_>, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    let comment = node.comment;

    if node.collapsed {
        let _ = writeln!(
            out,
            "{}[+] #{} {} ({} hidden)",
            indent,
            comment.id,
            comment.author_label(),
            node.hidden_descendants
        );
        return;
    }

    let body = if comment.is_deleted {
        "[deleted]".to_string()
    } else {
        excerpt(&comment.body)
    };
    let _ = writeln!(
        out,
        "{}#{} {} ({:+}) {}",
        indent,
        comment.id,
        comment.author_label(),
        comment.score,
        body
    );
}

/// One-line post header.
pub fn render_post_header(post: &Post) -> String {
    format!(
        "{} ({:+}, {} comments)",
        post.title, post.score, post.comments_count
    )
}

/// One line per chat message.
pub fn render_chat_message(message: &ChatMessage) -> String {
    format!(
        "[{}] {}: {}",
        message.created_at.as_deref().unwrap_or("-"),
        message.author.as_deref().unwrap_or("anonymous"),
        message.body
    )
}
