//! # Anonium
//!
//! Client core for the Anonium forum: comment trees that are fetched in
//! pieces and stitched back together, locally persisted view state, the
//! cookie-session boundary and community chat polling.
//!
//! ## Features
//!
//! - **Comment reconciliation**: merge partial fetches by id, rebuild from
//!   parent pointers, recompute "load more" from server counts
//! - **Display filtering**: collapse is a view over the fetched tree,
//!   deleted comments sort last
//! - **View state**: collapsed and expanded ids per post, behind an
//!   injectable key/value store
//! - **Chat polling**: a cancellable background task with backoff
//!
//! ## Examples
//!
//! ### Merging a "load more" page
//!
//! ```rust
//! use anonium::comments::{build_tree, merge_comment_trees, Comment};
//!
//! let tree = build_tree(&[Comment::new(1, None)
//!     .with_children_count(3)
//!     .with_children(vec![Comment::new(2, Some(1))])]);
//! assert!(tree[0].has_more_children);
//!
//! let merged = merge_comment_trees(&tree, &[Comment::new(3, Some(1)), Comment::new(4, Some(1))]);
//! assert_eq!(merged[0].children.len(), 3);
//! assert!(!merged[0].has_more_children);
//! ```
//!
//! ### Loading a thread
//!
//! ```rust,no_run
//! use anonium::api::ApiClient;
//! use anonium::comments::{CommentThread, LoaderOptions, PostId, ThreadLoader};
//! use anonium::config::ClientConfig;
//! use anonium::storage::FileStore;
//! # async fn run() -> anonium::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let loader = ThreadLoader::new(ApiClient::new(&config)?, LoaderOptions::from(&config));
//! let mut thread = CommentThread::open(PostId(42), FileStore::new(&config.state_dir)?);
//! loader.load_post(&mut thread).await;
//! println!("{} comments", thread.node_count());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chat;
pub mod cli;
pub mod comments;
pub mod config;
pub mod crop;
pub mod error;
pub mod retry;
pub mod storage;
pub mod validation;

pub use error::{AnoniumError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
