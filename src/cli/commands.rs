//! Command implementations for the Anonium CLI.

use crate::api::ApiClient;
use crate::chat::{spawn_chat_poller, PollConfig};
use crate::cli::utils::{render_chat_message, render_post_header, render_thread};
use crate::comments::loader::{LoaderOptions, ThreadLoader};
use crate::comments::thread::CommentThread;
use crate::comments::types::{CommentId, CommunityId, PostId, SortOrder};
use crate::config::ClientConfig;
use crate::error::{AnoniumError, Result};
use crate::storage::FileStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for one CLI invocation.
pub struct Context {
    config: ClientConfig,
    client: ApiClient,
}

impl Context {
    /// Builds the HTTP client for a validated config.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = ApiClient::new(&config)?;
        Ok(Self { config, client })
    }

    fn loader(&self, options: LoaderOptions) -> ThreadLoader<ApiClient> {
        ThreadLoader::new(self.client.clone(), options)
    }

    fn open_thread(&self, post: PostId) -> Result<CommentThread<FileStore>> {
        let store = FileStore::new(&self.config.state_dir)?;
        Ok(CommentThread::open(post, store))
    }

    async fn print_post_header(&self, post: PostId) {
        match self.client.post(post).await {
            Ok(post) => println!("{}\n", render_post_header(&post)),
            Err(e) => warn!(post = %post, error = %e, "could not fetch post"),
        }
    }
}

fn print_thread(thread: &mut CommentThread<FileStore>) {
    let post = thread.post();
    let display = thread.display();
    if display.is_empty() {
        println!("(no comments)");
    } else {
        print!("{}", render_thread(&display, post));
    }
}

/// Execute thread command
pub async fn thread(
    ctx: &Context,
    post: PostId,
    sort: Option<SortOrder>,
    include_deleted: Option<bool>,
) -> Result<()> {
    let mut options = LoaderOptions::from(&ctx.config);
    if let Some(sort) = sort {
        options.sort = sort;
    }
    if let Some(include_deleted) = include_deleted {
        options.include_deleted = include_deleted;
    }

    let mut thread = ctx.open_thread(post)?;
    let loaded = ctx.loader(options).load_post(&mut thread).await;
    info!(post = %post, nodes = loaded, "thread loaded");

    ctx.print_post_header(post).await;
    print_thread(&mut thread);
    Ok(())
}

/// Execute subthread command
pub async fn subthread(ctx: &Context, post: PostId, comment: CommentId) -> Result<()> {
    let mut thread = ctx.open_thread(post)?;
    let loader = ctx.loader(LoaderOptions::from(&ctx.config));

    if !loader.load_subthread(&mut thread, comment).await {
        return Err(AnoniumError::api(
            404,
            format!("comment {} could not be loaded", comment),
        ));
    }

    print_thread(&mut thread);
    Ok(())
}

/// Execute expand command
pub async fn expand(ctx: &Context, post: PostId, comment: CommentId) -> Result<()> {
    let mut thread = ctx.open_thread(post)?;
    let loader = ctx.loader(LoaderOptions::from(&ctx.config));
    loader.load_post(&mut thread).await;

    if thread.find(comment).is_none() {
        return Err(AnoniumError::invalid_input(format!(
            "comment {} is not part of post {}",
            comment, post
        )));
    }

    let added = loader.expand(&mut thread, comment).await;
    println!("Loaded {} more replies to #{}\n", added, comment);
    print_thread(&mut thread);
    Ok(())
}

/// Execute collapse command
pub async fn collapse(ctx: &Context, post: PostId, comment: CommentId) -> Result<()> {
    let mut thread = ctx.open_thread(post)?;
    ctx.loader(LoaderOptions::from(&ctx.config))
        .load_post(&mut thread)
        .await;

    let collapsed = thread.toggle_collapsed(comment);
    println!(
        "#{} {}\n",
        comment,
        if collapsed { "collapsed" } else { "expanded" }
    );
    print_thread(&mut thread);
    Ok(())
}

/// Execute reset-view command
pub fn reset_view(ctx: &Context, post: PostId) -> Result<()> {
    let mut thread = ctx.open_thread(post)?;
    thread.reset_view_state();
    println!("View state for post {} cleared", post);
    Ok(())
}

/// Execute whoami command
pub async fn whoami(ctx: &Context) -> Result<()> {
    let session = ctx.client.session().await?;
    println!("{}", session.label());
    Ok(())
}

/// Execute logout command
pub async fn logout(ctx: &Context) -> Result<()> {
    ctx.client.logout().await?;
    println!("Logged out");
    Ok(())
}

/// Execute chat command
pub async fn chat(ctx: &Context, community: CommunityId, once: bool) -> Result<()> {
    if once {
        for message in ctx.client.chat_messages(community, None).await? {
            println!("{}", render_chat_message(&message));
        }
        return Ok(());
    }

    let source = Arc::new(ctx.client.clone());
    let (handle, mut rx) = spawn_chat_poller(source, community, PollConfig::from(&ctx.config));

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => println!("{}", render_chat_message(&message)),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    // Undelivered messages are discarded so the poller never waits on them
    drop(rx);
    handle.shutdown().await;
    Ok(())
}
