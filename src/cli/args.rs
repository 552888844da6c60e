//! Command-line argument parsing for the Anonium client.

use crate::comments::types::{CommentId, CommunityId, PostId, SortOrder};
use crate::error::{AnoniumError, Result};
use std::env;
use std::path::PathBuf;

/// Command-line interface commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Thread {
        post: PostId,
        sort: Option<SortOrder>,
        include_deleted: Option<bool>,
    },
    Subthread {
        post: PostId,
        comment: CommentId,
    },
    Expand {
        post: PostId,
        comment: CommentId,
    },
    Collapse {
        post: PostId,
        comment: CommentId,
    },
    ResetView {
        post: PostId,
    },
    Whoami,
    Logout,
    Chat {
        community: CommunityId,
        once: bool,
    },
    Help,
}

/// A parsed command line: global flags plus the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// `--api <url>`
    pub api_url: Option<String>,
    /// `--state-dir <dir>`
    pub state_dir: Option<PathBuf>,
    /// The command to run.
    pub command: Command,
}

/// Parse the process command line into an invocation
pub fn parse_args() -> Result<Invocation> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

fn flag_value(args: &[String], i: usize, flag: &str) -> Result<String> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| AnoniumError::invalid_input(format!("{} requires a value", flag)))
}

fn positional<T>(positionals: &[String], index: usize, what: &str) -> Result<T>
where
    T: std::str::FromStr<Err = AnoniumError>,
{
    positionals
        .get(index)
        .ok_or_else(|| AnoniumError::invalid_input(format!("missing {}", what)))?
        .parse()
}

/// Parse arguments (without the program name) into an invocation
pub fn parse_args_from(args: &[String]) -> Result<Invocation> {
    let mut api_url = None;
    let mut state_dir = None;
    let mut sort: Option<SortOrder> = None;
    let mut include_deleted: Option<bool> = None;
    let mut once = false;
    let mut positionals: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                api_url = Some(flag_value(args, i, "--api")?);
                i += 1;
            }
            "--state-dir" => {
                state_dir = Some(PathBuf::from(flag_value(args, i, "--state-dir")?));
                i += 1;
            }
            "--sort" => {
                sort = Some(flag_value(args, i, "--sort")?.parse::<SortOrder>()?);
                i += 1;
            }
            "--include-deleted" => include_deleted = Some(true),
            "--hide-deleted" => include_deleted = Some(false),
            "--once" => once = true,
            "-h" | "--help" => positionals.insert(0, "help".to_string()),
            flag if flag.starts_with("--") => {
                return Err(AnoniumError::invalid_input(format!(
                    "unknown flag '{}'",
                    flag
                )));
            }
            _ => positionals.push(args[i].clone()),
        }
        i += 1;
    }

    let Some((name, rest)) = positionals.split_first() else {
        return Ok(Invocation {
            api_url,
            state_dir,
            command: Command::Help,
        });
    };

    let command = match name.as_str() {
        "thread" => Command::Thread {
            post: positional(rest, 0, "post id")?,
            sort,
            include_deleted,
        },
        "subthread" => Command::Subthread {
            post: positional(rest, 0, "post id")?,
            comment: positional(rest, 1, "comment id")?,
        },
        "expand" => Command::Expand {
            post: positional(rest, 0, "post id")?,
            comment: positional(rest, 1, "comment id")?,
        },
        "collapse" => Command::Collapse {
            post: positional(rest, 0, "post id")?,
            comment: positional(rest, 1, "comment id")?,
        },
        "reset-view" => Command::ResetView {
            post: positional(rest, 0, "post id")?,
        },
        "whoami" => Command::Whoami,
        "logout" => Command::Logout,
        "chat" => Command::Chat {
            community: positional(rest, 0, "community id")?,
            once,
        },
        "help" => Command::Help,
        other => {
            return Err(AnoniumError::invalid_input(format!(
                "unknown command '{}'",
                other
            )));
        }
    };

    Ok(Invocation {
        api_url,
        state_dir,
        command,
    })
}

/// Print usage information
pub fn print_usage() {
    println!("Anonium - forum client");
    println!("======================");
    println!();
    println!("Usage: anonium [--api <url>] [--state-dir <dir>] <command> [args...]");
    println!();
    println!("Commands:");
    println!("  thread <post_id> [--sort popular|new|old] [--include-deleted]");
    println!("                                         Show a post's comment tree");
    println!("  subthread <post_id> <comment_id>       Show one comment and its replies");
    println!("  expand <post_id> <comment_id>          Load more replies to a comment");
    println!("  collapse <post_id> <comment_id>        Collapse or expand a comment");
    println!("  reset-view <post_id>                   Forget collapsed/expanded state");
    println!("  whoami                                 Show the current session");
    println!("  logout                                 End the current session");
    println!("  chat <community_id> [--once]           Follow a community's mod chat");
    println!();
    println!("Environment:");
    println!("  ANONIUM_API_URL, ANONIUM_STATE_DIR, ANONIUM_CHILDREN_LIMIT,");
    println!("  ANONIUM_SORT, ANONIUM_TIMEOUT_SECS, RUST_LOG");
}
