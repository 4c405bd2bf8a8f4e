use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::UploadState;

#[derive(Parser, Debug)]
#[command(
    name = "commitgraph",
    about = "Compute which code-intelligence uploads are visible from each commit"
)]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// No progress bars
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Print per-phase timings; also hides progress bars so they do not
    /// mix with the timing lines
    #[arg(long, global = true)]
    pub profile: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage registered repositories
    #[command(subcommand)]
    Repo(RepoCommand),

    /// Manage uploads
    #[command(subcommand)]
    Upload(UploadCommand),

    /// Mark a repository dirty unless the commit is already covered
    Update(UpdateArgs),

    /// Recompute visibility for every dirty repository
    Recompute {
        /// Truncate history to this many commits from the tip
        #[arg(long)]
        max_commits: Option<usize>,
    },

    /// Show the uploads visible from a commit
    Nearest {
        #[arg(long)]
        repo: i64,
        #[arg(long)]
        commit: String,
    },

    /// Show the uploads visible from the tip of the default branch
    Tip {
        #[arg(long)]
        repo: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Register a local git repository
    Add { name: String, path: PathBuf },
    /// List registered repositories
    List,
}

#[derive(Subcommand, Debug)]
pub enum UploadCommand {
    /// Attach an upload to a commit and mark the repository dirty
    Add(UploadAddArgs),
    /// Change the state of an upload
    State {
        upload_id: i64,
        #[arg(value_parser = parse_state)]
        state: UploadState,
    },
}

#[derive(Args, Debug)]
pub struct UploadAddArgs {
    #[arg(long)]
    pub repo: i64,
    #[arg(long)]
    pub commit: String,
    /// Path prefix the upload covers, empty for the whole repository
    #[arg(long, default_value = "")]
    pub root: String,
    #[arg(long)]
    pub indexer: String,
    #[arg(long, default_value = "completed", value_parser = parse_state)]
    pub state: UploadState,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long)]
    pub repo: i64,
    /// Skip when visibility data already covers this commit
    #[arg(long)]
    pub commit: Option<String>,
}

fn parse_state(s: &str) -> Result<UploadState, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}
