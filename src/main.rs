use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tracing_subscriber::EnvFilter;

use codeintel_commitgraph::cli::{Cli, Command, RepoCommand, UploadCommand};
use codeintel_commitgraph::config::Config;
use codeintel_commitgraph::repository::{Database, GitGraphSource, Updater};
use codeintel_commitgraph::util::{format_timestamp, short_commit};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => config.database_path()?,
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    tracing::debug!(db = %db_path.display(), "using store");

    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str)
        .await?
        .with_max_parameters(config.store.max_parameters);
    db.init_schema().await?;

    match cli.command {
        Command::Repo(RepoCommand::Add { name, path }) => {
            let abs_path = fs::canonicalize(&path)
                .with_context(|| format!("Could not resolve path: {}", path.display()))?;
            let path_str = abs_path.to_str().context("Invalid path encoding")?;
            let id = db.add_repository(&name, path_str).await?;
            db.mark_repository_as_dirty(id).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "name": name, "path": path_str }));
            } else {
                println!("Registered repository {} as {}", name, id);
            }
        }
        Command::Repo(RepoCommand::List) => {
            let repos = db.repositories().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&repos)?);
            } else {
                for repo in repos {
                    println!(
                        "{:>4}  {:<24} {:<6} updated {}  {}",
                        repo.id,
                        repo.name,
                        if repo.dirty { "dirty" } else { "clean" },
                        format_timestamp(repo.last_updated_at),
                        repo.path
                    );
                }
            }
        }
        Command::Upload(UploadCommand::Add(args)) => {
            if db.repository(args.repo).await?.is_none() {
                anyhow::bail!("Unknown repository {}", args.repo);
            }
            let id = db
                .insert_upload(args.repo, &args.commit, &args.root, &args.indexer, args.state)
                .await?;
            db.mark_repository_as_dirty(args.repo).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("Added upload {} at {}", id, short_commit(&args.commit));
            }
        }
        Command::Upload(UploadCommand::State { upload_id, state }) => {
            let repo = db
                .upload_repository(upload_id)
                .await?
                .with_context(|| format!("Unknown upload {}", upload_id))?;
            db.set_upload_state(upload_id, state).await?;
            db.mark_repository_as_dirty(repo).await?;
            if !cli.json {
                println!("Upload {} is now {}", upload_id, state);
            }
        }
        Command::Update(args) => {
            let updater = Updater::quiet(GitGraphSource::new());
            let marked = updater.update(&db, args.repo, args.commit.as_deref()).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "dirty": marked }));
            } else if marked {
                println!("Repository {} marked dirty", args.repo);
            } else {
                println!("Repository {} is up to date", args.repo);
            }
        }
        Command::Recompute { max_commits } => {
            let source = GitGraphSource::with_max_commits(max_commits.or(config.store.max_commits));
            let updater = if cli.quiet { Updater::quiet(source) } else { Updater::new(source) };
            let updater = updater.with_profile(cli.profile);
            let summary = updater.update_dirty(&db).await?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "updated": summary.updated,
                        "failed": summary.failed,
                        "removed": summary.removed,
                    })
                );
            } else {
                println!(
                    "Updated {} repositories, {} failed, {} unregistered marks dropped",
                    summary.updated.len(),
                    summary.failed.len(),
                    summary.removed.len()
                );
            }
            if !summary.failed.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Nearest { repo, commit } => {
            let uploads = db.nearest_uploads(repo, &commit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&uploads)?);
            } else if uploads.is_empty() {
                println!("No uploads visible from {}", short_commit(&commit));
            } else {
                for upload in uploads {
                    let root = if upload.root.is_empty() { "/" } else { upload.root.as_str() };
                    println!(
                        "{:>6}  {:<16} {:<24} distance {}",
                        upload.upload_id, upload.indexer, root, upload.distance
                    );
                }
            }
        }
        Command::Tip { repo } => {
            let ids = db.uploads_visible_at_tip(repo).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&ids)?);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
    }

    Ok(())
}
