use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use berita::config::Config;
use berita::content::HtmlExtractor;
use berita::feed::Fetcher;
use berita::http::HttpFetcher;
use berita::pipeline::{self, PassOptions, PassReport};
use berita::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "berita", version, about = "News article ingestion pipeline")]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "berita.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read every feed into today's index store
    Feeds {
        /// Directory of the index stores (overrides `index_dir`)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Crawl every site into today's site index store
    Sites {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Download and store the articles of every index store in a directory
    Process {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// 1-based position to resume from
        #[arg(long, default_value_t = 1)]
        begin_index: usize,
    },
    /// Re-attempt the URLs in the retry queue
    Retry {
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;

    let http = HttpFetcher::with_user_agent(&config.user_agent)
        .context("Failed to build HTTP client")?
        .timeout(config.fetch_timeout())
        .max_bytes(config.max_page_bytes);
    let today = chrono::Local::now().date_naive();

    match args.command {
        Command::Feeds { dir } => {
            let dir = dir.unwrap_or_else(|| config.index_dir.clone());
            let report = pipeline::build_index_from_feeds(
                &Fetcher::new(http),
                &config.registry(),
                &dir,
                today,
            )
            .await
            .context("Feed run failed")?;
            println!(
                "{}: {} new of {} items ({} sources failed)",
                report.path.display(),
                report.inserted,
                report.fetched,
                report.failed_sources
            );
        }
        Command::Sites { dir } => {
            let dir = dir.unwrap_or_else(|| config.index_dir.clone());
            let report = pipeline::build_index_from_sites(
                &Fetcher::new(http),
                &config.registry(),
                &dir,
                today,
            )
            .await
            .context("Site run failed")?;
            println!(
                "{}: {} new of {} items ({} sources failed)",
                report.path.display(),
                report.inserted,
                report.fetched,
                report.failed_sources
            );
        }
        Command::Process {
            dir,
            batch_size,
            begin_index,
        } => {
            let dir = dir.unwrap_or_else(|| config.index_dir.clone());
            let db = open_database(&config.database).await?;
            let extractor = HtmlExtractor::new(http, config.language()?);
            let options = PassOptions::new(batch_size.unwrap_or(config.batch_size))
                .begin_index(begin_index)
                .concurrency(config.concurrency)
                .deadline(config.run_deadline())
                .today(today);

            let report = pipeline::process_index(&db, &extractor, &dir, &options)
                .await
                .context("Processing failed")?;
            print_pass(&report);
        }
        Command::Retry { batch_size } => {
            let db = open_database(&config.database).await?;
            let extractor = HtmlExtractor::new(http, config.language()?);
            let options = PassOptions::new(batch_size.unwrap_or(config.batch_size))
                .concurrency(config.concurrency)
                .deadline(config.run_deadline())
                .today(today);

            let report =
                pipeline::process_retries(&db, &extractor, &options, config.max_retry_attempts)
                    .await
                    .context("Retry run failed")?;
            print_pass(&report);
            println!("{} retries resolved", report.resolved);
        }
    }

    Ok(())
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::Locked(_)) => {
            eprintln!("Error: The database is locked by another process. Please try again later.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn print_pass(report: &PassReport) {
    println!(
        "{} processed ({} skipped): {} stored in {} commits, {} failed, {} rejected",
        report.processed,
        report.skipped,
        report.committed,
        report.commits,
        report.failed,
        report.rejected
    );
    if report.retries.queued + report.retries.requeued > 0 {
        println!(
            "{} queued for retry ({} already queued)",
            report.retries.queued + report.retries.requeued,
            report.retries.requeued
        );
    }
    if let Some(resume_from) = report.stopped_at {
        println!("Deadline reached, resume with --begin-index {}", resume_from);
    }
}
