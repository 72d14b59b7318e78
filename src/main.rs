use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use prettytable::{Cell, Row, Table};
use tracing::{error, info};

use herald::config::{self, Topic};
use herald::db::Database;
use herald::engine;
use herald::feeds;
use herald::logging;
use herald::render::{self, TopicSummary};
use herald::TARGET_ENGINE;

/// Stored items considered per digest run, as a multiple of the topic's
/// total cap. The balancer needs headroom beyond the cap to skip
/// over-represented sources.
const CANDIDATE_POOL_FACTOR: usize = 4;

#[derive(Parser)]
#[clap(name = "herald", about = "Fetch news feeds and build clustered digest pages")]
struct Cli {
    /// Feed configuration file
    #[clap(long, default_value = "feeds.yml", global = true)]
    config: PathBuf,

    /// SQLite item store
    #[clap(long, default_value = "briefing.db", global = true)]
    db: PathBuf,

    /// Output directory for rendered pages
    #[clap(long, default_value = "out", global = true)]
    out: PathBuf,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all configured feeds and store new items
    Fetch,

    /// Build stories from stored items and render digest pages
    Digest {
        /// Print stories as JSON instead of writing Markdown
        #[clap(long)]
        json: bool,
    },

    /// Fetch, then digest
    Run,

    /// Show per-topic store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::configure_logging();
    let args = Cli::parse();

    info!(
        "herald {} (built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIMESTAMP"),
        option_env!("GIT_HASH").unwrap_or("untracked")
    );

    let db_path = args.db.to_string_lossy().to_string();

    match args.command {
        Commands::Fetch => {
            let topics = config::load(&args.config)?;
            let db = Database::new(&db_path).await?;
            run_fetch(&db, &topics).await?;
        }
        Commands::Digest { json } => {
            let topics = config::load(&args.config)?;
            let db = Database::new(&db_path).await?;
            run_digest(&db, &topics, &args.out, json).await?;
        }
        Commands::Run => {
            let topics = config::load(&args.config)?;
            let db = Database::new(&db_path).await?;
            run_fetch(&db, &topics).await?;
            run_digest(&db, &topics, &args.out, false).await?;
        }
        Commands::Stats => {
            let db = Database::new(&db_path).await?;
            run_stats(&db).await?;
        }
    }

    Ok(())
}

async fn run_fetch(db: &Database, topics: &[Topic]) -> Result<()> {
    let reports = feeds::fetch_all(db, topics).await?;

    let mut inserted = 0;
    let mut failed = 0;
    for report in &reports {
        match &report.error {
            None => {
                inserted += report.inserted;
                println!(
                    "{} {} / {}: {} entries, {} new",
                    "[OK]".bright_green(),
                    report.topic,
                    report.source,
                    report.entries,
                    report.inserted
                );
            }
            Some(err) => {
                failed += 1;
                println!(
                    "{} {} / {}: {}",
                    "[ERR]".bright_red(),
                    report.topic,
                    report.source,
                    err
                );
            }
        }
    }
    println!(
        "Fetched {} sources: {} new items, {} failed",
        reports.len(),
        inserted,
        failed
    );
    Ok(())
}

async fn run_digest(db: &Database, topics: &[Topic], out: &Path, json: bool) -> Result<()> {
    let generated_at = Utc::now();
    if !json {
        std::fs::create_dir_all(out)
            .with_context(|| format!("creating output directory {}", out.display()))?;
    }

    let mut summaries = Vec::new();
    let mut json_topics = Vec::new();
    let mut failures = 0;

    for topic in topics {
        let settings = &topic.settings;
        let stories = match digest_topic(db, topic).await {
            Ok(stories) => stories,
            Err(err) => {
                failures += 1;
                error!(
                    target: TARGET_ENGINE,
                    "Digest for topic '{}' failed: {:#}",
                    settings.name,
                    err
                );
                println!("{} {}: {:#}", "[ERR]".bright_red(), settings.name, err);
                continue;
            }
        };

        if json {
            json_topics.push(serde_json::json!({
                "topic": settings.name,
                "slug": settings.slug,
                "stories": stories,
            }));
            continue;
        }

        let pages = engine::paginate::paginate(
            &settings.slug,
            stories,
            settings.page_size,
            settings.max_pages,
        );
        let shown: usize = pages.iter().map(|page| page.stories.len()).sum();
        let files = render::render_pages(settings, &pages, generated_at);
        for file in &files {
            let path = out.join(&file.name);
            std::fs::write(&path, &file.content)
                .with_context(|| format!("writing {}", path.display()))?;
        }

        println!(
            "{} {}: {} stories on {} pages",
            "[OK]".bright_green(),
            settings.name,
            shown,
            pages.len()
        );
        summaries.push(TopicSummary {
            name: settings.name.clone(),
            slug: settings.slug.clone(),
            stories: shown,
            pages: pages.len(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&json_topics)?);
        return Ok(());
    }

    let index = render::render_index(&summaries, generated_at);
    let index_path = out.join("index.md");
    std::fs::write(&index_path, index)
        .with_context(|| format!("writing {}", index_path.display()))?;
    info!(
        target: TARGET_ENGINE,
        "Wrote digest for {} topics to {}",
        summaries.len(),
        out.display()
    );

    if failures > 0 {
        println!("{} {} topics failed", "[WARN]".bright_yellow(), failures);
    }
    Ok(())
}

/// Pull the candidate pool for one topic and run the pipeline on it.
async fn digest_topic(db: &Database, topic: &Topic) -> Result<Vec<engine::story::Story>> {
    let settings = &topic.settings;
    let pool = db
        .latest_items(&settings.name, settings.total_cap * CANDIDATE_POOL_FACTOR)
        .await
        .with_context(|| format!("loading items for topic '{}'", settings.name))?;
    Ok(engine::build_stories(pool, settings))
}

async fn run_stats(db: &Database) -> Result<()> {
    let stats = db.topic_stats().await?;
    if stats.is_empty() {
        println!("Store is empty");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Topic"),
        Cell::new("Items"),
        Cell::new("Sources"),
        Cell::new("Newest fetch"),
    ]));
    for row in &stats {
        table.add_row(Row::new(vec![
            Cell::new(&row.topic),
            Cell::new(&row.items.to_string()),
            Cell::new(&row.sources.to_string()),
            Cell::new(row.newest.as_deref().unwrap_or("-")),
        ]));
    }
    table.printstd();
    Ok(())
}
