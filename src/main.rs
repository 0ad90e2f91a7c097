use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use petakopi_ingest::config::Config;
use petakopi_ingest::crawl::run_crawl;
use petakopi_ingest::fetch::HttpFetcher;
use petakopi_ingest::{init_database, load, open_database};

#[derive(Parser)]
#[command(name = "petakopi-ingest")]
#[command(about = "Coffee shop directory crawler and relational loader")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// CSV store path (overrides STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// SQLite database path (overrides DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the directory and append new shops to the CSV store
    Crawl {
        /// Directory URL (overrides BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
        /// CONL site profile (overrides SITE_PROFILE)
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Load the CSV store into the relational schema
    Load,
    /// Create the relational schema
    InitDb,
}

fn run_crawl_step(config: &Config, quiet: bool) -> Result<()> {
    let selectors = config
        .site_profile()
        .context("Failed to load site profile")?
        .compile()?;
    let fetcher = HttpFetcher::new()?;
    let collected_at = Local::now().naive_local();

    if !quiet {
        println!("Crawling {}...\n", config.base_url);
    }
    let summary = run_crawl(
        &fetcher,
        &selectors,
        &config.base_url,
        &config.store_path,
        collected_at,
        quiet,
    )
    .with_context(|| format!("Crawl of {} failed", config.base_url))?;

    for (url, message) in &summary.failed {
        println!("  Error scraping {}: {}", url, message);
    }
    println!(
        "Done! {} listings, {} scraped, {} new rows in {} ({} errors)",
        summary.listings,
        summary.assembled,
        summary.appended,
        config.store_path.display(),
        summary.failed.len()
    );
    Ok(())
}

fn run_load_step(config: &Config, quiet: bool) -> Result<()> {
    let mut conn = open_database(&config.database_path).with_context(|| {
        format!(
            "Failed to connect to database {}",
            config.database_path.display()
        )
    })?;

    if !quiet {
        println!("Loading {}...", config.store_path.display());
    }
    let report = load::load(&config.store_path, &mut conn)
        .with_context(|| format!("Load of {} failed", config.store_path.display()))?;

    for (id, message) in &report.failed {
        println!("  Error loading {}: {}", id, message);
    }
    println!(
        "Done! {} shops loaded, {} already present, {} errors",
        report.loaded,
        report.skipped,
        report.failed.len()
    );
    Ok(())
}

fn run_init_db(config: &Config) -> Result<()> {
    println!("Connecting to database {}...", config.database_path.display());
    let conn = open_database(&config.database_path).context("Failed to connect to database")?;
    init_database(&conn).context("Failed to create tables")?;
    println!("Tables created successfully!");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stdout)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    match cli.command {
        None => {
            run_crawl_step(&config, cli.quiet)?;
            run_load_step(&config, cli.quiet)
        }
        Some(Commands::Crawl { base_url, profile }) => {
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if profile.is_some() {
                config.profile_path = profile;
            }
            run_crawl_step(&config, cli.quiet)
        }
        Some(Commands::Load) => run_load_step(&config, cli.quiet),
        Some(Commands::InitDb) => run_init_db(&config),
    }
}
