use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;

mod ai;
mod auth;
mod config;
mod context;
mod error;
mod import;
mod models;
mod pipeline;
mod report;
mod server;
mod store;
mod validate;
mod week;

use crate::config::{Config, StoreConfig};
use crate::context::AppContext;
use crate::models::AiOutcome;
use crate::store::PostgresStore;

#[derive(Parser)]
#[command(name = "daily-wins")]
#[command(about = "Daily achievement log with weekly reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create or upgrade the Postgres schema
    InitDb,
    /// Log a daily win
    Submit {
        #[arg(long)]
        content: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        impact: i64,
    },
    /// Show the most recent entries
    Recent {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Generate this week's report
    Report {
        /// Ask the text-generation service for resume bullets
        #[arg(long)]
        ai: bool,
        /// Reference date (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Also write a markdown report to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Test the store connection
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let connect = || AppContext::from_config(&config);

    match cli.command {
        Commands::InitDb => {
            let StoreConfig::Postgres { database_url } = &config.store else {
                bail!("init-db only applies to STORE_BACKEND=postgres");
            };
            let store = PostgresStore::connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            store.init_db().await.context("failed to run migrations")?;
            println!("Schema ready.");
        }
        Commands::Serve { bind } => {
            let ctx = connect().await?;
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            server::serve(ctx, &bind).await?;
        }
        Commands::Submit {
            content,
            category,
            impact,
        } => {
            let ctx = connect().await?;
            let id = pipeline::submit_entry(
                ctx.store.as_ref(),
                Some(content.as_str()),
                Some(category.as_str()),
                Some(&Value::from(impact)),
                week::today(),
            )
            .await?;
            println!("Logged {category} win ({impact}/5) as {id}.");
        }
        Commands::Recent { limit } => {
            let ctx = connect().await?;
            let entries = pipeline::recent_entries(ctx.store.as_ref(), limit).await?;
            if entries.is_empty() {
                println!("No entries yet.");
                return Ok(());
            }
            for entry in entries {
                println!(
                    "- {} [{}] ({}/5) {}",
                    entry.date, entry.category, entry.impact, entry.content
                );
            }
        }
        Commands::Report { ai, date, out } => {
            let ctx = connect().await?;
            let today = date.unwrap_or_else(week::today);
            let summary = pipeline::generate_weekly_report(&ctx, ai, today).await?;
            let aggregate = &summary.aggregate;

            println!(
                "{} ({}): {} entries, total impact {}, average {:.1}",
                summary.week.label(),
                summary.week.date_range(),
                aggregate.entry_count,
                aggregate.total_impact,
                aggregate.average_impact
            );
            for (category, count) in aggregate.category_counts.iter() {
                println!("- {category}: {count}");
            }
            match &summary.resume_analysis {
                Some(AiOutcome::Enriched {
                    bullets,
                    bullets_created,
                    ..
                }) => {
                    println!(
                        "Resume bullets: {} suggested, {bullets_created} stored.",
                        bullets.len()
                    );
                }
                Some(AiOutcome::Skipped { reason }) => {
                    println!("Resume analysis skipped: {reason}");
                }
                None => {}
            }

            if let Some(out) = out {
                std::fs::write(&out, report::render_markdown(&summary))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Import { csv } => {
            let ctx = connect().await?;
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let inserted = import::import_csv(ctx.store.as_ref(), file).await?;
            println!("Imported {inserted} entries from {}.", csv.display());
        }
        Commands::Check => {
            let ctx = connect().await?;
            ctx.store
                .check()
                .await
                .with_context(|| format!("{} store is unreachable", ctx.store.backend()))?;
            println!("{} store connection successful.", ctx.store.backend());
        }
    }

    Ok(())
}
