use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use rewind_cli::{prune_cutoff, prune_stale};
use rewind_core::Config;
use rewind_db::{setup_database, PgDedupRepository};
use rewind_hosts::CatboxHost;
use rewind_infra::init_telemetry;

#[derive(Parser, Debug)]
#[command(name = "prune_stale")]
#[command(about = "Delete reversed uploads nobody has asked for in a while")]
struct Args {
    /// Days without a request before an upload is deleted (default: PRUNE_AFTER_DAYS)
    #[arg(long)]
    days: Option<i64>,

    /// Only list what would be deleted
    #[arg(long)]
    dry_run: bool,

    /// Output format: json or text (default: text)
    #[arg(long, default_value = "text")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    init_telemetry(config.log_json)?;

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to prune uploads")?;
    let pool = setup_database(database_url).await?;
    let repository = PgDedupRepository::new(pool);
    let host = CatboxHost::new(config.catbox_userhash.clone())?;

    let days = args.days.unwrap_or(config.prune_after_days);
    anyhow::ensure!(days > 0, "--days must be positive");
    let cutoff = prune_cutoff(Utc::now().date_naive(), days);

    let report = prune_stale(&repository, &host, cutoff, args.dry_run)
        .await
        .context("Pruning failed")?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!(
            "{}: {} stale before {}, {} deleted, {} failed{}",
            report.host,
            report.stale,
            report.cutoff,
            report.deleted,
            report.failed,
            if report.dry_run { " (dry run)" } else { "" }
        ),
    }

    Ok(())
}
