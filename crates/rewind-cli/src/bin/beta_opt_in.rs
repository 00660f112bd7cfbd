use anyhow::{Context, Result};
use clap::Parser;

use rewind_core::Config;
use rewind_db::{setup_database, BetaRepository, PgBetaRepository};
use rewind_infra::init_telemetry;

#[derive(Parser, Debug)]
#[command(name = "beta_opt_in")]
#[command(about = "Add or remove a user or community from the preview beta")]
struct Args {
    /// User name, or `/r/<name>` for a whole community
    name: String,

    /// Remove instead of add
    #[arg(long)]
    remove: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    init_telemetry(config.log_json)?;

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to manage the beta list")?;
    let pool = setup_database(database_url).await?;
    let repository = PgBetaRepository::new(pool);

    repository.set_opt_in(&args.name, !args.remove).await?;
    let opted_in = repository.is_opted_in(&args.name).await?;
    println!(
        "{} is {} the beta",
        args.name,
        if opted_in { "in" } else { "not in" }
    );

    Ok(())
}
