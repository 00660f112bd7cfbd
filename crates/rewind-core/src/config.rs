//! Configuration module
//!
//! Runtime settings for the bot are read from the environment (optionally seeded from a
//! `.env` file) and validated once at startup.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

const UPLOAD_RETRY_DELAY_MS: u64 = 5000;
const MAX_DOWNLOAD_BYTES: u64 = 200 * 1024 * 1024;
const QUEUE_MAX_WORKERS: usize = 4;
const QUEUE_MAX_RETRIES: u32 = 3;
const QUEUE_RETRY_DELAY_SECS: u64 = 90;
// 9 * 4 weeks
const PRUNE_AFTER_DAYS: i64 = 252;
const PREVIEW_URL_TEMPLATE: &str = "https://vreddit.cc/{}";

#[derive(Clone, Debug)]
pub struct Config {
    /// Account name the bot posts as; summons are `u/<bot_username>` mentions.
    pub bot_username: String,
    /// Postgres connection string. `None` selects the in-memory dedup store.
    pub database_url: Option<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub upload_retry_delay_ms: u64,
    /// Upload hosts switched off without a redeploy (lower-cased names).
    pub disabled_hosts: HashSet<String>,
    /// Beta preview link; `{}` is replaced by the trigger comment id.
    pub preview_url_template: String,
    pub catbox_userhash: Option<String>,
    pub max_download_bytes: u64,
    pub queue_max_workers: usize,
    pub queue_max_retries: u32,
    pub queue_retry_delay_secs: u64,
    pub prune_after_days: i64,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let bot_username = env::var("BOT_USERNAME")
            .map_err(|_| anyhow::anyhow!("BOT_USERNAME must be set"))?
            .trim()
            .to_string();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let disabled_hosts = parse_host_list(&env::var("DISABLED_HOSTS").unwrap_or_default());

        let config = Config {
            bot_username,
            database_url,
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            upload_retry_delay_ms: env::var("UPLOAD_RETRY_DELAY_MS")
                .unwrap_or_else(|_| UPLOAD_RETRY_DELAY_MS.to_string())
                .parse()
                .unwrap_or(UPLOAD_RETRY_DELAY_MS),
            disabled_hosts,
            preview_url_template: env::var("PREVIEW_URL_TEMPLATE")
                .unwrap_or_else(|_| PREVIEW_URL_TEMPLATE.to_string()),
            catbox_userhash: env::var("CATBOX_USERHASH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            max_download_bytes: env::var("MAX_DOWNLOAD_BYTES")
                .unwrap_or_else(|_| MAX_DOWNLOAD_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_DOWNLOAD_BYTES),
            queue_max_workers: env::var("QUEUE_MAX_WORKERS")
                .unwrap_or_else(|_| QUEUE_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(QUEUE_MAX_WORKERS),
            queue_max_retries: env::var("QUEUE_MAX_RETRIES")
                .unwrap_or_else(|_| QUEUE_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(QUEUE_MAX_RETRIES),
            queue_retry_delay_secs: env::var("QUEUE_RETRY_DELAY_SECS")
                .unwrap_or_else(|_| QUEUE_RETRY_DELAY_SECS.to_string())
                .parse()
                .unwrap_or(QUEUE_RETRY_DELAY_SECS),
            prune_after_days: env::var("PRUNE_AFTER_DAYS")
                .unwrap_or_else(|_| PRUNE_AFTER_DAYS.to_string())
                .parse()
                .unwrap_or(PRUNE_AFTER_DAYS),
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bot_username.is_empty() {
            return Err(anyhow::anyhow!("BOT_USERNAME must not be empty"));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if !self.preview_url_template.contains("{}") {
            return Err(anyhow::anyhow!(
                "PREVIEW_URL_TEMPLATE must contain a '{{}}' placeholder"
            ));
        }

        if self.queue_max_workers == 0 {
            return Err(anyhow::anyhow!("QUEUE_MAX_WORKERS must be at least 1"));
        }

        if self.prune_after_days <= 0 {
            return Err(anyhow::anyhow!("PRUNE_AFTER_DAYS must be positive"));
        }

        Ok(())
    }

    pub fn upload_retry_delay(&self) -> Duration {
        Duration::from_millis(self.upload_retry_delay_ms)
    }

    pub fn queue_retry_delay(&self) -> Duration {
        Duration::from_secs(self.queue_retry_delay_secs)
    }

    pub fn is_host_disabled(&self, name: &str) -> bool {
        self.disabled_hosts.contains(&name.to_lowercase())
    }

    pub fn preview_url(&self, trigger_id: &str) -> String {
        self.preview_url_template.replacen("{}", trigger_id, 1)
    }
}

fn parse_host_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
