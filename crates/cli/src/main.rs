mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use alerter_core::{load_dotenv, ErrorRecord, Settings};
use alerter_notify::{Alerter, RedisCache};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut settings = Settings::for_profile(&args.profile);
    if let Some(url) = args.webhook_url.clone() {
        settings.webhook_url = Some(url);
    }
    if let Some(ref redis_url) = args.redis_url {
        let cache = RedisCache::connect(redis_url)
            .await
            .context("failed to connect to redis")?;
        settings = settings.with_cache(Arc::new(cache));
    }

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings.redacted_summary())?);
            Ok(())
        }
        Command::Test => {
            let alerter = build_alerter(settings)?;
            if alerter.send_test().await {
                info!("test alert delivered");
                Ok(())
            } else {
                anyhow::bail!("test alert was not delivered")
            }
        }
        Command::Send {
            error_class,
            message,
            source,
            detail,
            queue,
            frames,
        } => {
            let mut builder = ErrorRecord::builder(error_class, message).source(source);
            if let Some(detail) = detail {
                builder = builder.source_detail(detail);
            }
            if let Some(queue) = queue {
                builder = builder.queue(queue);
            }
            if !frames.is_empty() {
                builder = builder.backtrace(frames);
            }

            let alerter = build_alerter(settings)?;
            let record = builder.build(alerter.settings().max_error_length);
            if alerter.notify(&record).await {
                info!("alert delivered");
                Ok(())
            } else {
                anyhow::bail!("alert was not delivered (disabled, duplicate, or webhook failure)")
            }
        }
    }
}

fn build_alerter(settings: Settings) -> Result<Alerter> {
    if !settings.enabled() {
        warn!("no webhook configured; set ERROR_ALERTER_WEBHOOK_URL or pass --webhook-url");
    }
    settings.log_summary();
    Alerter::new(settings).context("failed to build webhook client")
}
