use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use babelfeed::config::Config;
use babelfeed::delivery::{MessageChannel, WebhookChannel};
use babelfeed::dispatcher::Dispatcher;
use babelfeed::fetcher::FeedFetcher;
use babelfeed::processor::EntryProcessor;
use babelfeed::scheduler::Scheduler;
use babelfeed::tenant::TenantStore;
use babelfeed::translate::TranslationService;

#[derive(Parser)]
#[command(
    name = "babelfeed",
    version,
    about = "Multi-tenant RSS/Atom translation relay",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the feed relay daemon
    Run,

    /// Validate configuration and tenant records, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    match cli.command {
        Commands::Run => run().await?,
        Commands::Check => check().await?,
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("babelfeed=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("babelfeed=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    tracing::info!("babelfeed starting");

    let store = Arc::new(TenantStore::load(&config.data_dir).await?);
    let fetcher = Arc::new(FeedFetcher::new(
        config.request_timeout(),
        &config.http.user_agent,
    )?);
    let translator = Arc::new(TranslationService::from_config(&config)?);
    let processor = Arc::new(EntryProcessor::new(translator));
    let channel: Arc<dyn MessageChannel> = Arc::new(WebhookChannel::from_config(&config)?);

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        fetcher,
        processor,
        channel,
    ));
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&store), dispatcher));

    scheduler.start().await;

    wait_for_shutdown().await?;
    tracing::info!("Shutdown signal received, draining cycles");
    scheduler.shutdown().await;

    tracing::info!("babelfeed stopped");
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

async fn check() -> Result<()> {
    let config = Config::from_env()?;
    println!("Configuration OK");
    println!("  Data dir: {}", config.data_dir.display());
    println!("  API base: {}", config.api_base);

    let store = TenantStore::load(&config.data_dir).await?;
    let mut ids = store.tenant_ids().await;
    ids.sort_unstable();
    println!("  Tenants: {}", ids.len());

    for id in ids {
        let record = store.get(id).await;
        println!(
            "  Tenant {id}: {} feeds, language {}, every {} minutes, channel {}, {} ledger entries",
            record.feeds.len(),
            record.language,
            record.interval_minutes,
            record.channel.as_deref().unwrap_or("unset"),
            record.ledger.len()
        );
    }

    Ok(())
}
