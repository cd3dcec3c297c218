use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use ankama_hooks::almanax::AlmanaxHandler;
use ankama_hooks::hooks::{HookRepository, SqlHookRepository};
use ankama_hooks::rss::{RssHandler, RssState};
use ankama_hooks::scheduler::{DeliveryStats, Dispatcher, Listener, ListenerGroup};
use ankama_hooks::twitter::TwitterHandler;
use ankama_hooks::{Config, Database, Result};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = ankama_hooks::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        ankama_hooks::logging::init_console_only(&config.logging.level);
    }

    info!("Ankama hooks starting");

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let db = Database::open(&config.database.path).await?;
    let repo: Arc<dyn HookRepository> = Arc::new(SqlHookRepository::new(db.pool().clone()));

    let stats = Arc::new(DeliveryStats::new());
    let dispatcher = Dispatcher::new(repo.clone(), &config.delivery)?
        .with_write_lock(Arc::new(Mutex::new(())))
        .with_stats(stats.clone());

    let mut listeners = ListenerGroup::new();

    if config.almanax.enabled {
        let handler = Arc::new(AlmanaxHandler::new(&config.almanax)?);
        let period = Duration::from_secs(config.almanax.polling_rate_secs);
        let stagger = Duration::from_millis(config.almanax.start_stagger_ms);
        for (i, feed) in repo.almanax_feeds(None).await?.into_iter().enumerate() {
            let listener = Listener::new(
                handler.clone(),
                feed,
                (),
                period,
                repo.clone(),
                dispatcher.clone(),
            )
            .with_start_delay(stagger * i as u32);
            listeners.spawn(listener);
        }
    }

    if config.rss.enabled {
        let handler = Arc::new(RssHandler::new(&config.rss)?);
        let period = Duration::from_secs(config.rss.polling_rate_secs);
        for feed in repo.rss_feeds(None).await? {
            listeners.spawn(Listener::new(
                handler.clone(),
                feed,
                RssState::default(),
                period,
                repo.clone(),
                dispatcher.clone(),
            ));
        }
    }

    if config.twitter.enabled {
        if config.twitter.bearer_token.is_empty() {
            warn!("Twitter is enabled but no bearer token is configured");
        }
        let handler = Arc::new(TwitterHandler::new(&config.twitter)?);
        let period = Duration::from_secs(config.twitter.polling_rate_secs);
        for feed in repo.twitter_feeds(None).await? {
            listeners.spawn(Listener::new(
                handler.clone(),
                feed,
                (),
                period,
                repo.clone(),
                dispatcher.clone(),
            ));
        }
    }

    info!("{} listener(s) running", listeners.len());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, waiting for listeners");
    listeners.shutdown_and_join().await;

    let snapshot = stats.snapshot();
    info!(
        "Stopped: {} job(s), {} delivered, {} deregistered, {} anomalous",
        snapshot.total_jobs(),
        snapshot.delivered,
        snapshot.deregistered,
        snapshot.anomalous
    );
    Ok(())
}
