//! Run command - hosts the shared cache until a shutdown signal arrives

use tokio::signal;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::cache::AdapterFactory;
use crate::infrastructure::logging;
use crate::infrastructure::services::CacheService;

/// Builds the cache from configuration and waits for shutdown
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging)?;

    let cache = build_cache(&config)?;
    info!(
        ttl_secs = config.cache.default_ttl_secs,
        adapter = %config.cache.adapter.adapter_type,
        shards = config.cache.adapter.shards,
        "Cache ready"
    );

    let reporter = config
        .cache
        .stats_interval()
        .map(|interval| cache.stats().spawn_reporter(interval));

    shutdown_signal().await?;

    if let Some(reporter) = reporter {
        reporter.abort();
    }

    let stats = cache.stats().snapshot();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        loads = stats.loads,
        "Cache shut down"
    );

    Ok(())
}

/// Prints the configuration the `run` command would use
pub fn print_config() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Creates the process-wide cache instance
pub fn build_cache(config: &AppConfig) -> anyhow::Result<CacheService> {
    config.cache.validate()?;

    let adapter = AdapterFactory::new().create(&config.cache.adapter_config())?;
    Ok(CacheService::new(adapter, config.cache.default_ttl()))
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = ctrl_c => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}
