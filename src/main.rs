use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comfort_monitor::{
    api::{self, dto::AppState},
    config::Config,
    credential_blob::FileCredentialBlob,
    db::{
        self,
        postgres::{PgAlertStore, PgReadingStore},
    },
    evaluation::{EvaluationService, EvaluationSettings},
    fetcher::ReadingFetcher,
    nest::NestClient,
    notifier::WebhookNotifier,
    polling::PollingService,
    reading_cache::ReadingCache,
    token_store::TokenStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database ready");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    // Token store: persisted credential + OAuth issuance against the vendor.
    let nest = Arc::new(NestClient::from_config(http.clone(), &config));
    let tokens = TokenStore::new(
        nest.clone(),
        Arc::new(FileCredentialBlob::new(&config.credential_path)),
        config.proactive_token_refresh,
    );
    let fetcher = ReadingFetcher::new(tokens, nest);
    let cache = ReadingCache::new(fetcher.clone(), config.cache_ttl);

    let device_ids = if config.device_ids.is_empty() {
        let discovered = fetcher
            .discover_device_ids()
            .await
            .context("NEST_DEVICE_IDS is empty and thermostat discovery failed")?;
        info!(devices = ?discovered, "Discovered thermostats");
        discovered
    } else {
        config.device_ids.clone()
    };
    if device_ids.is_empty() {
        warn!("No thermostats to monitor; background jobs will idle");
    }

    let readings = Arc::new(PgReadingStore::new(pool.clone()));
    let alerts = Arc::new(PgAlertStore::new(pool));

    // Spawn sensor-polling task
    {
        let polling = PollingService::new(
            cache.clone(),
            readings.clone(),
            device_ids.clone(),
            config.poll_interval_secs,
        );
        tokio::spawn(polling.run());
    }

    // Spawn comfort evaluation task; reads only from the reading store.
    {
        let notifier = Arc::new(WebhookNotifier::new(http, config.webhook_url.clone()));
        let evaluation = EvaluationService::new(
            readings,
            alerts,
            notifier,
            EvaluationSettings::from_config(&config),
            device_ids,
            config.evaluation_interval_secs,
        );
        tokio::spawn(evaluation.run());
    }

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(AppState::new(cache, fetcher)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
