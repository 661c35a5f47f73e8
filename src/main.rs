use adsync::config::Config;
use adsync::platforms::{AnalyticsApi, MetaApi};
use adsync::server::{AdsyncState, adsync_router};
use adsync::service::IntegrationService;
use adsync::sync::{CampaignSync, FunnelSync};
use adsync::{db, scheduler};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let meta_cfg = cfg.meta();
    let analytics_cfg = cfg.analytics();
    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        graph_api_url = %meta_cfg.graph_api_url,
        analytics_api_url = %analytics_cfg.api_url,
        concurrency = cfg.sync.concurrency,
        run_timeout_secs = cfg.sync.run_timeout_secs
    );

    let store = Arc::new(db::spawn(&cfg.basic.database_url).await?);
    let meta = Arc::new(MetaApi::new(meta_cfg)?);
    let analytics = Arc::new(AnalyticsApi::new(analytics_cfg)?);

    let campaigns = Arc::new(CampaignSync::new(store.clone(), meta.clone(), cfg.sync.clone()));
    let funnel = Arc::new(FunnelSync::new(store.clone(), analytics, cfg.sync.clone()));
    let schedules = scheduler::spawn(campaigns.clone(), funnel.clone(), &cfg.sync);

    let state = AdsyncState::new(
        IntegrationService::new(store, meta),
        campaigns,
        funnel,
        Arc::from(cfg.basic.admin_key.as_str()),
    );
    let app = adsync_router(state, &cfg.basic.cors_allow_origins);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for handle in schedules {
        handle.abort();
    }
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
