use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use transit_gateway::config::GatewayConfig;
use transit_gateway::finder::{
    FinderData, MemoryActions, MemoryFinder, MemoryJobQueue, StaticChecker,
};
use transit_gateway::realtime::LocalRtFinder;
use transit_gateway::request::Services;
use transit_gateway::service_time::{RealClock, ServiceWindowCache};
use transit_gateway::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = GatewayConfig::from_env()?;

    let finder = match &config.data_dir {
        Some(dir) => Arc::new(MemoryFinder::load(dir)?),
        None => {
            warn!("TRANSIT_GATEWAY_DATA_DIR not set; serving an empty warehouse");
            Arc::new(MemoryFinder::new(FinderData::default()))
        }
    };

    let rt = Arc::new(LocalRtFinder::new(finder.clone()));
    if let Some(dir) = &config.data_dir {
        rt.load_dir(dir).await?;
    }

    let services = Services {
        finder: finder.clone(),
        rt,
        gbfs: finder.clone(),
        checker: Arc::new(StaticChecker::new()),
        actions: Arc::new(MemoryActions::new(finder)),
        jobs: Arc::new(MemoryJobQueue::new()),
        clock: Arc::new(RealClock),
        service_windows: ServiceWindowCache::new(config.service_window_cache_capacity),
        config: Arc::new(config.clone()),
    };

    let app = create_router(AppState::new(services));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "transit gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
