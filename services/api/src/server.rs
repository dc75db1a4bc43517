use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::dashboard_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ecotide::config::AppConfig;
use ecotide::error::AppError;
use ecotide::EcoStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(
    mut config: AppConfig,
    store: EcoStore,
    mut args: ServeArgs,
) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store,
    };

    let app = dashboard_router()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        store = %config.store.path.display(),
        "ecotide dashboard ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
