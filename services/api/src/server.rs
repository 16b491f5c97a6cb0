use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::pipeline::{
    InMemoryAuditLog, InMemoryCandidateStore, PipelineAnalytics, PipelineService, TransitionTable,
};
use hireflow::telemetry;

use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_pipeline_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let table = Arc::new(TransitionTable::standard());
    let store = Arc::new(InMemoryCandidateStore::default());
    let audit = Arc::new(InMemoryAuditLog::default());
    let service = Arc::new(PipelineService::new(
        table.clone(),
        store.clone(),
        audit.clone(),
    ));
    let analytics = Arc::new(PipelineAnalytics::new(table, store, audit));

    let app = with_pipeline_routes(service, analytics, config.pipeline.bottleneck_threshold)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hiring pipeline service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
