use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, AppState};
use crate::routes::with_hiring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hiring_workflow::config::AppConfig;
use hiring_workflow::error::AppError;
use hiring_workflow::telemetry;
use hiring_workflow::workflows::hiring::{drive, SystemClock, Ticker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock = Arc::new(SystemClock);
    let (service, _outbox) = in_memory_service(clock.clone());

    let ticker = Arc::new(Ticker::new());
    ticker.subscribe(service.clone());
    let countdown = drive(ticker, clock, config.assessment.tick_interval());

    let app = with_hiring_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        tick_ms = config.assessment.tick_interval_ms,
        "hiring workflow service ready"
    );

    let served = axum::serve(listener, app).await;
    countdown.abort();
    served?;
    Ok(())
}
