use crate::cli::ServeArgs;
use crate::infra::{demo_service, AppState};
use crate::routes::with_navigation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use care_navigation::config::{AppConfig, BalancerSchedule};
use care_navigation::error::AppError;
use care_navigation::matching::BalancerWorker;
use care_navigation::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(secs) = args.rebalance_interval_secs.take() {
        config.balancer = BalancerSchedule::from_secs(secs);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = demo_service(&config.matching)?;

    match config.balancer.interval {
        Some(interval) => match BalancerWorker::new(service.balancer(), interval) {
            Ok(worker) => {
                tokio::spawn(async move { worker.run(shutdown_signal()).await });
            }
            Err(err) => warn!(error = %err, "background rebalancing disabled"),
        },
        None => warn!("REBALANCE_INTERVAL_SECS is 0, background rebalancing disabled"),
    }

    let app = with_navigation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "care navigation service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
