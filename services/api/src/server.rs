use crate::cli::ServeArgs;
use crate::infra::{build_store, AppState};
use crate::routes::with_report_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use forms_report::config::AppConfig;
use forms_report::error::AppError;
use forms_report::reports::forms::FormsReportService;
use forms_report::reports::ReportRegistry;
use forms_report::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = build_store(
        args.data.seed.as_deref(),
        config.environment.allows_demo_data(),
    )?;
    info!(submissions = store.len(), seeded = args.data.seed.is_some(), "submission store loaded");

    let service = Arc::new(FormsReportService::new(
        Arc::new(store),
        Arc::new(ReportRegistry::standard()),
        config.reports,
    ));

    let app = with_report_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        environment = ?config.environment,
        %addr,
        period_match = ?config.reports.period_match,
        max_export_rows = config.reports.limits.max_rows,
        "forms report service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
