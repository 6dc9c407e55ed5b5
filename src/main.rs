use anyhow::{Context, Result};
use gcs_bucket_report::*;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} {}", version::NAME, version::VERSION);
    let app_config = config::AppConfig::load()?;

    let credentials_path = app_config.credentials_path();
    let auth = auth::ServiceAccountAuth::from_file(&credentials_path)?;
    let project_id = match &app_config.gcp.project_id {
        Some(id) => id.clone(),
        None => auth.project_id().await?,
    };
    let tokens: auth::SharedTokenSource = Arc::new(auth);

    // Window is fixed here and shared by every query of the run.
    let window = models::TimeWindow::last_days(app_config.report.window_days);
    tracing::info!(
        project_id = %project_id,
        start = %window.start_rfc3339(),
        end = %window.end_rfc3339(),
        "Report window"
    );

    let client = http::build_client(app_config.api.request_timeout_secs)?;
    let storage_repo = storage_repo::StorageRepo::new(
        client.clone(),
        tokens.clone(),
        &app_config.api.storage_base_url,
        &project_id,
    );
    let monitoring_repo = monitoring_repo::MonitoringRepo::new(
        client,
        tokens,
        &app_config.api.monitoring_base_url,
        &project_id,
    );

    let driver = report::ReportDriver::new(
        &storage_repo,
        &monitoring_repo,
        &project_id,
        window,
        app_config.report.alignment_period_secs,
    );
    let run = driver.run().await.context("bucket enumeration failed")?;

    let path = export::report_path(
        Path::new(&app_config.report.output_dir),
        &app_config.report.file_prefix,
        &project_id,
    );
    export::write_report(&path, &run.records)?;

    tracing::info!(
        buckets = run.stats.buckets,
        queries = run.stats.queries,
        empty_series = run.stats.empty_series,
        substituted = run.stats.substitutions.len(),
        "Report complete"
    );
    for (kind, count) in run.stats.substitutions_by_kind() {
        tracing::warn!(?kind, count, "Metric queries substituted with zeros");
    }
    println!("Metrics have been successfully written to {}", path.display());
    Ok(())
}
