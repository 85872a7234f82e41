mod bootstrap;

use analytics_core::settings::Settings;
use analytics_runtime::ingestor::AnalyticsIngestor;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("ga-source v{} starting", env!("CARGO_PKG_VERSION"));

    let opts = settings.ingest_options()?;
    tracing::info!(
        "View: ga:{}, start: {}",
        opts.view_id,
        opts.start_date.as_deref().unwrap_or("default")
    );

    let mut ingestor =
        AnalyticsIngestor::connect(&opts, &settings.api_base, settings.request_timeout())?;
    if let Some(max) = settings.max_results {
        ingestor = ingestor.with_max_results(max);
    }

    let mut output = bootstrap::NodeOutput::open(settings.output.as_deref())?;

    // Emitted nodes are flushed either way; the target file is only
    // replaced when the whole run succeeds.
    let outcome = ingestor.run(output.sink()).await;
    let report = match outcome {
        Ok(report) => {
            output.commit()?;
            report
        }
        Err(e) => {
            if let Some(staged) = output.abandon()? {
                tracing::warn!("Partial output left in {}", staged.display());
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        "Emitted {} nodes ({} site-wide, {} per path)",
        report.total(),
        report.site_wide,
        report.page_paths
    );

    Ok(())
}
