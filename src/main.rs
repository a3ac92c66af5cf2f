use anyhow::{Context, Result};
use oplscraper::{pipeline, report, PipelineConfig};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
    info!("startup");

    // ─── 2) configure run ────────────────────────────────────────────
    let config = PipelineConfig::from_env().context("loading configuration")?;
    let client = Client::new();

    // ─── 3) fetch, extract, load, normalize, export ──────────────────
    let run = pipeline::run(&client, &config).await?;

    // ─── 4) summary ──────────────────────────────────────────────────
    let summary = report::render_summary(&run.dataset, config.preview_rows)
        .context("formatting summary")?;
    println!("\n{}", summary);

    info!(
        source = %run.source_csv.display(),
        age_normalized = run.age_normalized,
        "all done"
    );
    Ok(())
}
