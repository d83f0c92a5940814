use anyhow::{Context, Result};
use catalog_pipeline::{init_tracing, AppConfig, CatalogApp};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = AppConfig::from_env().context("invalid pipeline configuration")?;
    let app = CatalogApp::initialize(config).context("failed to open catalog database")?;
    info!(path = %app.db_path().display(), "starting normalization run");

    let summary = app.run_once().await.context("normalization run failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
