use anyhow::{Context, Result};
use multilingual_metadata::{config, db::Database, registry};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_metadata=info".parse()?)
                .add_directive("build_registry=info".parse()?),
        )
        .init();

    info!("Starting subtag database build");

    let config = config::Config::from_env()?;

    let data = registry::download_registry(&config).await?;

    if let Some(parent) = Path::new(&config.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let db = Database::new(&config.database_path)?;
    let summary = db.import_registry(&data)?;

    info!(
        "✓ Wrote {} subtag entries to {}",
        summary.records, config.database_path
    );
    if let Some(date) = db.registry_file_date()? {
        info!("Registry file date: {}", date);
    }

    Ok(())
}
