use crate::config::Config;
use crate::registry::RegistryData;
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),
}

impl FetchError {
    /// Client errors other than rate limiting will not go away on retry.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request(_) => true,
            FetchError::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }
}

/// Download the three upstream sources and parse them.
pub async fn download_registry(config: &Config) -> Result<RegistryData> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(concat!("multilingual-metadata/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let retry_config = RetryConfig::registry_download();

    let (iana, iso, scripts) = tokio::try_join!(
        fetch_source(&client, &retry_config, "IANA subtag registry", &config.iana_registry_url),
        fetch_source(&client, &retry_config, "ISO 639-2 code list", &config.iso_639_2_url),
        fetch_source(&client, &retry_config, "Unicode scripts", &config.unicode_scripts_url),
    )?;

    let data = RegistryData::parse(&iana, &iso, &scripts);
    info!(
        "Parsed {} registry records, {} ISO 639-2 aliases, {} script ranges (registry date {})",
        data.records.len(),
        data.iso_aliases.len(),
        data.script_ranges.len(),
        data.file_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    Ok(data)
}

async fn fetch_source(
    client: &reqwest::Client,
    retry_config: &RetryConfig,
    name: &str,
    url: &str,
) -> Result<String> {
    info!("Downloading {} from {}", name, url);

    let text = with_retry_if(
        retry_config,
        name,
        || fetch_text(client, url),
        FetchError::is_retryable,
    )
    .await
    .context(format!("Failed to download {} from {}", name, url))?;

    info!("✓ Downloaded {} ({} bytes)", name, text.len());
    Ok(text)
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(response.text().await?)
}
