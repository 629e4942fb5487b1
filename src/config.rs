use anyhow::{Context, Result};

pub const DEFAULT_IANA_REGISTRY_URL: &str =
    "https://www.iana.org/assignments/language-subtag-registry";
pub const DEFAULT_ISO_639_2_URL: &str =
    "https://www.loc.gov/standards/iso639-2/ISO-639-2_utf-8.txt";
pub const DEFAULT_UNICODE_SCRIPTS_URL: &str =
    "https://www.unicode.org/Public/UNIDATA/Scripts.txt";

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_path: String,

    // Upstream reference data
    pub iana_registry_url: String,
    pub iso_639_2_url: String,
    pub unicode_scripts_url: String,

    // HTTP
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_path: std::env::var("ZLS_DATABASE_PATH")
                .unwrap_or_else(|_| "data/zls.sqlite".to_string()),

            iana_registry_url: std::env::var("IANA_REGISTRY_URL")
                .unwrap_or_else(|_| DEFAULT_IANA_REGISTRY_URL.to_string()),
            iso_639_2_url: std::env::var("ISO_639_2_URL")
                .unwrap_or_else(|_| DEFAULT_ISO_639_2_URL.to_string()),
            unicode_scripts_url: std::env::var("UNICODE_SCRIPTS_URL")
                .unwrap_or_else(|_| DEFAULT_UNICODE_SCRIPTS_URL.to_string()),

            http_timeout_secs: match std::env::var("HTTP_TIMEOUT_SECS") {
                Ok(value) => value
                    .parse()
                    .context(format!("HTTP_TIMEOUT_SECS is not a number: {}", value))?,
                Err(_) => 30,
            },
        })
    }

    /// Configuration pointing every upstream source at one base URL.
    ///
    /// Used by tests that serve the reference files from a mock server.
    pub fn with_sources_at(base_url: &str, database_path: &str) -> Self {
        Self {
            database_path: database_path.to_string(),
            iana_registry_url: format!("{}/language-subtag-registry", base_url),
            iso_639_2_url: format!("{}/ISO-639-2_utf-8.txt", base_url),
            unicode_scripts_url: format!("{}/Scripts.txt", base_url),
            http_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sources_at_builds_urls() {
        let config = Config::with_sources_at("http://127.0.0.1:9000", "/tmp/zls.sqlite");

        assert_eq!(
            config.iana_registry_url,
            "http://127.0.0.1:9000/language-subtag-registry"
        );
        assert_eq!(config.iso_639_2_url, "http://127.0.0.1:9000/ISO-639-2_utf-8.txt");
        assert_eq!(config.unicode_scripts_url, "http://127.0.0.1:9000/Scripts.txt");
        assert_eq!(config.database_path, "/tmp/zls.sqlite");
    }
}
