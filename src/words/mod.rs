mod datamuse;
mod dictionary;
mod http;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::WordPair;

pub use datamuse::{DatamuseSupply, INFINITE_CATEGORY};
pub use dictionary::{category_names, find_category, Category, DictionarySupply};
pub use http::HttpWordSupply;

/// Result type for word supply operations
pub type WordResult<T> = Result<T, WordError>;

/// Errors that can occur while fetching a word pair
#[derive(Debug, thiserror::Error)]
pub enum WordError {
    #[error("Word service unreachable: {0}")]
    Transport(String),

    #[error("Word service returned status: {0}")]
    Status(u16),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response parsing failed: {0}")]
    ParseError(String),

    #[error("Unplayable word pair: {0}")]
    Unplayable(String),

    #[error("No words available for category {category:?} ({lang})")]
    Empty { category: String, lang: String },
}

/// Source of `{real, trap}` pairs.
///
/// Successive calls for the same category may return different pairs. An
/// implementation either returns a complete pair or an error, never a pair
/// with missing words.
#[async_trait]
pub trait WordSupply: Send + Sync {
    async fn fetch_pair(&self, category: &str, lang: &str) -> WordResult<WordPair>;

    /// Name of this supply, for logs
    fn name(&self) -> &str;
}

/// Configuration for the HTTP word supply
#[derive(Debug, Clone)]
pub struct WordSupplyConfig {
    /// Base URL of the word service
    pub base_url: String,
    /// Timeout for one fetch
    pub timeout: Duration,
}

impl Default for WordSupplyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl WordSupplyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("IMPOSTOR_WORD_API")
            .ok()
            .and_then(|url| {
                let trimmed = url.trim().trim_end_matches('/');
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or(defaults.base_url);

        let timeout = std::env::var("IMPOSTOR_WORD_TIMEOUT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self { base_url, timeout }
    }

    pub fn build_supply(&self) -> HttpWordSupply {
        HttpWordSupply::new(self.base_url.clone(), self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("IMPOSTOR_WORD_API", " http://words.local:9000/ ");
        std::env::set_var("IMPOSTOR_WORD_TIMEOUT", "12");
        let config = WordSupplyConfig::from_env();
        assert_eq!(config.base_url, "http://words.local:9000");
        assert_eq!(config.timeout, Duration::from_secs(12));

        std::env::remove_var("IMPOSTOR_WORD_API");
        std::env::remove_var("IMPOSTOR_WORD_TIMEOUT");
        let config = WordSupplyConfig::from_env();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
