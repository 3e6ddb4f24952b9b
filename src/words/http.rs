use super::*;
use std::time::Instant;

/// Word supply backed by the word service's `/api/word` endpoint
pub struct HttpWordSupply {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpWordSupply {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WordSupply for HttpWordSupply {
    async fn fetch_pair(&self, category: &str, lang: &str) -> WordResult<WordPair> {
        let start = Instant::now();
        let url = format!("{}/api/word", self.base_url);

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .get(&url)
                .query(&[("category", category), ("lang", lang)])
                .send(),
        )
        .await
        .map_err(|_| WordError::Timeout(self.timeout))?
        .map_err(|e| WordError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WordError::Status(response.status().as_u16()));
        }

        let pair: WordPair = response
            .json()
            .await
            .map_err(|e| WordError::ParseError(e.to_string()))?;

        pair.check().map_err(WordError::Unplayable)?;

        tracing::debug!(
            "Fetched word pair for {} ({}) in {}ms",
            category,
            lang,
            start.elapsed().as_millis()
        );
        Ok(pair)
    }

    fn name(&self) -> &str {
        "http"
    }
}
