//! HTTP word service.
//!
//! Serves random word pairs from the built-in dictionary, plus the open-ended
//! [`INFINITE_CATEGORY`] when an extra supply is configured. This is the
//! service [`crate::words::HttpWordSupply`] talks to.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::words::{
    category_names, find_category, DatamuseSupply, WordSupply, INFINITE_CATEGORY,
};

/// Configuration for the word service binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Datamuse base URL backing the infinite category; `None` disables it
    pub datamuse_url: Option<String>,
    pub datamuse_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            datamuse_url: Some("https://api.datamuse.com".to_string()),
            datamuse_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("IMPOSTOR_BIND_ADDR")
            .ok()
            .and_then(|s| match s.trim().parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Ignoring invalid IMPOSTOR_BIND_ADDR {:?}: {}", s, e);
                    None
                }
            })
            .unwrap_or(defaults.bind_addr);

        // "off" disables the infinite category
        let datamuse_url = match std::env::var("IMPOSTOR_DATAMUSE_URL") {
            Ok(url) => {
                let trimmed = url.trim().trim_end_matches('/');
                if trimmed.eq_ignore_ascii_case("off") {
                    None
                } else if trimmed.is_empty() {
                    defaults.datamuse_url
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(_) => defaults.datamuse_url,
        };

        Self {
            bind_addr,
            datamuse_url,
            datamuse_timeout: defaults.datamuse_timeout,
        }
    }

    /// Router for this configuration
    pub fn router(&self) -> Router {
        match &self.datamuse_url {
            Some(url) => router_with_infinite(Arc::new(DatamuseSupply::new(
                url.clone(),
                self.datamuse_timeout,
            ))),
            None => router(),
        }
    }
}

#[derive(Default)]
pub struct WordService {
    infinite: Option<Arc<dyn WordSupply>>,
}

#[derive(Debug, Deserialize)]
pub struct WordQuery {
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesQuery {
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<&'static str>,
}

/// Dictionary-only router
pub fn router() -> Router {
    build(WordService::default())
}

/// Router that also serves [`INFINITE_CATEGORY`] from `supply`
pub fn router_with_infinite(supply: Arc<dyn WordSupply>) -> Router {
    build(WordService {
        infinite: Some(supply),
    })
}

fn build(service: WordService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/word", get(random_word))
        .route("/api/categories", get(list_categories))
        .with_state(Arc::new(service))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Random `{real, trap}` pair.
///
/// GET /api/word?category=..&lang=..
///
/// Unknown categories fall back to the language's first category.
pub async fn random_word(
    State(service): State<Arc<WordService>>,
    Query(query): Query<WordQuery>,
) -> Response {
    if let Some(supply) = service
        .infinite
        .as_ref()
        .filter(|_| query.category == INFINITE_CATEGORY)
    {
        return match supply.fetch_pair(&query.category, &query.lang).await {
            Ok(pair) => Json(pair).into_response(),
            Err(e) => {
                tracing::error!("Word supply {} failed: {}", supply.name(), e);
                (StatusCode::BAD_GATEWAY, format!("Word supply failed: {}", e)).into_response()
            }
        };
    }

    let category = find_category(&query.category, &query.lang);
    match category.random_pair() {
        Some(pair) => {
            tracing::debug!(
                "Serving pair for {} ({}) from {}",
                query.category,
                query.lang,
                category.name
            );
            Json(pair).into_response()
        }
        None => {
            tracing::error!("Category {} has no words", category.name);
            (StatusCode::SERVICE_UNAVAILABLE, "No words available").into_response()
        }
    }
}

/// GET /api/categories?lang=..
pub async fn list_categories(
    State(service): State<Arc<WordService>>,
    Query(query): Query<CategoriesQuery>,
) -> Json<CategoriesResponse> {
    let mut categories = Vec::new();
    if service.infinite.is_some() {
        categories.push(INFINITE_CATEGORY);
    }
    categories.extend(category_names(&query.lang));
    Json(CategoriesResponse { categories })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WordPair;
    use crate::words::{WordError, WordResult};
    use axum::body::Body;
    use axum::http::Request;
    use serial_test::serial;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        get_json_from(router(), uri).await
    }

    async fn get_json_from(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_word_from_requested_category() {
        let animals = find_category("Animals", "en");
        let (status, body) = get_json("/api/word?category=Animals&lang=en").await;
        assert_eq!(status, StatusCode::OK);

        let real = body["real"].as_str().unwrap();
        let trap = body["trap"].as_str().unwrap();
        assert!(animals.pairs.iter().any(|(r, t)| *r == real && *t == trap));
    }

    #[tokio::test]
    async fn test_word_unknown_category_falls_back() {
        let general = find_category("General", "es");
        let (status, body) = get_json("/api/word?category=Nope&lang=es").await;
        assert_eq!(status, StatusCode::OK);
        let real = body["real"].as_str().unwrap();
        assert!(general.pairs.iter().any(|(r, _)| *r == real));
    }

    #[tokio::test]
    async fn test_word_without_query() {
        let (status, body) = get_json("/api/word").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["real"].is_string());
        assert!(body["trap"].is_string());
    }

    #[tokio::test]
    async fn test_categories() {
        let (_, body) = get_json("/api/categories?lang=es").await;
        assert_eq!(
            body["categories"],
            serde_json::json!(["General", "Animales", "Comida", "Lugares"])
        );

        let (_, body) = get_json("/api/categories").await;
        assert_eq!(body["categories"][1], "Animals");
    }

    struct FixedSupply(Option<WordPair>);

    #[async_trait::async_trait]
    impl WordSupply for FixedSupply {
        async fn fetch_pair(&self, _category: &str, _lang: &str) -> WordResult<WordPair> {
            self.0.clone().ok_or(WordError::Status(503))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    const INFINITE_QUERY: &str = "/api/word?category=%E2%9C%A8%20Infinite&lang=en";

    #[tokio::test]
    async fn test_infinite_category_uses_extra_supply() {
        let app = router_with_infinite(Arc::new(FixedSupply(Some(WordPair::new(
            "Fire", "Ember",
        )))));
        let (status, body) = get_json_from(app.clone(), INFINITE_QUERY).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"real": "Fire", "trap": "Ember"}));

        let (_, body) = get_json_from(app, "/api/categories?lang=es").await;
        assert_eq!(body["categories"][0], INFINITE_CATEGORY);
        assert_eq!(body["categories"][1], "General");
    }

    #[tokio::test]
    async fn test_infinite_supply_failure_is_bad_gateway() {
        let app = router_with_infinite(Arc::new(FixedSupply(None)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(INFINITE_QUERY)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_infinite_without_supply_falls_back() {
        let (status, body) = get_json(INFINITE_QUERY).await;
        assert_eq!(status, StatusCode::OK);
        let general = find_category("General", "en");
        let real = body["real"].as_str().unwrap();
        assert!(general.pairs.iter().any(|(r, _)| *r == real));

        let (_, body) = get_json("/api/categories").await;
        assert_eq!(body["categories"][0], "General");
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        std::env::set_var("IMPOSTOR_BIND_ADDR", "127.0.0.1:9999");
        std::env::set_var("IMPOSTOR_DATAMUSE_URL", " http://words.test/ ");
        let config = ServerConfig::from_env();
        assert_eq!(config.bind_addr, "127.0.0.1:9999".parse().unwrap());
        assert_eq!(config.datamuse_url.as_deref(), Some("http://words.test"));

        std::env::set_var("IMPOSTOR_BIND_ADDR", "not-an-addr");
        std::env::set_var("IMPOSTOR_DATAMUSE_URL", "OFF");
        let config = ServerConfig::from_env();
        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(config.datamuse_url, None);

        std::env::remove_var("IMPOSTOR_BIND_ADDR");
        std::env::remove_var("IMPOSTOR_DATAMUSE_URL");
        assert_eq!(
            ServerConfig::from_env().datamuse_url,
            ServerConfig::default().datamuse_url
        );
    }
}
