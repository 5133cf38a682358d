//! Wikipedia as a knowledge source.
//!
//! A term is looked up through the REST summary endpoint first. When that
//! yields nothing usable, the search API picks the best-matching title and
//! its summary is fetched instead.

use async_trait::async_trait;
use ragroute_core::{KnowledgeError, KnowledgeItem, KnowledgeSource};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; ragroute RAG/1.0)";
const KIND: &str = "wikipedia";

pub struct WikipediaSource {
    client: reqwest::Client,
    base_url: String,
}

impl WikipediaSource {
    /// Query `https://{language}.wikipedia.org`.
    pub fn new(language: &str, timeout: Duration) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| KnowledgeError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: format!("https://{language}.wikipedia.org"),
        })
    }

    /// Point at another host serving the same API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, KnowledgeError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| KnowledgeError::InvalidResponse(format!("Bad base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| KnowledgeError::InvalidResponse(format!("Base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Option<reqwest::Response>, KnowledgeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                KnowledgeError::Timeout(e.to_string())
            } else {
                KnowledgeError::Network(e.to_string())
            }
        })?;
        if response.status().is_success() {
            Ok(Some(response))
        } else {
            debug!(status = response.status().as_u16(), "Wikipedia returned no page");
            Ok(None)
        }
    }

    /// Summary of the page titled `title`, if it is a real article.
    async fn summary(&self, title: &str) -> Result<Option<KnowledgeItem>, KnowledgeError> {
        let url = self.url(&["api", "rest_v1", "page", "summary", title])?;
        let Some(response) = self.get(url).await? else {
            return Ok(None);
        };
        let page: Summary = response
            .json()
            .await
            .map_err(|e| KnowledgeError::InvalidResponse(format!("summary for {title}: {e}")))?;

        if page.kind.as_deref() == Some("disambiguation") {
            debug!(title, "Skipping disambiguation page");
            return Ok(None);
        }
        let Some(extract) = page.extract.filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        Ok(Some(KnowledgeItem {
            title: page.title.unwrap_or_else(|| title.to_string()),
            content: extract,
            source: page
                .content_urls
                .and_then(|u| u.desktop)
                .and_then(|d| d.page)
                .unwrap_or_else(|| "Wikipedia".to_string()),
            kind: KIND.to_string(),
        }))
    }

    /// Title of the best full-text match for `term`.
    async fn best_title(&self, term: &str) -> Result<Option<String>, KnowledgeError> {
        let mut url = self.url(&["w", "api.php"])?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "search")
            .append_pair("srsearch", term)
            .append_pair("format", "json")
            .append_pair("srlimit", "1");

        let Some(response) = self.get(url).await? else {
            return Ok(None);
        };
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| KnowledgeError::InvalidResponse(format!("search for {term}: {e}")))?;

        Ok(body
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }
}

#[async_trait]
impl KnowledgeSource for WikipediaSource {
    fn name(&self) -> &str {
        KIND
    }

    async fn search(&self, term: &str) -> Result<Vec<KnowledgeItem>, KnowledgeError> {
        if let Some(item) = self.summary(term).await? {
            return Ok(vec![item]);
        }

        let Some(title) = self.best_title(term).await? else {
            return Ok(Vec::new());
        };
        Ok(self.summary(&title).await?.into_iter().collect())
    }
}

// ── Wikipedia API types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    #[serde(default)]
    desktop: Option<PageUrls>,
}

#[derive(Debug, Deserialize)]
struct PageUrls {
    #[serde(default)]
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use std::collections::HashMap;

    async fn summary(Path(title): Path<String>) -> axum::response::Response {
        match title.as_str() {
            "Albert Einstein" => axum::Json(serde_json::json!({
                "type": "standard",
                "title": "Albert Einstein",
                "extract": "Físico teórico alemán.",
                "content_urls": {"desktop": {"page": "https://es.wikipedia.org/wiki/Albert_Einstein"}}
            }))
            .into_response(),
            "Mercurio" => axum::Json(serde_json::json!({
                "type": "disambiguation",
                "title": "Mercurio",
                "extract": "Mercurio puede referirse a:"
            }))
            .into_response(),
            "Mercurio (planeta)" => axum::Json(serde_json::json!({
                "type": "standard",
                "title": "Mercurio (planeta)",
                "extract": "Planeta más cercano al Sol."
            }))
            .into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn search(Query(params): Query<HashMap<String, String>>) -> axum::Json<serde_json::Value> {
        let hits = match params.get("srsearch").map(String::as_str) {
            Some("Mercurio") => serde_json::json!([{"title": "Mercurio (planeta)"}]),
            _ => serde_json::json!([]),
        };
        axum::Json(serde_json::json!({"query": {"search": hits}}))
    }

    async fn source() -> WikipediaSource {
        let app = Router::new()
            .route("/api/rest_v1/page/summary/{title}", get(summary))
            .route("/w/api.php", get(search));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        WikipediaSource::new("es", Duration::from_secs(5))
            .unwrap()
            .with_base_url(format!("http://{addr}"))
    }

    #[tokio::test]
    async fn direct_summary_hit() {
        let items = source().await.search("Albert Einstein").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Albert Einstein");
        assert_eq!(items[0].content, "Físico teórico alemán.");
        assert_eq!(items[0].source, "https://es.wikipedia.org/wiki/Albert_Einstein");
        assert_eq!(items[0].kind, "wikipedia");
    }

    #[tokio::test]
    async fn disambiguation_falls_back_to_search() {
        let items = source().await.search("Mercurio").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Mercurio (planeta)");
        assert_eq!(items[0].source, "Wikipedia");
    }

    #[tokio::test]
    async fn unknown_term_is_empty_not_error() {
        let items = source().await.search("xyzzy").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = WikipediaSource::new("es", Duration::from_secs(2))
            .unwrap()
            .with_base_url(format!("http://{addr}"));
        assert!(source.search("Roma").await.is_err());
    }

    #[test]
    fn default_host_follows_language() {
        let source = WikipediaSource::new("en", Duration::from_secs(1)).unwrap();
        let url = source.url(&["api", "rest_v1", "page", "summary", "Torre Eiffel"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Torre%20Eiffel"
        );
    }
}
