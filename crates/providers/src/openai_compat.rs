//! OpenAI-compatible provider implementation.
//!
//! Works with llama.cpp's `server`, Ollama, vLLM, and any endpoint exposing
//! `/chat/completions`, `/embeddings`, and `/models`.

use async_trait::async_trait;
use ragroute_core::error::ProviderError;
use ragroute_core::message::{Message, Role};
use ragroute_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible language model server.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// A local llama.cpp server (no key).
    pub fn llamacpp(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Self::new("llamacpp", base_url, None, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: m.content.clone(),
            })
            .collect()
    }

    /// Send a JSON POST and map transport and status failures.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post_json("chat/completions", &body).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage,
            model: api_response.model.unwrap_or(request.model),
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_transport_error)?;

        Ok(response.status().is_success())
    }

    async fn embed(&self, request: EmbeddingRequest) -> std::result::Result<EmbeddingResponse, ProviderError> {
        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self.post_json("embeddings", &body).await?;

        let mut api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        // Servers may return rows out of order; `index` is authoritative.
        api_resp.data.sort_by_key(|d| d.index);
        let embeddings = api_resp.data.into_iter().map(|d| d.embedding).collect();

        Ok(EmbeddingResponse {
            embeddings,
            model: api_resp.model.unwrap_or(request.model),
        })
    }
}

// ── OpenAI API types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::{get, post};

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn provider(base_url: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", base_url, Some("sk-test".into()), Duration::from_secs(5)).unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "bitnet".into(),
            messages: vec![Message::system("Be brief"), Message::user("2+2?")],
            temperature: 0.7,
            max_tokens: Some(512),
            stop: vec![],
        }
    }

    #[test]
    fn trailing_slash_trimmed() {
        let p = OpenAiCompatProvider::llamacpp("http://localhost:11435/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(p.base_url(), "http://localhost:11435/v1");
        assert_eq!(p.name(), "llamacpp");
    }

    #[test]
    fn message_conversion() {
        let api_messages = OpenAiCompatProvider::to_api_messages(&request().messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn parse_chat_response() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11},
            "model": "bitnet"
        }"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("4"));
        assert_eq!(resp.usage.unwrap().total_tokens, 11);
    }

    #[tokio::test]
    async fn complete_against_local_server() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|axum::Json(body): axum::Json<serde_json::Value>| async move {
                assert_eq!(body["max_tokens"], 512);
                assert_eq!(body["messages"][0]["role"], "system");
                axum::Json(serde_json::json!({
                    "choices": [{"message": {"content": "4"}}],
                    "model": "bitnet"
                }))
            }),
        );
        let base = serve(app).await;

        let resp = provider(&base).complete(request()).await.unwrap();
        assert_eq!(resp.message.content, "4");
        assert_eq!(resp.message.role, Role::Assistant);
        assert_eq!(resp.model, "bitnet");
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let app = Router::new()
            .route("/limited/chat/completions", post(|| async { StatusCode::TOO_MANY_REQUESTS }))
            .route("/denied/chat/completions", post(|| async { StatusCode::UNAUTHORIZED }))
            .route(
                "/broken/chat/completions",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "loading model") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let limited = provider(&format!("http://{addr}/limited")).complete(request()).await;
        assert!(matches!(limited, Err(ProviderError::RateLimited { .. })));

        let denied = provider(&format!("http://{addr}/denied")).complete(request()).await;
        assert!(matches!(denied, Err(ProviderError::AuthenticationFailed(_))));

        match provider(&format!("http://{addr}/broken")).complete(request()).await {
            Err(ProviderError::ApiError { status_code, message }) => {
                assert_eq!(status_code, 503);
                assert_eq!(message, "loading model");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn embed_orders_rows_by_index() {
        let app = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                axum::Json(serde_json::json!({
                    "data": [
                        {"index": 1, "embedding": [0.0, 1.0]},
                        {"index": 0, "embedding": [1.0, 0.0]}
                    ]
                }))
            }),
        );
        let base = serve(app).await;

        let resp = provider(&base)
            .embed(EmbeddingRequest {
                model: "minilm".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(resp.embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(resp.model, "minilm");
    }

    #[tokio::test]
    async fn health_check_reflects_models_endpoint() {
        let app = Router::new().route("/v1/models", get(|| async { axum::Json(serde_json::json!({"data": []})) }));
        let base = serve(app).await;
        assert!(provider(&base).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(&format!("http://{addr}/v1")).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_) | ProviderError::Timeout(_)));
    }
}
