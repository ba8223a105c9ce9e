use std::{sync::Arc, time::Duration};

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use common::{
    error::{AppError, GenerationError},
    utils::config::{AppConfig, GenerationBackend},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Remote text generation: one prompt in, one completion out.
#[async_trait]
pub trait Generator: Send + Sync {
    fn label(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Builds the generator selected by `generation_backend`.
pub fn generator_from_config(config: &AppConfig) -> Result<Arc<dyn Generator>, AppError> {
    let timeout = Duration::from_secs(config.generation_timeout_secs);
    let generator: Arc<dyn Generator> = match config.generation_backend {
        GenerationBackend::Ollama => Arc::new(OllamaGenerator::new(
            config.ollama_url.clone(),
            config.generation_model.clone(),
            timeout,
        )?),
        GenerationBackend::OpenAI => {
            let mut openai_config = OpenAIConfig::new().with_api_base(&config.openai_base_url);
            if let Some(key) = &config.openai_api_key {
                openai_config = openai_config.with_api_key(key);
            }
            Arc::new(OpenAiGenerator::new(
                Client::with_config(openai_config),
                config.generation_model.clone(),
                timeout,
            ))
        }
    };

    info!(
        backend = generator.label(),
        model = %config.generation_model,
        timeout_secs = config.generation_timeout_secs,
        "generator initialised"
    );

    Ok(generator)
}

const OLLAMA: &str = "Ollama";

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Non-streaming client for Ollama's `/api/generate`.
pub struct OllamaGenerator {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(url: String, model: String, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::InternalError(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { http, url, model })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn label(&self) -> &'static str {
        OLLAMA
    }

    #[tracing::instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let payload = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(url = %self.url, error = %err, "ollama request failed");
                transport_error(OLLAMA, &err)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "ollama returned an error status");
            return Err(GenerationError::UpstreamStatus {
                backend: OLLAMA,
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                GenerationError::Timeout { backend: OLLAMA }
            } else {
                debug!(error = %err, "ollama body is not JSON");
                GenerationError::Malformed { backend: OLLAMA }
            }
        })?;

        body.get("response")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(GenerationError::Malformed { backend: OLLAMA })
    }
}

fn transport_error(backend: &'static str, err: &reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout { backend }
    } else if let Some(status) = err.status() {
        GenerationError::UpstreamStatus {
            backend,
            status: status.as_u16(),
        }
    } else {
        GenerationError::Unreachable { backend }
    }
}

const OPENAI: &str = "OpenAI";

/// Single-turn chat completion against an OpenAI-compatible endpoint.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn label(&self) -> &'static str {
        OPENAI
    }

    #[tracing::instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessage::from(prompt).into()])
            .build()
            .map_err(|err| {
                warn!(error = %err, "failed to build chat completion request");
                GenerationError::Malformed { backend: OPENAI }
            })?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| GenerationError::Timeout { backend: OPENAI })?
            .map_err(|err| {
                warn!(error = %err, "chat completion failed");
                openai_error(&err)
            })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::Malformed { backend: OPENAI })
    }
}

fn openai_error(err: &OpenAIError) -> GenerationError {
    match err {
        OpenAIError::Reqwest(inner) => transport_error(OPENAI, inner),
        OpenAIError::JSONDeserialize(_) => GenerationError::Malformed { backend: OPENAI },
        _ => GenerationError::Unreachable { backend: OPENAI },
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    async fn emulate(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}/api/generate")
    }

    fn generator(url: String, timeout: Duration) -> OllamaGenerator {
        OllamaGenerator::new(url, "llama3.1:8b".into(), timeout).expect("client builds")
    }

    #[tokio::test]
    async fn returns_response_field() {
        let url = emulate(Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "llama3.1:8b");
                assert_eq!(body["stream"], false);
                Json(json!({ "response": format!("echo: {}", body["prompt"].as_str().unwrap_or_default()) }))
            }),
        ))
        .await;

        let answer = generator(url, Duration::from_secs(5))
            .generate("ping")
            .await
            .expect("generates");
        assert_eq!(answer, "echo: ping");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let url = emulate(Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let err = generator(url, Duration::from_secs(5))
            .generate("ping")
            .await
            .expect_err("500 fails");
        assert_eq!(
            err,
            GenerationError::UpstreamStatus {
                backend: "Ollama",
                status: 500
            }
        );
        assert_eq!(err.to_string(), "Ollama returned HTTP 500");
    }

    #[tokio::test]
    async fn missing_response_field_is_malformed() {
        let url = emulate(Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({ "done": true })) }),
        ))
        .await;

        let err = generator(url, Duration::from_secs(5))
            .generate("ping")
            .await
            .expect_err("malformed");
        assert_eq!(err, GenerationError::Malformed { backend: "Ollama" });
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let url = emulate(Router::new().route(
            "/api/generate",
            post(|| async { "plain text" }),
        ))
        .await;

        let err = generator(url, Duration::from_secs(5))
            .generate("ping")
            .await
            .expect_err("malformed");
        assert_eq!(err, GenerationError::Malformed { backend: "Ollama" });
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let url = emulate(Router::new().route(
            "/api/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "response": "late" }))
            }),
        ))
        .await;

        let err = generator(url, Duration::from_millis(200))
            .generate("ping")
            .await
            .expect_err("times out");
        assert_eq!(err, GenerationError::Timeout { backend: "Ollama" });
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let err = generator(format!("http://{addr}/api/generate"), Duration::from_secs(2))
            .generate("ping")
            .await
            .expect_err("unreachable");
        assert_eq!(err, GenerationError::Unreachable { backend: "Ollama" });
        assert_eq!(err.to_string(), "Failed to reach Ollama service");
    }

    #[tokio::test]
    async fn openai_rejection_is_unreachable_not_malformed() {
        let url = emulate(Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": {
                            "message": "Incorrect API key provided",
                            "type": "invalid_request_error",
                            "param": null,
                            "code": "invalid_api_key"
                        }
                    })),
                )
            }),
        ))
        .await;
        let api_base = format!("{}/v1", url.trim_end_matches("/api/generate"));
        let client = Client::with_config(OpenAIConfig::new().with_api_base(api_base));

        let err = OpenAiGenerator::new(client, "gpt-4o-mini".into(), Duration::from_secs(5))
            .generate("ping")
            .await
            .expect_err("rejected");
        assert_eq!(err, GenerationError::Unreachable { backend: "OpenAI" });
    }

    #[test]
    fn selects_backend_from_config() {
        let config = AppConfig::default();
        let generator = generator_from_config(&config).expect("builds");
        assert_eq!(generator.label(), "Ollama");

        let config = AppConfig {
            generation_backend: GenerationBackend::OpenAI,
            ..AppConfig::default()
        };
        let generator = generator_from_config(&config).expect("builds");
        assert_eq!(generator.label(), "OpenAI");
    }
}
