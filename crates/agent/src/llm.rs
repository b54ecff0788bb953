use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use carlot_core::config::LlmConfig;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Text completion against an Ollama `/api/generate` endpoint.
///
/// One client is built at process start and shared; per-call deadlines come
/// from the configured timeout on the underlying HTTP client.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    repeat_penalty: f64,
    api_key: Option<String>,
}

/// Generation stops at these tokens to keep replies single-turn.
const STOP_SEQUENCES: &[&str] = &["Human:", "Assistant:"];

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Serialize)]
struct GenerateOptions<'a> {
    temperature: f64,
    repeat_penalty: f64,
    stop: &'a [&'a str],
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("failed to build HTTP client for the LLM endpoint")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            repeat_penalty: config.repeat_penalty,
            api_key: config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                repeat_penalty: self.repeat_penalty,
                stop: STOP_SEQUENCES,
            },
        };

        let mut request = self.http.post(format!("{}/api/generate", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .context("LLM endpoint unreachable")?
            .error_for_status()
            .context("LLM endpoint returned an error status")?;

        let payload: GenerateResponse =
            response.json().await.context("LLM reply was not a generate response")?;
        Ok(payload.response)
    }
}

#[cfg(test)]
mod tests {
    use carlot_core::config::LlmConfig;

    use super::OllamaClient;

    #[test]
    fn trailing_slash_in_base_url_is_normalized() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/".to_string(),
            model: "llama3.1".to_string(),
            temperature: 0.7,
            repeat_penalty: 1.1,
            timeout_secs: 30,
            api_key: None,
        };

        let client = OllamaClient::new(&config).expect("build client");
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
