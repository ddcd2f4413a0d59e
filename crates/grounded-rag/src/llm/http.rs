//! HTTP generation backend for OpenAI-compatible endpoints.
//!
//! Ollama, OpenRouter, Together and friends all serve the same
//! chat-completions shape, so one adapter covers the common deployments.
//! Transport and timeout failures map to `RagError::GenerationUnavailable`;
//! the pipeline decides what to do with that (it degrades, it never retries).

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use tokio::sync::mpsc;

use super::{GenerationBackend, TokenStream};
use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

pub struct HttpBackend {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(15))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn request_body(&self, prompt: &str, stream: bool) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
        })
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Parse a response body as JSON, returning a clear error if the server
    /// returned HTML (reverse proxies do this when the service is down).
    fn parse_answer(endpoint: &str, status: reqwest::StatusCode, body: &str) -> Result<String> {
        let trimmed = body.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(RagError::GenerationUnavailable(format!(
                "{} returned HTML instead of JSON (HTTP {}): {}",
                endpoint, status, preview
            )));
        }
        let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
            RagError::GenerationUnavailable(format!(
                "{} returned unparseable JSON (HTTP {}): {}",
                endpoint, status, e
            ))
        })?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                RagError::GenerationUnavailable(format!(
                    "{} response missing choices[0].message.content (HTTP {})",
                    endpoint, status
                ))
            })
    }

    /// Extract the content delta from one SSE `data:` payload, if any.
    fn parse_stream_delta(payload: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(payload).ok()?;
        value["choices"][0]["delta"]["content"]
            .as_str()
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let req = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(prompt, false));
        let response = self
            .apply_auth(req)
            .send()
            .await
            .map_err(|e| RagError::GenerationUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::GenerationUnavailable(format!("body read failed: {}", e)))?;
        if !status.is_success() {
            return Err(RagError::GenerationUnavailable(format!(
                "{} returned HTTP {}: {}",
                self.endpoint,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Self::parse_answer(&self.endpoint, status, &body)
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream> {
        let req = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(prompt, true));
        let response = self
            .apply_auth(req)
            .send()
            .await
            .map_err(|e| RagError::GenerationUnavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::GenerationUnavailable(format!(
                "{} returned HTTP {}",
                self.endpoint,
                response.status()
            )));
        }

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            'outer: while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("generation stream dropped mid-flight: {}", e);
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are newline-delimited; keep the trailing partial
                // line in the buffer for the next chunk.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        break 'outer;
                    }
                    if let Some(delta) = Self::parse_stream_delta(payload) {
                        if tx.send(delta).await.is_err() {
                            // Consumer stopped pulling; stop the backend read.
                            break 'outer;
                        }
                    }
                }
            }
        });

        Ok(TokenStream::new(rx))
    }
}
