use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::errors::AssistantError;

use super::provider::LlmProvider;
use super::types::ChatRequest;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// The messages API requires max_tokens; fall back when the request omits it.
const DEFAULT_MAX_TOKENS: i32 = 1000;

/// Anthropic messages API client.
#[derive(Clone)]
pub struct AnthropicChat {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicChat {
    pub fn new(base_url: Option<String>, api_key: String, model: String) -> Self {
        let base_url = base_url.unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client: Client::new(),
        }
    }

    /// System-role messages move to the top-level `system` field; the
    /// messages array keeps only user/assistant turns.
    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": turns,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if !system.is_empty() {
                obj.insert("system".to_string(), json!(system.join("\n\n")));
            }
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(s) = &request.stop {
                obj.insert("stop_sequences".to_string(), json!(s));
            }
        }

        body
    }

    fn post(&self, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
    }
}

#[async_trait]
impl LlmProvider for AnthropicChat {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn health_check(&self) -> Result<bool, AssistantError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, AssistantError> {
        let body = self.request_body(&request, false);

        let res = self.post(&body).send().await.map_err(AssistantError::provider)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Provider(format!(
                "Anthropic chat error: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(AssistantError::provider)?;

        let content = payload["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, AssistantError>>, AssistantError> {
        let body = self.request_body(&request, true);

        let res = self.post(&body).send().await.map_err(AssistantError::provider)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Provider(format!(
                "Anthropic stream error: {}",
                text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        let chunk_str = String::from_utf8_lossy(&bytes);
                        for line in chunk_str.lines() {
                            let line = line.trim();
                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };

                            let Ok(event) = serde_json::from_str::<Value>(data) else {
                                continue;
                            };

                            match event["type"].as_str() {
                                Some("content_block_delta") => {
                                    if let Some(text) = event["delta"]["text"].as_str() {
                                        if !text.is_empty()
                                            && tx.send(Ok(text.to_string())).await.is_err()
                                        {
                                            return;
                                        }
                                    }
                                }
                                Some("message_stop") => return,
                                _ => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(AssistantError::provider(e))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
