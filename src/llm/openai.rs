use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::errors::AssistantError;

use super::provider::LlmProvider;
use super::types::ChatRequest;

/// OpenAI chat completions client.
#[derive(Clone)]
pub struct OpenAiChat {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl OpenAiChat {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            client: Client::new(),
        }
    }

    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": stream,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(s) = &request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }

        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool, AssistantError> {
        let url = format!("{}/v1/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, AssistantError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(&request, false);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AssistantError::provider)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Provider(format!(
                "OpenAI chat error: {}",
                text
            )));
        }

        let payload: Value = res.json().await.map_err(AssistantError::provider)?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(content)
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, AssistantError>>, AssistantError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(&request, true);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AssistantError::provider)?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Provider(format!(
                "OpenAI stream error: {}",
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
                            if line.is_empty() {
                                continue;
                            }
                            if line == "data: [DONE]" {
                                return;
                            }

                            if let Some(data) = line.strip_prefix("data: ") {
                                if let Ok(json) = serde_json::from_str::<Value>(data) {
                                    if let Some(content) =
                                        json["choices"][0]["delta"]["content"].as_str()
                                    {
                                        if !content.is_empty()
                                            && tx.send(Ok(content.to_string())).await.is_err()
                                        {
                                            return;
                                        }
                                    }
                                }
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
