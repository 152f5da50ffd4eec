use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::errors::AssistantError;

use super::provider::EmbeddingProvider;

/// OpenAI embeddings client. Works against api.openai.com or any
/// OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiEmbeddings {
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: Client,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: String, api_key: String, model: String, dimensions: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            dimensions,
            client: Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AssistantError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AssistantError::provider)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Provider(format!(
                "embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(AssistantError::provider)?;

        let mut embeddings = Vec::with_capacity(inputs.len());
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(AssistantError::Provider(format!(
                "embedding count mismatch: sent {}, received {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
