use std::time::Duration;

use reqwest::Client;

use super::{GenerationBackend, GenerationError, http_client};
use crate::provider::Provider;

/// OpenAI-compatible chat completions endpoint (OpenAI, xAI, Gemini).
pub struct HostedBackend {
    client: Client,
    provider: Provider,
    api_key: String,
    model: String,
}

impl HostedBackend {
    pub fn new(
        provider: Provider,
        api_key: String,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(request_timeout)?,
            provider,
            api_key,
            model: model.into(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl GenerationBackend for HostedBackend {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, GenerationError> {
        let config = self.provider.config();

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt,
                    },
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                provider: self.provider.name(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let response = response.json::<serde_json::Value>().await?;
        extract_message_content(&response)
    }
}

fn extract_message_content(response: &serde_json::Value) -> Result<String, GenerationError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GenerationError::InvalidResponse(format!("{:?}", response)))
}
