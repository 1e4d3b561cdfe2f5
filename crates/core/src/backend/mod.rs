//! Text-generation backends.
//!
//! Everything that talks to a language model goes through [`GenerationBackend`]:
//! one prompt plus a system instruction in, generated text or a
//! [`GenerationError`] out. [`Backend`] picks the local or hosted
//! implementation from a [`Provider`].

mod hosted;
mod ollama;

use std::time::Duration;

pub use hosted::HostedBackend;
pub use ollama::OllamaBackend;

use crate::provider::{Provider, ProviderError};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub trait GenerationBackend {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, GenerationError>;
}

impl<B: GenerationBackend> GenerationBackend for &B {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt, system_prompt).await
    }
}

pub enum Backend {
    Local(OllamaBackend),
    Hosted(HostedBackend),
}

impl Backend {
    /// Build the backend for `provider`. `model` overrides the provider's
    /// default model and `request_timeout` bounds each HTTP request.
    pub fn from_provider(
        provider: Provider,
        model: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let model = model.unwrap_or_else(|| provider.config().model.to_string());

        match provider.validate_api_key()? {
            None => Ok(Backend::Local(OllamaBackend::new(
                Provider::ollama_host(),
                model,
                request_timeout,
            )?)),
            Some(api_key) => Ok(Backend::Hosted(HostedBackend::new(
                provider,
                api_key,
                model,
                request_timeout,
            )?)),
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Backend::Local(_) => Provider::Ollama,
            Backend::Hosted(b) => b.provider(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Backend::Local(b) => b.model(),
            Backend::Hosted(b) => b.model(),
        }
    }
}

impl GenerationBackend for Backend {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, GenerationError> {
        match self {
            Backend::Local(b) => b.generate(prompt, system_prompt).await,
            Backend::Hosted(b) => b.generate(prompt, system_prompt).await,
        }
    }
}

fn http_client(request_timeout: Duration) -> Result<reqwest::Client, GenerationError> {
    Ok(reqwest::Client::builder().timeout(request_timeout).build()?)
}
