#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: set {env_var}")]
    MissingApiKey {
        provider_name: String,
        env_var: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Ollama,
    Openai,
    Grok,
    Gemini,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    /// `None` for providers that run locally without credentials.
    pub env_var: Option<&'static str>,
}

pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Ollama => ProviderConfig {
                api_url: DEFAULT_OLLAMA_HOST,
                model: "llama3",
                env_var: None,
            },
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o",
                env_var: Some("OPENAI_API_KEY"),
            },
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: Some("XAI_API_KEY"),
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-2.5-flash",
                env_var: Some("GEMINI_API_KEY"),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama => "Ollama",
            Provider::Openai => "OpenAI",
            Provider::Grok => "Grok",
            Provider::Gemini => "Gemini",
        }
    }

    /// Short lowercase id used in cache file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::Openai => "openai",
            Provider::Grok => "grok",
            Provider::Gemini => "gemini",
        }
    }

    pub fn is_local(&self) -> bool {
        self.config().env_var.is_none()
    }

    /// Validate that the API key is set for this provider. Local providers
    /// need none and yield `Ok(None)`.
    pub fn validate_api_key(&self) -> Result<Option<String>, ProviderError> {
        let Some(env_var) = self.config().env_var else {
            return Ok(None);
        };
        std::env::var(env_var)
            .map(Some)
            .map_err(|_| ProviderError::MissingApiKey {
                provider_name: self.name().to_string(),
                env_var: env_var.to_string(),
            })
    }

    /// Ollama base URL, honouring `OLLAMA_HOST`.
    pub fn ollama_host() -> String {
        std::env::var(OLLAMA_HOST_ENV)
            .ok()
            .filter(|h| !h.trim().is_empty())
            .map(|h| normalize_ollama_host(&h))
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
    }
}

/// Turn an `OLLAMA_HOST` value into a base URL.
///
/// Ollama accepts bare `host`, `host:port` and `:port`. Without a scheme the
/// value gets `http://` and, when it has no port, the default Ollama port.
/// Values that already carry a scheme are used as they are.
pub fn normalize_ollama_host(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.contains("://") {
        return raw.to_string();
    }

    let (authority, path) = match raw.find('/') {
        Some(i) => raw.split_at(i),
        None => (raw, ""),
    };
    // IPv6 literals keep their colons inside brackets
    let has_port = match authority.rfind(']') {
        Some(i) => authority[i..].contains(':'),
        None => authority.contains(':'),
    };

    let mut url = String::from("http://");
    if authority.is_empty() || authority.starts_with(':') {
        url.push_str("127.0.0.1");
    }
    url.push_str(authority);
    if !has_port {
        url.push_str(&format!(":{}", DEFAULT_OLLAMA_PORT));
    }
    url.push_str(path);
    url
}
