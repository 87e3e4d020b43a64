use std::time::Duration;
use vt_core::ShopTheme;
use crate::config::{ConfigError, EnvVars};

/// Where the generation backend lives and how long a single request may take
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Sent along with every submission when set
    pub theme: Option<ShopTheme>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(10),
            max_tokens: 4096,
            temperature: 0.7,
            theme: None,
        }
    }

    pub fn from_env(vars: &EnvVars) -> Result<Self, ConfigError> {
        let base_url = vars.require("VITRINE_BACKEND_URL")?.to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "VITRINE_BACKEND_URL",
                value: base_url,
                reason: "must be an http(s) URL".to_string(),
            });
        }

        let mut conf = Self::new(base_url);
        conf.request_timeout = Duration::from_millis(vars.parse_or("VITRINE_REQUEST_TIMEOUT_MS", 10_000u64)?);
        conf.max_tokens = vars.parse_or("VITRINE_MAX_TOKENS", conf.max_tokens)?;
        conf.temperature = vars.parse_or("VITRINE_TEMPERATURE", conf.temperature)?;
        conf.theme = vars.get("VITRINE_SHOP_STYLE").map(|style| ShopTheme {
            style: style.to_string(),
            ..ShopTheme::default()
        });
        Ok(conf)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
