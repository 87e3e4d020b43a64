use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use glam::Vec3;
use thiserror::Error;
use tracing::debug;
use crate::catalog::{CatalogConfig, StorefrontConfig};
use crate::generator::{BackendConfig, BatchConfig, PollConfig};
use crate::viewer::ViewerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not load .env file: {0}")]
    Dotenv(String),
}

/// Snapshot of the environment the config is read from
#[derive(Debug, Clone, Default)]
pub struct EnvVars(HashMap<String, String>);

impl EnvVars {
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    /// Blank values count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    pub fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn millis_or(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse_or(key, default.as_millis() as u64).map(Duration::from_millis)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub batch: BatchConfig,
    pub viewer: ViewerConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Reads `.env` if there is one, then the process environment
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::Dotenv(e.to_string())),
        }

        Self::from_env(&EnvVars::from_process())
    }

    pub fn from_env(vars: &EnvVars) -> Result<Self, ConfigError> {
        let poll_defaults = PollConfig::default();
        let poll = PollConfig {
            interval: vars.millis_or("VITRINE_POLL_INTERVAL_MS", poll_defaults.interval)?,
            deadline: vars.millis_or("VITRINE_POLL_DEADLINE_MS", poll_defaults.deadline)?,
            transient_retries: vars.parse_or("VITRINE_TRANSIENT_RETRIES", poll_defaults.transient_retries)?,
        };
        if poll.interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "VITRINE_POLL_INTERVAL_MS",
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }

        let max_concurrency: usize = vars.parse_or("VITRINE_MAX_CONCURRENCY", 1)?;
        if max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "VITRINE_MAX_CONCURRENCY",
                value: "0".to_string(),
                reason: "at least one unit must be allowed to run".to_string(),
            });
        }

        let batch = BatchConfig {
            poll,
            job_retries: vars.parse_or("VITRINE_JOB_RETRIES", 0)?,
            max_concurrency,
        };

        let viewer = match vars.get("VITRINE_ANCHOR") {
            None => ViewerConfig::default(),
            Some(raw) => ViewerConfig {
                anchor: parse_vec3(raw).map_err(|reason| ConfigError::Invalid {
                    key: "VITRINE_ANCHOR",
                    value: raw.to_string(),
                    reason,
                })?,
            },
        };

        Ok(Self {
            backend: BackendConfig::from_env(vars)?,
            batch,
            viewer,
            catalog: catalog_from_env(vars)?,
        })
    }
}

fn catalog_from_env(vars: &EnvVars) -> Result<CatalogConfig, ConfigError> {
    if let Some(path) = vars.get("VITRINE_CATALOG_FILE") {
        return Ok(CatalogConfig::File(PathBuf::from(path)));
    }

    let shop_domain = vars.require("SHOPIFY_SHOP_DOMAIN")?;
    let access_token = vars.require("SHOPIFY_STOREFRONT_TOKEN")?;
    let mut storefront = StorefrontConfig::new(shop_domain, access_token);
    if let Some(version) = vars.get("SHOPIFY_API_VERSION") {
        storefront.api_version = version.to_string();
    }
    storefront.product_limit = vars.parse_or("SHOPIFY_PRODUCT_LIMIT", storefront.product_limit)?;

    Ok(CatalogConfig::Storefront(storefront))
}

/// `"x,y,z"`
fn parse_vec3(raw: &str) -> Result<Vec3, String> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => Ok(Vec3::new(*x, *y, *z)),
        [_, _, _] => Err("components must be finite".to_string()),
        _ => Err(format!("expected 3 components, got {}", parts.len())),
    }
}
