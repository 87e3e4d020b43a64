use thiserror::Error;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::generator::backend::JobClientError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Error from backend: {0}")]
    Backend(#[from] JobClientError),
}
