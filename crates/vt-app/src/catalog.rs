use std::path::PathBuf;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;
use vt_core::ProductInput;

const PRODUCTS_QUERY: &str = r#"
query Products($first: Int!) {
  products(first: $first) {
    edges {
      node {
        id
        title
        description
        productType
        tags
        featuredImage { url }
      }
    }
  }
}
"#;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storefront returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("storefront query failed: {0}")]
    GraphQl(String),

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Malformed(String),
}

/// Where the products to generate come from
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_products(&self) -> Result<Vec<ProductInput>, CatalogError>;
}

#[derive(Debug, Clone)]
pub enum CatalogConfig {
    File(PathBuf),
    Storefront(StorefrontConfig),
}

impl CatalogConfig {
    pub fn into_source(self) -> Result<Box<dyn CatalogSource>, CatalogError> {
        Ok(match self {
            Self::File(path) => Box::new(FileCatalog::new(path)),
            Self::Storefront(conf) => Box::new(StorefrontClient::new(conf)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Bare `shop.myshopify.com`; a value with an explicit scheme is used as the base URL as-is
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    pub product_limit: u32,
}

impl StorefrontConfig {
    pub fn new(shop_domain: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            api_version: "2024-01".to_string(),
            product_limit: 10,
        }
    }

    pub fn endpoint(&self) -> String {
        let domain = self.shop_domain.trim_end_matches('/');
        let base = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        format!("{base}/api/{}/graphql.json", self.api_version)
    }
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct ProductsData {
    products: Connection,
}

#[derive(Deserialize)]
struct Connection {
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct Edge {
    node: ProductNode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    title: String,
    description: Option<String>,
    product_type: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    featured_image: Option<Image>,
}

#[derive(Deserialize)]
struct Image {
    url: String,
}

impl From<ProductNode> for ProductInput {
    fn from(node: ProductNode) -> Self {
        Self {
            id: node.id,
            title: node.title,
            description: node.description.filter(|d| !d.is_empty()),
            featured_image_url: node.featured_image.map(|i| i.url),
            product_type: node.product_type.filter(|t| !t.is_empty()),
            tags: node.tags,
        }
    }
}

pub struct StorefrontClient {
    client: reqwest::Client,
    config: StorefrontConfig,
}

impl StorefrontClient {
    pub fn new(config: StorefrontConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl CatalogSource for StorefrontClient {
    async fn fetch_products(&self) -> Result<Vec<ProductInput>, CatalogError> {
        let response = self.client
            .post(self.config.endpoint())
            .header("X-Shopify-Storefront-Access-Token", &self.config.access_token)
            .json(&json!({
                "query": PRODUCTS_QUERY,
                "variables": { "first": self.config.product_limit },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: GraphQlResponse<ProductsData> =
            serde_json::from_str(&text).map_err(|e| CatalogError::Malformed(e.to_string()))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(CatalogError::GraphQl(messages.join("; ")));
        }

        let data = parsed.data
            .ok_or_else(|| CatalogError::Malformed("response has neither data nor errors".to_string()))?;

        let products: Vec<ProductInput> = data.products.edges
            .into_iter()
            .map(|edge| edge.node.into())
            .collect();

        info!(count = products.len(), shop = %self.config.shop_domain, "Fetched storefront products");
        Ok(products)
    }
}

/// JSON array of products on disk
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn fetch_products(&self) -> Result<Vec<ProductInput>, CatalogError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;

        let products: Vec<ProductInput> = serde_json::from_str(&text)
            .map_err(|e| CatalogError::Malformed(format!("{}: {e}", self.path.display())))?;

        info!(count = products.len(), path = %self.path.display(), "Loaded catalog file");
        Ok(products)
    }
}

/// Catalog already in memory, mostly for wiring tests and demos
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog(pub Vec<ProductInput>);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_products(&self) -> Result<Vec<ProductInput>, CatalogError> {
        Ok(self.0.clone())
    }
}
