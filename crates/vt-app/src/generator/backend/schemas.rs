use serde::{Deserialize, Serialize};
use vt_core::{PayloadMetadata, ProductInput, ShopTheme, Usage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub product_type: String,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
}

impl From<&ProductInput> for ProductData {
    fn from(product: &ProductInput) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            description: product.description_or_default().to_string(),
            product_type: product.product_type.clone().unwrap_or_default(),
            tags: product.tags.clone(),
            featured_image: product.featured_image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCreateRequest {
    pub product_data: ProductData,
    pub shop_theme: Option<ShopTheme>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCreateResponse {
    #[serde(default, alias = "task_id", alias = "jobId")]
    pub job_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobResultBody {
    pub metadata: Option<String>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub status: String,
    pub payload: Option<String>,
    pub result: Option<JobResultBody>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl JobStatusResponse {
    /// Top-level `payload` wins over the nested `result.metadata`
    pub fn source(&self) -> Option<&str> {
        self.payload.as_deref()
            .or_else(|| self.result.as_ref().and_then(|r| r.metadata.as_deref()))
    }

    pub fn metadata(&self) -> Option<PayloadMetadata> {
        let result = self.result.as_ref()?;
        if result.model.is_none() && result.usage.is_none() {
            return None;
        }
        Some(PayloadMetadata {
            model: result.model.clone(),
            usage: result.usage.clone(),
        })
    }

    pub fn failure_reason(&self) -> String {
        self.error.clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("unexpected status {}", self.status))
    }
}
