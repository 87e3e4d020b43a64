use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// One catalog item, as handed over by the storefront fetch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductInput {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl", alias = "featured_image")]
    pub featured_image_url: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductInput {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            featured_image_url: None,
            product_type: None,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.featured_image_url = Some(url.into());
        self
    }

    /// Description or empty string, for places that need a plain value
    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Storefront look forwarded to the generator with every product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShopTheme {
    pub style: String,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

impl Default for ShopTheme {
    fn default() -> Self {
        Self {
            style: "modern".to_string(),
            colors: BTreeMap::new(),
        }
    }
}
