use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApplicationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItemId(pub String);

impl CartItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One grocery-list entry as typed by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    #[serde(alias = "name")]
    pub raw_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

impl CartItem {
    pub fn new(id: impl Into<String>, raw_name: impl Into<String>) -> Self {
        Self {
            id: CartItemId(id.into()),
            raw_name: raw_name.into(),
            brand: None,
            category: None,
            size: None,
            quantity: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn has_blank_name(&self) -> bool {
        self.raw_name.trim().is_empty()
    }
}

/// Parses a JSON cart payload. Anything other than an array of items is rejected as a whole;
/// per-item problems (blank names and the like) are left for the resolver to flag.
pub fn parse_cart_items(raw: &str) -> Result<Vec<CartItem>, ApplicationError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|error| ApplicationError::MalformedInput(format!("invalid JSON: {error}")))?;

    let Value::Array(entries) = value else {
        return Err(ApplicationError::MalformedInput(
            "cart items payload must be a JSON array".to_owned(),
        ));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value::<CartItem>(entry).map_err(|error| {
                ApplicationError::MalformedInput(format!("cart item at index {index}: {error}"))
            })
        })
        .collect()
}
