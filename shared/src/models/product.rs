//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Size variant (规格) of a product, e.g. "Large"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeVariant {
    pub name: String,
    pub price: Decimal,
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Base price, used when no size is chosen
    pub price: Decimal,
    pub category_id: i64,
    #[serde(default)]
    pub sizes: Vec<SizeVariant>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Product {
    pub fn size(&self, name: &str) -> Option<&SizeVariant> {
        self.sizes.iter().find(|s| s.name == name)
    }

    /// Unit price for the given size, `None` if the size does not exist
    pub fn price_for(&self, size: Option<&str>) -> Option<Decimal> {
        match size {
            None => Some(self.price),
            Some(name) => self.size(name).map(|s| s.price),
        }
    }
}
