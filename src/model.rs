//! Wire types for the product endpoints. Field names follow the gateway's
//! camelCase JSON convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductCategory {
    Meat,
    Vegetable,
    Fruit,
    Dairy,
    Cereal,
    Fish,
    Nuts,
    Sweet,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 9] = [
        ProductCategory::Meat,
        ProductCategory::Vegetable,
        ProductCategory::Fruit,
        ProductCategory::Dairy,
        ProductCategory::Cereal,
        ProductCategory::Fish,
        ProductCategory::Nuts,
        ProductCategory::Sweet,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Meat => "MEAT",
            ProductCategory::Vegetable => "VEGETABLE",
            ProductCategory::Fruit => "FRUIT",
            ProductCategory::Dairy => "DAIRY",
            ProductCategory::Cereal => "CEREAL",
            ProductCategory::Fish => "FISH",
            ProductCategory::Nuts => "NUTS",
            ProductCategory::Sweet => "SWEET",
            ProductCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .find(|c| c.as_str() == up)
            .copied()
            .ok_or_else(|| format!("unknown product category: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Absent on records that were never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub name: String,
    pub product_category: ProductCategory,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    /// None for global products; set to the owner for custom ones.
    #[serde(default)]
    pub owner_username: Option<String>,
}

/// Create/update payload; the backend assigns the id and the owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub product_category: ProductCategory,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    /// Zero-based page number.
    pub page_no: u32,
    pub category: Option<ProductCategory>,
    pub name: Option<String>,
}
