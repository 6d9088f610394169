//! Client-side product form validation over raw string input, mirroring the
//! constraints the backend enforces so the user gets feedback before a round
//! trip.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::model::{NewProduct, ProductCategory};

pub const MAX_NAME_LEN: usize = 64;

/// Raw form input as typed; numeric fields stay strings until validated.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub category: String,
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fat: String,
}

/// Field name -> message for every invalid field; empty map means clean.
pub fn validate_product_form(form: &ProductForm) -> BTreeMap<&'static str, String> {
    let mut errors = BTreeMap::new();

    if form.name.trim().is_empty() {
        errors.insert("name", "Product name cannot be empty".to_string());
    } else if form.name.chars().count() > MAX_NAME_LEN {
        errors.insert("name", format!("Product name cannot exceed {} characters", MAX_NAME_LEN));
    }

    if form.category.trim().is_empty() {
        errors.insert("category", "Product category is required".to_string());
    } else if ProductCategory::from_str(&form.category).is_err() {
        errors.insert("category", format!("Unknown product category: {}", form.category.trim()));
    }

    for (field, value) in [
        ("calories", &form.calories),
        ("protein", &form.protein),
        ("carbs", &form.carbs),
        ("fat", &form.fat),
    ] {
        if let Some(msg) = validate_numeric_field(field, value) {
            errors.insert(field, msg);
        }
    }

    errors
}

fn validate_numeric_field(field: &str, value: &str) -> Option<String> {
    let label = capitalize(field);
    if value.trim().is_empty() {
        return Some(format!("{} is required", label));
    }
    match value.trim().parse::<f64>() {
        Err(_) => Some(format!("{} must be a number", label)),
        Ok(n) if n < 0.0 => Some(format!("{} cannot be less than 0", label)),
        Ok(n) if !n.is_finite() => Some(format!("{} must be a number", label)),
        Ok(_) => None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert a clean form into the create/update payload. Errs with the field
/// map when anything is invalid.
pub fn into_new_product(form: &ProductForm) -> Result<NewProduct, BTreeMap<&'static str, String>> {
    let errors = validate_product_form(form);
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewProduct {
        name: form.name.trim().to_string(),
        product_category: form.category.parse().expect("validated above"),
        calories: form.calories.trim().parse().expect("validated above"),
        protein: form.protein.trim().parse().expect("validated above"),
        carbs: form.carbs.trim().parse().expect("validated above"),
        fat: form.fat.trim().parse().expect("validated above"),
    })
}
