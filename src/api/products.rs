use crate::error::ClientResult;
use crate::model::{NewProduct, Product, ProductFilters};

use super::client::ApiClient;

// The gateway routes products through /product/api/** (product singular).
const PRODUCT_BASE: &str = "/product/api/products";

/// Typed wrapper over the product endpoints.
#[derive(Clone)]
pub struct ProductApi {
    client: ApiClient,
}

impl ProductApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Page of products matching the filters. The server pages at a fixed
    /// size; a full page means more may follow.
    pub async fn list(&self, filters: &ProductFilters) -> ClientResult<Vec<Product>> {
        let mut query: Vec<(&str, String)> = vec![("pageNo", filters.page_no.to_string())];
        if let Some(cat) = filters.category {
            query.push(("category", cat.to_string()));
        }
        if let Some(name) = filters.name.as_deref().filter(|n| !n.is_empty()) {
            query.push(("name", name.to_string()));
        }
        self.client.get_json(PRODUCT_BASE, &query).await
    }

    pub async fn get(&self, product_id: i64) -> ClientResult<Product> {
        self.client.get_json(&format!("{}/{}", PRODUCT_BASE, product_id), &[]).await
    }

    /// Create a global product (ADMIN only; the backend enforces).
    pub async fn add_global(&self, product: &NewProduct) -> ClientResult<Product> {
        self.client.post_json(PRODUCT_BASE, product).await
    }

    /// Create a custom product owned by the current user.
    pub async fn add_custom(&self, product: &NewProduct) -> ClientResult<Product> {
        self.client.post_json(&format!("{}/custom", PRODUCT_BASE), product).await
    }

    pub async fn update(&self, product_id: i64, product: &NewProduct) -> ClientResult<Product> {
        self.client.put_json(&format!("{}/{}", PRODUCT_BASE, product_id), product).await
    }

    pub async fn delete(&self, product_id: i64) -> ClientResult<()> {
        self.client.delete(&format!("{}/{}", PRODUCT_BASE, product_id)).await
    }
}
