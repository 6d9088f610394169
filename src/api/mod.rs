//! HTTP plumbing for the API gateway: bearer-token injection, one
//! refresh-and-retry on 401, structured error mapping, and the typed product
//! endpoints on top.

mod client;
mod products;

pub use client::ApiClient;
pub use products::ProductApi;
