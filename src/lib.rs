pub mod api;
pub mod authz;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod validation;
