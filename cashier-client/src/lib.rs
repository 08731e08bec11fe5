//! Cashier Client - HTTP implementation of the remote order API
//!
//! [`HttpClient`] implements [`cashier_engine::OrderApi`] over JSON/HTTP,
//! unwrapping the [`shared::ApiResponse`] envelope of every endpoint.

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;

pub use shared::ApiResponse;
