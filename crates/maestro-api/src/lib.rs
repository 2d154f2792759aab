//! # maestro-api
//!
//! Request/response boundary with the school data API. The realtime client
//! only reads the stored bearer token from here; everything else is ordinary
//! HTTP plumbing.

mod client;
mod error;
mod token;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use token::TokenStore;
