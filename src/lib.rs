//! Typed async client for the travel-order resolver API

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod service;
pub mod types;

pub use cancel::CancelHandle;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use service::TravelOrderService;
pub use types::*;
