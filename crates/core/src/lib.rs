//! Core types and shared functionality for the offline gateway.
//!
//! This crate provides:
//! - The request classifier and caching-policy engine (`gateway`)
//! - Cache generation storage with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod request;

pub use cache::{CacheHandle, CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use config::AppConfig;
pub use error::Error;
pub use gateway::{CacheGateway, Dispatch, Fetcher, GatewayResponse, RequestClass, ResponseSource};
pub use request::{GatewayRequest, StoredResponse};
