//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the current cache generation.

pub mod get;

pub use get::{CacheGetParams, get_impl};
