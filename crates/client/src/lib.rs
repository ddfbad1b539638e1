//! Network client code for the offline gateway.
//!
//! This crate provides the HTTP implementation of the gateway's `Fetcher`
//! capability, shared by the MCP server and the CLI.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher};
