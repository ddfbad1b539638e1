//! Network capability consumed by the gateway.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Error, GatewayRequest, StoredResponse};

/// A single network attempt.
///
/// `Err` means the attempt was rejected outright (no response). Any HTTP
/// status, including 4xx/5xx, is an `Ok` response.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, request: &GatewayRequest) -> Result<StoredResponse, Error>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, request: &GatewayRequest) -> Result<StoredResponse, Error> {
        (**self).fetch(request).await
    }
}
