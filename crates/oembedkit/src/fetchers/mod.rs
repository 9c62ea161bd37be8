//! Fetcher system for resolving embeds
//!
//! Design: a fetcher turns a [`FetchRequest`] into an [`EmbedResult`].
//! [`HttpFetcher`] is the built-in pipeline; services may carry their own
//! fetcher to replace it for the URLs they match.

mod http;

pub use http::HttpFetcher;

use crate::error::EmbedError;
use crate::types::{EmbedResult, FetchRequest};
use async_trait::async_trait;

/// Trait for embed fetchers
///
/// Implement this trait to resolve URLs without the HTTP pipeline, for
/// example from a local cache or a provider SDK. Attach the fetcher to a
/// [`Service`](crate::Service) or install it as the resolver default.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Resolve the request into an embed
    ///
    /// `request.service` holds the matched service, if any.
    async fn fetch(&self, request: &FetchRequest) -> Result<EmbedResult, EmbedError>;
}
