//! oembedkit - resolve URLs into oEmbed records
//!
//! Given a web URL, this crate produces a normalized embed record by asking
//! the matching oEmbed provider, following a page's oEmbed discovery link, or
//! scraping the page's Open Graph and Twitter card metadata.
//!
//! ```no_run
//! # async fn run() -> Result<(), oembedkit::ResolveError> {
//! let resolution = oembedkit::resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//! println!("{:?}", resolution.embed.title());
//! # Ok(())
//! # }
//! ```
//!
//! ## Services
//!
//! A [`Service`] maps URL globs to a provider endpoint. The
//! [`ServiceRegistry`] is ordered and the first service whose globs match the
//! cleaned URL wins. Services may bring their own [`Fetcher`]; everything else
//! goes through the [`HttpFetcher`] pipeline.
//!
//! ## Policy
//!
//! Allow and deny lists of URL globs are checked on the initial URL and on
//! every redirect or discovery target before it is requested.

pub mod config;
mod error;
pub mod fetchers;
pub mod glob;
pub mod metadata;
pub mod parsers;
mod policy;
pub mod providers;
mod resolver;
mod services;
mod types;

pub use config::{ConfigError, ResolverConfig, ServiceConfig};
pub use error::{EmbedError, ErrorBody, InvalidServiceKind, ParseError, ResolveError};
pub use fetchers::{Fetcher, HttpFetcher};
pub use glob::clean_url;
pub use policy::UrlPolicy;
pub use resolver::{resolve, resolve_with_options, ResolveOptions, Resolver, ResolverBuilder};
pub use services::{RegistryBuilder, Service, ServiceRegistry, ServiceUrl, UrlResolver, URL_PLACEHOLDER};
pub use types::{
    EmbedResult, FetchRequest, Resolution, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT, ENVELOPE_KEYS,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = concat!("oembedkit/", env!("CARGO_PKG_VERSION"));
