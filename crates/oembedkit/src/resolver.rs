//! Resolver: the public entry point
//!
//! Matches the input URL against the service registry, runs the matched
//! service's fetcher (or the default pipeline), times the call and wraps the
//! embed in a [`Resolution`].

use crate::config::format_duration;
use crate::error::{EmbedError, ResolveError};
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::glob::clean_url;
use crate::services::{RegistryBuilder, Service, ServiceRegistry};
use crate::types::{EmbedResult, FetchRequest, Resolution, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// RFC 1123 date format, always in GMT
const FETCH_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Per-request timeout; falls back to the service timeout, then 10s
    pub timeout: Option<Duration>,
    /// Hop limit (default 3)
    pub max_redirects: Option<u32>,
    /// Allow list of URL globs (empty: no restriction)
    pub allow_list: Vec<String>,
    /// Deny list of URL globs
    pub deny_list: Vec<String>,
    /// Extra outbound headers
    pub headers: BTreeMap<String, String>,
    /// Custom User-Agent
    pub user_agent: Option<String>,
}

/// Builder for configuring a [`Resolver`]
pub struct ResolverBuilder {
    options: ResolveOptions,
    registry: RegistryBuilder,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    /// Create a builder with the built-in services and the HTTP pipeline
    pub fn new() -> Self {
        Self {
            options: ResolveOptions::default(),
            registry: ServiceRegistry::builder(),
            fetcher: Some(Arc::new(HttpFetcher::new())),
        }
    }

    /// Replace all per-call options
    pub fn options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Set the hop limit
    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.options.max_redirects = Some(max_redirects);
        self
    }

    /// Add URL glob to allow list
    pub fn allow(mut self, pattern: impl Into<String>) -> Self {
        self.options.allow_list.push(pattern.into());
        self
    }

    /// Add URL glob to deny list
    pub fn deny(mut self, pattern: impl Into<String>) -> Self {
        self.options.deny_list.push(pattern.into());
        self
    }

    /// Add an outbound header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = Some(ua.into());
        self
    }

    /// Add a service, replacing any service with the same key in place
    pub fn service(mut self, key: impl Into<String>, service: Service) -> Self {
        self.registry = self.registry.service(key, service);
        self
    }

    /// Add a service that is considered before all others
    pub fn prepend_service(mut self, key: impl Into<String>, service: Service) -> Self {
        self.registry = self.registry.prepend(key, service);
        self
    }

    /// Start from an empty registry instead of the built-in providers
    pub fn without_default_services(mut self) -> Self {
        self.registry = self.registry.without_defaults();
        self
    }

    /// Replace the default fetcher used when a service has none
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Remove the default fetcher; only services with their own fetcher resolve
    pub fn without_fetcher(mut self) -> Self {
        self.fetcher = None;
        self
    }

    /// Validate the services and build the resolver
    pub fn build(self) -> Result<Resolver, EmbedError> {
        Ok(Resolver {
            registry: Arc::new(self.registry.build()?),
            fetcher: self.fetcher,
            options: self.options,
        })
    }
}

/// URL to embed resolver
///
/// Cheap to clone; the registry is shared and never mutated.
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<ServiceRegistry>,
    fetcher: Option<Arc<dyn Fetcher>>,
    options: ResolveOptions,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("services", &self.registry.len())
            .field("fetcher", &self.fetcher.as_ref().map(|fetcher| fetcher.name()))
            .field("options", &self.options)
            .finish()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            registry: Arc::new(ServiceRegistry::with_defaults()),
            fetcher: Some(Arc::new(HttpFetcher::new())),
            options: ResolveOptions::default(),
        }
    }
}

impl Resolver {
    /// Create a resolver with the built-in services and default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// The service registry in use
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// The per-call options in use
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve a URL into an embed envelope
    pub async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        let started = Instant::now();

        if url.trim().is_empty() {
            return Err(ResolveError::new(EmbedError::NoUrl, None, url));
        }

        let url_cleaned = clean_url(url);
        let matched = self.registry.find(url);
        let service_name = matched.map(|(key, _)| key.to_string());
        debug!(url = %url_cleaned, service = ?service_name, "Resolving");

        let embed = self
            .fetch(url, matched.map(|(_, service)| service))
            .await
            .map_err(|err| ResolveError::new(err, service_name.clone(), url))?;

        let fetch_date = Utc::now().format(FETCH_DATE_FORMAT).to_string();
        let elapsed = started.elapsed();

        Ok(Resolution {
            embed: embed.into_envelope(&fetch_date),
            service_name,
            url: url.to_string(),
            url_cleaned,
            fetch_date,
            time_taken: format_duration(elapsed),
            time_taken_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn fetch(&self, url: &str, service: Option<&Service>) -> Result<EmbedResult, EmbedError> {
        let fetcher = service
            .and_then(|service| service.fetcher.clone())
            .or_else(|| self.fetcher.clone())
            .ok_or(EmbedError::NoFetcher)?;

        let request = FetchRequest {
            url: url.to_string(),
            service: service.cloned(),
            timeout: self
                .options
                .timeout
                .or_else(|| service.and_then(|service| service.timeout))
                .unwrap_or(DEFAULT_TIMEOUT),
            max_redirects: self.options.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
            allow_list: self.options.allow_list.clone(),
            deny_list: self.options.deny_list.clone(),
            headers: self.options.headers.clone(),
            user_agent: self.options.user_agent.clone(),
        };

        debug!(fetcher = fetcher.name(), url = %url, "Using fetcher");
        fetcher.fetch(&request).await
    }
}

/// Resolve a URL with the built-in services and default options
pub async fn resolve(url: &str) -> Result<Resolution, ResolveError> {
    resolve_with_options(url, ResolveOptions::default()).await
}

/// Resolve a URL with the built-in services and custom options
///
/// For custom services, use [`Resolver::builder`].
pub async fn resolve_with_options(
    url: &str,
    options: ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let resolver = Resolver::builder()
        .options(options)
        .build()
        .map_err(|err| ResolveError::new(err, None, url))?;
    resolver.resolve(url).await
}
