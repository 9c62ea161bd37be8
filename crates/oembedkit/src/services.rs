//! Provider services and the registry that dispatches URLs to them
//!
//! Design: a service pairs URL patterns with a way to reach the provider's
//! oEmbed endpoint. The registry is an ordered map; lookup returns the first
//! service (in insertion order) whose patterns match the cleaned URL.

use crate::error::{EmbedError, InvalidServiceKind};
use crate::fetchers::Fetcher;
use crate::glob::{clean_url, matches_any};
use crate::providers::default_services;
use crate::types::FetchRequest;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::form_urlencoded;

/// Placeholder substituted with the target URL in endpoint templates
pub const URL_PLACEHOLDER: &str = "{{url}}";

/// Computes a provider endpoint from the full request
pub type UrlResolver = Arc<dyn Fn(&FetchRequest) -> String + Send + Sync>;

/// How a service reaches its provider endpoint
#[derive(Clone)]
pub enum ServiceUrl {
    /// Endpoint template containing [`URL_PLACEHOLDER`]
    Template(String),
    /// Endpoint computed from the request
    Resolver(UrlResolver),
}

impl fmt::Debug for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceUrl::Template(t) => f.debug_tuple("Template").field(t).finish(),
            ServiceUrl::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// A registered provider
#[derive(Clone)]
pub struct Service {
    /// Display name
    pub name: String,
    /// Glob patterns tested against the cleaned URL
    pub matches: Vec<String>,
    /// Endpoint strategy (required unless `fetcher` is set)
    pub url: Option<ServiceUrl>,
    /// Replaces the default fetch pipeline for this service
    pub fetcher: Option<Arc<dyn Fetcher>>,
    /// Per-service timeout, used when the caller gives none
    pub timeout: Option<Duration>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("matches", &self.matches)
            .field("url", &self.url)
            .field("fetcher", &self.fetcher.as_ref().map(|fetcher| fetcher.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Service {
    /// Create a service with a name and match patterns
    pub fn new<I, S>(name: impl Into<String>, matches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            matches: matches.into_iter().map(Into::into).collect(),
            url: None,
            fetcher: None,
            timeout: None,
        }
    }

    /// Use an endpoint template containing `{{url}}`
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.url = Some(ServiceUrl::Template(template.into()));
        self
    }

    /// Compute the endpoint from the request
    pub fn url_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&FetchRequest) -> String + Send + Sync + 'static,
    {
        self.url = Some(ServiceUrl::Resolver(Arc::new(resolver)));
        self
    }

    /// Fetch with a custom fetcher instead of the default pipeline
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the per-service timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check the definition, naming `key` in the error
    pub fn validate(&self, key: &str) -> Result<(), EmbedError> {
        let fail = |kind| {
            Err(EmbedError::InvalidService {
                key: key.to_string(),
                kind,
            })
        };

        if self.name.trim().is_empty() {
            return fail(InvalidServiceKind::MissingName);
        }
        if self.matches.is_empty() || self.matches.iter().any(|m| m.is_empty()) {
            return fail(InvalidServiceKind::MissingMatches);
        }
        match &self.url {
            None if self.fetcher.is_none() => fail(InvalidServiceKind::MissingUrl),
            Some(ServiceUrl::Template(t)) if t.trim().is_empty() => {
                fail(InvalidServiceKind::MissingUrl)
            }
            Some(ServiceUrl::Template(t)) if !t.contains(URL_PLACEHOLDER) => {
                fail(InvalidServiceKind::InvalidUrl)
            }
            _ => Ok(()),
        }
    }

    /// True if the cleaned URL matches one of this service's patterns
    pub fn is_match(&self, cleaned: &str) -> bool {
        matches_any(cleaned, &self.matches)
    }

    /// Provider endpoint for a request, `None` when the service has no URL
    pub fn endpoint(&self, request: &FetchRequest) -> Option<String> {
        match self.url.as_ref()? {
            ServiceUrl::Template(template) => {
                let encoded: String = form_urlencoded::byte_serialize(request.url.as_bytes()).collect();
                Some(template.replace(URL_PLACEHOLDER, &encoded))
            }
            ServiceUrl::Resolver(resolve) => Some(resolve(request)),
        }
    }
}

/// Ordered, validated set of services
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: IndexMap<String, Service>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in provider table
    pub fn with_defaults() -> Self {
        Self {
            services: default_services().into_iter().collect(),
        }
    }

    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Find the first service matching a raw URL
    ///
    /// The URL is cleaned before matching. Returns the service key and the
    /// service.
    pub fn find(&self, url: &str) -> Option<(&str, &Service)> {
        let cleaned = clean_url(url);
        self.services
            .iter()
            .find(|(_, service)| service.is_match(&cleaned))
            .map(|(key, service)| (key.as_str(), service))
    }

    /// Look up a service by key
    pub fn get(&self, key: &str) -> Option<&Service> {
        self.services.get(key)
    }

    /// Service keys in lookup order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Services in lookup order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Service)> {
        self.services.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True when no service is registered
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Builder for [`ServiceRegistry`]
///
/// Entries are validated together in [`build`](Self::build); a single bad
/// entry rejects the whole registry.
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    defaults: bool,
    prepended: Vec<(String, Service)>,
    services: Vec<(String, Service)>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            defaults: true,
            prepended: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl RegistryBuilder {
    /// Leave the built-in provider table out
    pub fn without_defaults(mut self) -> Self {
        self.defaults = false;
        self
    }

    /// Add a service, or replace the service with the same key in place
    pub fn service(mut self, key: impl Into<String>, service: Service) -> Self {
        self.services.push((key.into(), service));
        self
    }

    /// Add a service ahead of every other entry, replacing any same key
    pub fn prepend(mut self, key: impl Into<String>, service: Service) -> Self {
        self.prepended.push((key.into(), service));
        self
    }

    /// Validate and assemble the registry
    pub fn build(self) -> Result<ServiceRegistry, EmbedError> {
        let mut services: IndexMap<String, Service> = IndexMap::new();
        if self.defaults {
            services.extend(default_services());
        }

        for (key, service) in self.services {
            service.validate(&key)?;
            services.insert(key, service);
        }

        for (index, (key, service)) in self.prepended.into_iter().enumerate() {
            service.validate(&key)?;
            services.shift_remove(&key);
            services.shift_insert(index, key, service);
        }

        Ok(ServiceRegistry { services })
    }
}
