//! Allow/deny policy for outbound URLs
//!
//! Both lists hold glob patterns (see [`crate::glob`]) and are evaluated
//! against the cleaned URL, so `example.com/**` covers `http://example.com/x`
//! and `https://www.example.com/x` alike. The policy is applied to the input
//! URL and again to every redirect and discovery target.
//!
//! A site root is matched with and without its trailing `/`, so the pattern
//! `example.com` covers both `https://example.com` and `https://example.com/`.

use crate::error::EmbedError;
use crate::glob::{clean_url, matches_any};
use tracing::warn;

/// Allow and deny lists applied to every fetched URL
#[derive(Debug, Clone, Copy)]
pub struct UrlPolicy<'a> {
    allow: &'a [String],
    deny: &'a [String],
}

impl<'a> UrlPolicy<'a> {
    /// Create a policy. An empty allow list places no restriction.
    pub fn new(allow: &'a [String], deny: &'a [String]) -> Self {
        Self { allow, deny }
    }

    /// Check a raw URL, failing with [`EmbedError::UrlBlocked`]
    pub fn check(&self, url: &str) -> Result<(), EmbedError> {
        let cleaned = clean_url(url);
        let matches = |patterns: &[String]| {
            matches_any(&cleaned, patterns)
                || site_root(&cleaned).is_some_and(|root| matches_any(root, patterns))
        };
        if matches(self.deny) {
            warn!(url = %cleaned, "URL matched deny list");
            return Err(EmbedError::UrlBlocked(cleaned));
        }
        if !self.allow.is_empty() && !matches(self.allow) {
            warn!(url = %cleaned, "URL not in allow list");
            return Err(EmbedError::UrlBlocked(cleaned));
        }
        Ok(())
    }
}

/// `host/` as `host`; `None` for anything with a real path or query
fn site_root(cleaned: &str) -> Option<&str> {
    cleaned
        .strip_suffix('/')
        .filter(|host| !host.is_empty() && !host.contains(['/', '?', '#']))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_policy_allows_everything() {
        let policy = UrlPolicy::new(&[], &[]);
        assert!(policy.check("https://anything.example/path").is_ok());
    }

    #[test]
    fn test_deny_list_matches_all_url_forms() {
        let deny = list(&["example.com/**"]);
        let policy = UrlPolicy::new(&[], &deny);
        for url in [
            "http://example.com/x",
            "https://www.example.com/x",
            "https://example.com",
        ] {
            match policy.check(url) {
                Err(EmbedError::UrlBlocked(cleaned)) => assert!(cleaned.starts_with("example.com")),
                other => panic!("expected block for {url}, got {other:?}"),
            }
        }
        assert!(policy.check("https://example.org/x").is_ok());
    }

    #[test]
    fn test_allow_list_rejects_others() {
        let allow = list(&["theverge.com/**"]);
        let policy = UrlPolicy::new(&allow, &[]);
        assert!(policy.check("https://www.theverge.com/2020/1/1").is_ok());
        let err = policy
            .check("https://daringfireball.net/2020/01/the_ipad_awkwardly_turns_10")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "URL \"daringfireball.net/2020/01/the_ipad_awkwardly_turns_10\" is blocked"
        );
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let allow = list(&["example.com/**"]);
        let deny = list(&["example.com/private/**"]);
        let policy = UrlPolicy::new(&allow, &deny);
        assert!(policy.check("https://example.com/public").is_ok());
        assert!(policy.check("https://example.com/private/a").is_err());
    }

    #[test]
    fn test_site_root_matches_bare_host_pattern() {
        let deny = list(&["127.0.0.1:8080"]);
        let policy = UrlPolicy::new(&[], &deny);
        assert!(policy.check("http://127.0.0.1:8080").is_err());
        assert!(policy.check("http://127.0.0.1:8080/").is_err());
        assert!(policy.check("http://127.0.0.1:8080/x").is_ok());

        let allow = list(&["example.com"]);
        let policy = UrlPolicy::new(&allow, &[]);
        assert!(policy.check("https://example.com/").is_ok());
        assert!(policy.check("https://example.com/?q=1").is_err());
    }

    #[test]
    fn test_site_root() {
        assert_eq!(site_root("example.com/"), Some("example.com"));
        assert_eq!(site_root("example.com"), None);
        assert_eq!(site_root("example.com/a/"), None);
        assert_eq!(site_root("/"), None);
    }
}
