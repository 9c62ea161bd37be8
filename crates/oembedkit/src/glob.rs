//! Wildcard matching for URL patterns
//!
//! Patterns are matched against *cleaned* URLs (see [`clean_url`]), so a
//! pattern is written without a scheme: `youtube.com/*`, `example.com/**`.
//!
//! - `*` matches any run of characters except `/`
//! - `**` matches any run of characters, including `/`
//! - a trailing `/**` also matches the bare prefix (`example.com/**`
//!   matches `example.com`)
//!
//! Every other character matches itself. Matching is case-sensitive unless
//! [`matches_any_ignore_case`] is used.

const SCHEMES: &[&str] = &["https://", "http://"];
const WWW: &str = "www.";

/// Strip a leading `http://`/`https://` and an optional `www.` from a URL.
///
/// The `www.` prefix is only removed when it follows a scheme, so a bare
/// `www.example.com` stays as it is. Stripping repeats while a scheme is
/// present, which makes the function idempotent.
pub fn clean_url(url: &str) -> String {
    let mut rest = url;
    while let Some(stripped) = strip_scheme(rest) {
        rest = strip_prefix_ignore_case(stripped, WWW).unwrap_or(stripped);
    }
    rest.to_string()
}

fn strip_scheme(url: &str) -> Option<&str> {
    SCHEMES
        .iter()
        .find_map(|scheme| strip_prefix_ignore_case(url, scheme))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Test a candidate against a single pattern
pub fn glob_match(candidate: &str, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("/**") {
        if candidate == prefix {
            return true;
        }
    }
    match_bytes(pattern.as_bytes(), candidate.as_bytes())
}

/// Test a candidate against a list of patterns, true if any matches
pub fn matches_any<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| glob_match(candidate, p.as_ref()))
}

/// Case-insensitive [`matches_any`], used for content-type dispatch
pub fn matches_any_ignore_case<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    let candidate = candidate.to_ascii_lowercase();
    patterns
        .iter()
        .any(|p| glob_match(&candidate, &p.as_ref().to_ascii_lowercase()))
}

fn match_bytes(pattern: &[u8], candidate: &[u8]) -> bool {
    match pattern.split_first() {
        None => candidate.is_empty(),
        Some((b'*', rest)) => {
            let globstar = rest.first() == Some(&b'*');
            let rest = trim_stars(rest);
            for i in 0..=candidate.len() {
                if match_bytes(rest, &candidate[i..]) {
                    return true;
                }
                if i < candidate.len() && !globstar && candidate[i] == b'/' {
                    return false;
                }
            }
            false
        }
        Some((c, rest)) => match candidate.split_first() {
            Some((d, tail)) if c == d => match_bytes(rest, tail),
            _ => false,
        },
    }
}

fn trim_stars(pattern: &[u8]) -> &[u8] {
    let n = pattern.iter().take_while(|&&b| b == b'*').count();
    &pattern[n..]
}
