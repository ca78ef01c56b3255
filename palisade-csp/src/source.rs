//! Source expression constants and pattern helpers.
//!
//! Source expressions are kept as plain strings; these predicates are the
//! only structure the engine ever needs to see in them.

use once_cell::sync::Lazy;
use regex::Regex;

pub const ANY: &str = "*";
pub const NONE: &str = "'none'";
pub const SELF: &str = "'self'";
pub const UNSAFE_INLINE: &str = "'unsafe-inline'";
pub const UNSAFE_EVAL: &str = "'unsafe-eval'";
pub const UNSAFE_HASHES: &str = "'unsafe-hashes'";
pub const STRICT_DYNAMIC: &str = "'strict-dynamic'";
pub const WASM_UNSAFE_EVAL: &str = "'wasm-unsafe-eval'";
pub const REPORT_SAMPLE: &str = "'report-sample'";
pub const INLINE_SPECULATION_RULES: &str = "'inline-speculation-rules'";
pub const UNSAFE_ALLOW_REDIRECTS: &str = "'unsafe-allow-redirects'";

/// Schemes that `*` already covers.
pub const NETWORK_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "ftp"];

static NONCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^'nonce-[A-Za-z0-9+/_-]+={0,2}'$").unwrap());

static HASH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^'(sha256|sha384|sha512)-[A-Za-z0-9+/_-]+={0,2}'$").unwrap());

static HASH_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^'(sha256|sha384|sha512)-").unwrap());

static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z]+):").unwrap());

/// Quoted keyword, nonce or hash (anything starting with a single quote).
pub fn is_quoted(source: &str) -> bool {
    source.starts_with('\'')
}

/// Any nonce source, well-formed or not.
pub fn is_nonce(source: &str) -> bool {
    source.starts_with("'nonce-")
}

/// A nonce source with a base64 (or base64url) value.
pub fn is_valid_nonce(source: &str) -> bool {
    NONCE_PATTERN.is_match(source)
}

/// Any hash source using one of the supported algorithms.
pub fn is_hash(source: &str) -> bool {
    HASH_PREFIX.is_match(source)
}

/// A hash source with a base64 value.
pub fn is_valid_hash(source: &str) -> bool {
    HASH_PATTERN.is_match(source)
}

/// The scheme of a token starting with `<lowercase letters>:`, if any.
pub fn scheme(source: &str) -> Option<&str> {
    SCHEME_PREFIX
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn is_network_scheme(scheme: &str) -> bool {
    NETWORK_SCHEMES.contains(&scheme)
}

/// A bare scheme source such as `https:`.
pub fn is_scheme(source: &str) -> bool {
    source.len() > 1 && source.ends_with(':') && scheme(source).is_some_and(|s| s.len() + 1 == source.len())
}

/// Whether `source` is a `<scheme>://host[/path]` expression without an
/// explicit port. Only the authority (up to the first `/`, `?` or `#`) is
/// checked for a port.
pub fn is_portless_url_with_scheme(source: &str, scheme: &str) -> bool {
    source
        .strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix("://"))
        .map(|rest| rest.split(['/', '?', '#']).next().unwrap_or_default())
        .is_some_and(|authority| !authority.is_empty() && !authority.contains(':'))
}
