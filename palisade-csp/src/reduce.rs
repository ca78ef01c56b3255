//! Source-list minimization applied during serialization.

use crate::source::{self, ANY, NONE, REPORT_SAMPLE, UNSAFE_HASHES};
use palisade_log::warn;

/// Remove duplicates, keeping the first occurrence of each token.
pub fn dedup(sources: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(sources.len());
    for s in sources {
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    out
}

/// Minimize a `source-list` / `ancestor-source-list` value.
///
/// - `'none'` absorbs everything except `'report-sample'`.
/// - `*` absorbs network-scheme hosts and URLs; quoted tokens and other
///   schemes (`data:`, `blob:`, ...) are kept.
/// - A bare scheme absorbs port-less URLs using it. `http:` implies `https:`
///   and `ws:` implies `wss:`.
pub fn reduce_source_list(sources: &[String]) -> Vec<String> {
    let mut sources = dedup(sources);

    // TODO: drop the 'none' override once callers stop relying on it; browsers
    // ignore 'none' when other sources are present.
    if sources.iter().any(|s| s == NONE) {
        let keep_sample = sources.iter().any(|s| s == REPORT_SAMPLE);
        let discarded: Vec<&str> = sources
            .iter()
            .map(String::as_str)
            .filter(|s| *s != NONE && *s != REPORT_SAMPLE)
            .collect();
        if !discarded.is_empty() {
            warn!(
                target: "palisade::csp",
                "'none' in a source list overriding other sources is deprecated; discarded: {}",
                discarded.join(" ")
            );
        }

        let mut reduced = vec![NONE.to_string()];
        if keep_sample {
            reduced.push(REPORT_SAMPLE.to_string());
        }
        return reduced;
    }

    if sources.iter().any(|s| s == ANY) {
        sources.retain(|s| {
            source::is_quoted(s)
                || source::scheme(s).is_some_and(|scheme| !source::is_network_scheme(scheme))
        });
        sources.insert(0, ANY.to_string());
    }

    let mut schemes: Vec<&str> = source::NETWORK_SCHEMES
        .iter()
        .copied()
        .filter(|scheme| sources.iter().any(|s| s.strip_suffix(':') == Some(*scheme)))
        .collect();
    if schemes.is_empty() {
        return sources;
    }
    if schemes.contains(&"http") && !schemes.contains(&"https") {
        schemes.push("https");
    }
    if schemes.contains(&"ws") && !schemes.contains(&"wss") {
        schemes.push("wss");
    }

    sources
        .into_iter()
        .filter(|s| {
            !schemes
                .iter()
                .any(|scheme| source::is_portless_url_with_scheme(s, scheme))
        })
        .collect()
}

/// Minimize a `*-attr` directive value.
///
/// Attributes are never matched by hosts or nonces, and only by hashes when
/// `'unsafe-hashes'` is present. A value with nothing usable left becomes
/// `'none'`.
pub fn reduce_attr_source_list(sources: &[String]) -> Vec<String> {
    let mut reduced: Vec<String> = sources
        .iter()
        .filter(|s| s.as_str() != ANY && source::is_quoted(s) && !source::is_nonce(s))
        .cloned()
        .collect();

    if !reduced.iter().any(|s| s == UNSAFE_HASHES) {
        reduced.retain(|s| !source::is_hash(s));
    }

    if reduced.is_empty() {
        reduced.push(NONE.to_string());
    }
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sorted(mut items: Vec<String>) -> Vec<String> {
        items.sort();
        items
    }

    #[test]
    fn test_dedup_keeps_first() {
        assert_eq!(
            dedup(&list(&["'self'", "a.com", "'self'", "b.com", "a.com"])),
            list(&["'self'", "a.com", "b.com"])
        );
    }

    #[test]
    fn test_none_absorbs_everything() {
        assert_eq!(
            reduce_source_list(&list(&["'self'", "'none'", "https://a.com"])),
            list(&["'none'"])
        );
        assert_eq!(
            reduce_source_list(&list(&["'report-sample'", "'self'", "'none'"])),
            list(&["'none'", "'report-sample'"])
        );
    }

    #[test]
    fn test_none_override_warns_only_when_discarding() {
        let records =
            palisade_log::capture(|| {
                reduce_source_list(&list(&["'none'", "'self'"]));
            });
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, palisade_log::Level::Warn);
        assert!(records[0].message.contains("'self'"));

        let records = palisade_log::capture(|| {
            reduce_source_list(&list(&["'none'", "'report-sample'", "'none'"]));
        });
        assert!(records.is_empty());
    }

    #[test]
    fn test_wildcard_absorbs_network_sources() {
        assert_eq!(
            reduce_source_list(&list(&["'self'", "*", "https:", "data:", "example.com"])),
            list(&["*", "'self'", "data:"])
        );
        assert_eq!(
            reduce_source_list(&list(&["https://a.com", "wss://b.com", "*", "blob:"])),
            list(&["*", "blob:"])
        );
    }

    #[test]
    fn test_scheme_absorbs_portless_urls() {
        let reduced = reduce_source_list(&list(&[
            "http:",
            "https://example.com",
            "https://example.com:8443",
        ]));
        assert_eq!(
            sorted(reduced),
            sorted(list(&["http:", "https://example.com:8443"]))
        );
    }

    #[test]
    fn test_colon_in_path_is_not_a_port() {
        let reduced = reduce_source_list(&list(&[
            "https:",
            "https://example.com/a:b",
            "https://example.com?at=10:30",
            "https://example.com:8443/a:b",
        ]));
        assert_eq!(reduced, list(&["https:", "https://example.com:8443/a:b"]));
    }

    #[test]
    fn test_ws_implies_wss() {
        let reduced = reduce_source_list(&list(&[
            "ws:",
            "wss://socket.example.com",
            "ws://socket.example.com",
            "https://example.com",
        ]));
        assert_eq!(reduced, list(&["ws:", "https://example.com"]));
    }

    #[test]
    fn test_https_does_not_imply_http() {
        let reduced = reduce_source_list(&list(&["https:", "http://example.com"]));
        assert_eq!(reduced, list(&["https:", "http://example.com"]));
    }

    #[test]
    fn test_hosts_without_scheme_survive_scheme_source() {
        let reduced = reduce_source_list(&list(&["https:", "example.com", "'self'"]));
        assert_eq!(reduced, list(&["https:", "example.com", "'self'"]));
    }

    #[test]
    fn test_attr_reduction() {
        assert_eq!(
            reduce_attr_source_list(&list(&[
                "'self'",
                "*",
                "https://cdn.example.com",
                "'nonce-abc'",
                "'sha256-abc'",
                "'unsafe-inline'",
            ])),
            list(&["'self'", "'unsafe-inline'"])
        );
    }

    #[test]
    fn test_attr_reduction_keeps_hashes_with_unsafe_hashes() {
        assert_eq!(
            reduce_attr_source_list(&list(&["'sha256-abc'", "'unsafe-hashes'", "'nonce-x'"])),
            list(&["'sha256-abc'", "'unsafe-hashes'"])
        );
    }

    #[test]
    fn test_attr_reduction_floor_is_none() {
        assert_eq!(
            reduce_attr_source_list(&list(&["https:", "*", "'nonce-abc'", "'sha512-abc'"])),
            list(&["'none'"])
        );
        assert_eq!(reduce_attr_source_list(&[]), list(&["'none'"]));
    }
}
