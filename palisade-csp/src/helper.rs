//! Layering nonces and hashes onto an existing policy.
//!
//! Adding a nonce or hash to a source list silently disables
//! `'unsafe-inline'` in it for engines that understand them. The helpers here
//! only ever add to directives that are already in effect, and fall back to
//! a caller supplied value where adding the nonce/hash would change what
//! older engines allow.

use crate::error::{CspError, Result};
use crate::nonce::NonceSource;
use crate::policy::Policy;
use crate::source::{self, STRICT_DYNAMIC, UNSAFE_HASHES, UNSAFE_INLINE};
use crate::value::DirectiveInput;
use palisade_log::debug;
use std::str::FromStr;
use std::sync::Arc;

/// Which inline resources a helper call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Script,
    Style,
}

impl FromStr for Resource {
    type Err = CspError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "script" => Ok(Resource::Script),
            "style" => Ok(Resource::Style),
            other => Err(CspError::InvalidArgument(format!(
                "directive must be 'script' or 'style', got '{}'",
                other
            ))),
        }
    }
}

/// Elements (`<script>`, `<style>`) or attributes (`onclick`, `style=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Elem,
    Attr,
}

impl Scope {
    fn other(self) -> Self {
        match self {
            Scope::Elem => Scope::Attr,
            Scope::Attr => Scope::Elem,
        }
    }
}

impl FromStr for Scope {
    type Err = CspError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "elem" => Ok(Scope::Elem),
            "attr" => Ok(Scope::Attr),
            other => Err(CspError::InvalidArgument(format!(
                "type must be 'elem' or 'attr', got '{}'",
                other
            ))),
        }
    }
}

/// The `<resource>-src-<scope>` directive name.
pub fn sub_directive(resource: Resource, scope: Scope) -> &'static str {
    match (resource, scope) {
        (Resource::Script, Scope::Elem) => "script-src-elem",
        (Resource::Script, Scope::Attr) => "script-src-attr",
        (Resource::Style, Scope::Elem) => "style-src-elem",
        (Resource::Style, Scope::Attr) => "style-src-attr",
    }
}

/// Policy operations that depend on the request's nonce.
#[derive(Debug, Clone)]
pub struct PolicyHelper {
    nonce: Arc<NonceSource>,
}

impl PolicyHelper {
    pub fn new(nonce: Arc<NonceSource>) -> Self {
        Self { nonce }
    }

    /// The nonce shared with the markup renderer.
    pub fn nonce(&self) -> &Arc<NonceSource> {
        &self.nonce
    }

    /// Add a nonce to `<resource>-src-elem`.
    ///
    /// `fallback` is added instead where the directive currently depends on
    /// `'unsafe-inline'`. Without an explicit `value` the shared
    /// [`NonceSource`] is used.
    pub fn append_nonce(
        &self,
        policy: &mut Policy,
        resource: Resource,
        fallback: impl Into<DirectiveInput>,
        value: Option<&str>,
    ) -> Result<()> {
        let nonce = match value {
            Some(value) if source::is_valid_nonce(value) => value.to_string(),
            Some(value) => {
                return Err(CspError::InvalidArgument(format!(
                    "'{}' is not a nonce source",
                    value
                )));
            }
            None => self.nonce.as_source(),
        };

        append_to_unsafe_disabler(
            policy,
            sub_directive(resource, Scope::Elem),
            &fallback_sources(fallback)?,
            &[nonce],
        )
    }

    /// Add a hash to `<resource>-src-<scope>`.
    ///
    /// The other scope's directive is materialized first so it keeps its
    /// current effective value. Attribute hashes are accompanied by
    /// `'unsafe-hashes'`.
    pub fn append_hash(
        &self,
        policy: &mut Policy,
        resource: Resource,
        scope: Scope,
        fallback: impl Into<DirectiveInput>,
        value: &str,
    ) -> Result<()> {
        if !source::is_valid_hash(value) {
            return Err(CspError::InvalidArgument(format!(
                "'{}' is not a sha256, sha384 or sha512 hash source",
                value
            )));
        }
        let fallback = fallback_sources(fallback)?;

        policy.fallback_aware_append_if_enabled(
            sub_directive(resource, scope.other()),
            DirectiveInput::empty(),
        )?;

        let mut addition = vec![value.to_string()];
        if scope == Scope::Attr {
            addition.push(UNSAFE_HASHES.to_string());
        }

        append_to_unsafe_disabler(policy, sub_directive(resource, scope), &fallback, &addition)
    }

    /// Force `'unsafe-inline'` on `<resource>-src-<scope>` and its fallbacks
    /// (other than `default-src`), removing the nonces, hashes and keywords
    /// that would make engines ignore it.
    ///
    /// Call this before any [`append_nonce`](Self::append_nonce) or
    /// [`append_hash`](Self::append_hash) for the same directive; it strips
    /// whatever those added.
    pub fn require_unsafe_inline(
        &self,
        policy: &mut Policy,
        resource: Resource,
        scope: Scope,
    ) -> Result<()> {
        let name = sub_directive(resource, scope);
        let chain = chain_with(name)?;
        if !chain.iter().any(|d| policy.has_directive(d)) {
            debug!(target: "palisade::csp", "No {} policy in effect; nothing to relax", name);
            return Ok(());
        }

        let other = sub_directive(resource, scope.other());
        policy.fallback_aware_append_if_enabled(other, DirectiveInput::empty())?;
        if policy.has_directive(other) {
            let current = policy.get_directive(other)?;
            let sanitized: Vec<String> = match scope {
                Scope::Elem => {
                    let mut attrs: Vec<String> =
                        current.into_iter().filter(|s| s != UNSAFE_HASHES).collect();
                    // An empty list would be dropped on output and inherit the relaxed fallback.
                    if attrs.is_empty() {
                        attrs.push(source::NONE.to_string());
                    }
                    attrs
                }
                Scope::Attr => {
                    let keep_hashes = current.iter().any(|s| s == UNSAFE_HASHES);
                    current
                        .into_iter()
                        .filter(|s| !source::is_nonce(s) && (keep_hashes || !source::is_hash(s)))
                        .collect()
                }
            };
            policy.set_directive(other, sanitized)?;
        }

        for directive in chain.iter().filter(|d| **d != "default-src") {
            policy.fallback_aware_append_if_enabled(directive, DirectiveInput::empty())?;
            if !policy.has_directive(directive) {
                continue;
            }
            let mut relaxed: Vec<String> = policy
                .get_directive(directive)?
                .into_iter()
                .filter(|s| {
                    !source::is_nonce(s)
                        && !source::is_hash(s)
                        && s != STRICT_DYNAMIC
                        && s != UNSAFE_HASHES
                })
                .collect();
            relaxed.push(UNSAFE_INLINE.to_string());
            policy.set_directive(directive, relaxed)?;
        }
        Ok(())
    }

    /// Whether a source list relies on `'unsafe-inline'`: it is present and
    /// not already neutralized by `'strict-dynamic'`, a nonce or a hash.
    pub fn requires_unsafe_inline(sources: &[String]) -> bool {
        sources.iter().any(|s| s == UNSAFE_INLINE)
            && !sources.iter().any(|s| s == STRICT_DYNAMIC)
            && !sources
                .iter()
                .any(|s| source::is_nonce(s) || source::is_hash(s))
    }
}

/// `name` followed by its fallback chain.
fn chain_with(name: &'static str) -> Result<Vec<&'static str>> {
    let mut chain = vec![name];
    chain.extend_from_slice(Policy::fallback_chain(name)?);
    Ok(chain)
}

fn fallback_sources(fallback: impl Into<DirectiveInput>) -> Result<Vec<String>> {
    match fallback.into() {
        DirectiveInput::Sources(sources) => Ok(sources),
        DirectiveInput::Flag(_) => Err(CspError::InvalidArgument(
            "fallback must be a source list".to_string(),
        )),
    }
}

/// Add `value` to `directive` and its set fallbacks, or `fallback` wherever
/// the current sources still rely on `'unsafe-inline'`.
///
/// `default-src` is never touched. Fallback directives that are not set
/// are left alone: creating them would only add restrictions.
fn append_to_unsafe_disabler(
    policy: &mut Policy,
    directive: &'static str,
    fallback: &[String],
    value: &[String],
) -> Result<()> {
    let chain = chain_with(directive)?;
    if !chain.iter().any(|d| policy.has_directive(d)) {
        debug!(target: "palisade::csp", "No {} policy in effect; nothing to extend", directive);
        return Ok(());
    }

    for name in chain.into_iter().filter(|d| *d != "default-src") {
        if name != directive && !policy.has_directive(name) {
            continue;
        }
        policy.fallback_aware_append_if_enabled(name, DirectiveInput::empty())?;
        if !policy.has_directive(name) {
            continue;
        }
        let current = policy.get_directive(name)?;
        let addition = if PolicyHelper::requires_unsafe_inline(&current) {
            fallback
        } else {
            value
        };
        policy.append_directive(name, addition)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: &str = "'nonce-AAAAAAAAAAAAAAAAAAAAAA=='";
    const HASH: &str = "'sha256-bhHHL3z2vDgxUt0W3dWQOrprscmda2Y5pLsLg4GF+pI='";

    fn helper() -> PolicyHelper {
        PolicyHelper::new(Arc::new(NonceSource::new()))
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_resource_and_scope() {
        assert_eq!("script".parse::<Resource>().unwrap(), Resource::Script);
        assert_eq!("attr".parse::<Scope>().unwrap(), Scope::Attr);
        assert!(matches!(
            "img".parse::<Resource>(),
            Err(CspError::InvalidArgument(_))
        ));
        assert!(matches!(
            "inline".parse::<Scope>(),
            Err(CspError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sub_directive_names() {
        assert_eq!(sub_directive(Resource::Script, Scope::Elem), "script-src-elem");
        assert_eq!(sub_directive(Resource::Style, Scope::Attr), "style-src-attr");
    }

    #[test]
    fn test_requires_unsafe_inline() {
        assert!(PolicyHelper::requires_unsafe_inline(&list(&["'self'", "'unsafe-inline'"])));
        assert!(!PolicyHelper::requires_unsafe_inline(&list(&["'self'"])));
        assert!(!PolicyHelper::requires_unsafe_inline(&list(&[
            "'unsafe-inline'",
            "'strict-dynamic'"
        ])));
        assert!(!PolicyHelper::requires_unsafe_inline(&list(&["'unsafe-inline'", NONCE])));
        assert!(!PolicyHelper::requires_unsafe_inline(&list(&["'unsafe-inline'", HASH])));
    }

    #[test]
    fn test_append_nonce_without_policy_is_noop() {
        let mut policy = Policy::new().img_src(["'self'"]);
        helper()
            .append_nonce(&mut policy, Resource::Script, "'unsafe-inline'", Some(NONCE))
            .unwrap();
        assert_eq!(policy, Policy::new().img_src(["'self'"]));
    }

    #[test]
    fn test_append_nonce_uses_shared_source() {
        let nonce = Arc::new(NonceSource::new());
        let helper = PolicyHelper::new(Arc::clone(&nonce));
        let mut policy = Policy::new().script_src(["'self'"]);

        helper
            .append_nonce(&mut policy, Resource::Script, "'unsafe-inline'", None)
            .unwrap();

        assert!(nonce.has_value());
        assert_eq!(
            policy.get_directive("script-src-elem").unwrap(),
            vec!["'self'".to_string(), nonce.as_source()]
        );
        assert_eq!(
            policy.get_directive("script-src").unwrap(),
            vec!["'self'".to_string(), nonce.as_source()]
        );
    }

    #[test]
    fn test_append_nonce_rejects_malformed_value() {
        let mut policy = Policy::new().script_src(["'self'"]);
        let result = helper().append_nonce(
            &mut policy,
            Resource::Script,
            "'unsafe-inline'",
            Some("nonce-abc"),
        );
        assert!(matches!(result, Err(CspError::InvalidArgument(_))));
        assert!(!policy.has_directive("script-src-elem"));
    }

    #[test]
    fn test_append_nonce_keeps_unsafe_inline_working() {
        let mut policy = Policy::new();
        policy
            .set_directive("script-src-elem", "'self' 'unsafe-inline'")
            .unwrap();

        helper()
            .append_nonce(&mut policy, Resource::Script, "'unsafe-inline'", Some(NONCE))
            .unwrap();
        assert_eq!(
            policy.get_directive("script-src-elem").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert!(!policy.has_directive("script-src"));
    }

    #[test]
    fn test_append_nonce_once_neutralized() {
        let mut policy = Policy::new();
        policy
            .set_directive("script-src-elem", ["'self'", "'unsafe-inline'", HASH])
            .unwrap();

        helper()
            .append_nonce(&mut policy, Resource::Script, "'unsafe-inline'", Some(NONCE))
            .unwrap();
        assert_eq!(
            policy.get_directive("script-src-elem").unwrap(),
            list(&["'self'", "'unsafe-inline'", HASH, NONCE])
        );
    }

    #[test]
    fn test_append_hash_validates_value() {
        let mut policy = Policy::new().script_src(["'self'"]);
        for bad in ["'sha1-abc'", "sha256-abc", "'sha256-'"] {
            let result =
                helper().append_hash(&mut policy, Resource::Script, Scope::Elem, "", bad);
            assert!(matches!(result, Err(CspError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_append_attr_hash_adds_unsafe_hashes() {
        let mut policy = Policy::new().style_src(["'self'"]);
        helper()
            .append_hash(&mut policy, Resource::Style, Scope::Attr, "'unsafe-inline'", HASH)
            .unwrap();

        assert_eq!(
            policy.get_directive("style-src-attr").unwrap(),
            list(&["'self'", HASH, "'unsafe-hashes'"])
        );
        // elem is pinned to the value it had before style-src changed
        assert_eq!(
            policy.get_directive("style-src-elem").unwrap(),
            list(&["'self'"])
        );
        assert_eq!(
            policy.get_directive("style-src").unwrap(),
            list(&["'self'", HASH, "'unsafe-hashes'"])
        );
    }

    #[test]
    fn test_append_elem_hash_pins_attr() {
        let mut policy = Policy::new().default_src(["'self'", "'unsafe-inline'"]);
        helper()
            .append_hash(&mut policy, Resource::Script, Scope::Elem, "'unsafe-inline'", HASH)
            .unwrap();

        assert_eq!(
            policy.get_directive("script-src-attr").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert_eq!(
            policy.get_directive("script-src-elem").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert!(!policy.has_directive("script-src"));
    }

    #[test]
    fn test_require_unsafe_inline_without_policy_is_noop() {
        let mut policy = Policy::new().img_src(["'self'"]);
        helper()
            .require_unsafe_inline(&mut policy, Resource::Script, Scope::Elem)
            .unwrap();
        assert_eq!(policy, Policy::new().img_src(["'self'"]));
    }

    #[test]
    fn test_require_unsafe_inline_on_elem() {
        let mut policy = Policy::new().script_src([
            "'self'",
            "'strict-dynamic'",
            NONCE,
            HASH,
            "'unsafe-hashes'",
        ]);
        helper()
            .require_unsafe_inline(&mut policy, Resource::Script, Scope::Elem)
            .unwrap();

        assert_eq!(
            policy.get_directive("script-src-elem").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert_eq!(
            policy.get_directive("script-src").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert_eq!(
            policy.get_directive("script-src-attr").unwrap(),
            list(&["'self'", "'strict-dynamic'", NONCE, HASH])
        );
        assert!(!policy.has_directive("default-src"));
    }

    #[test]
    fn test_require_unsafe_inline_on_attr() {
        let mut policy = Policy::new().default_src(["'self'", NONCE, HASH]);
        helper()
            .require_unsafe_inline(&mut policy, Resource::Style, Scope::Attr)
            .unwrap();

        assert_eq!(
            policy.get_directive("style-src-elem").unwrap(),
            list(&["'self'"])
        );
        assert_eq!(
            policy.get_directive("style-src-attr").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert_eq!(
            policy.get_directive("style-src").unwrap(),
            list(&["'self'", "'unsafe-inline'"])
        );
        assert_eq!(
            policy.get_directive("default-src").unwrap(),
            list(&["'self'", NONCE, HASH])
        );
    }

    #[test]
    fn test_require_unsafe_inline_on_attr_keeps_emptied_elem_open() {
        let mut policy = Policy::new().default_src(["'nonce-AAAA'"]);
        helper()
            .require_unsafe_inline(&mut policy, Resource::Script, Scope::Attr)
            .unwrap();

        assert!(policy.has_directive("script-src-elem"));
        assert!(policy.get_directive("script-src-elem").unwrap().is_empty());
        assert_eq!(
            policy.get_directive("script-src").unwrap(),
            list(&["'unsafe-inline'"])
        );
        let header = policy.header_value();
        assert!(!header.contains("script-src-elem"));
        assert!(header.contains("script-src 'unsafe-inline'"));
    }

    #[test]
    fn test_require_unsafe_inline_keeps_blocking_attrs() {
        let mut policy = Policy::new().script_src(["'unsafe-hashes'"]);
        helper()
            .require_unsafe_inline(&mut policy, Resource::Script, Scope::Elem)
            .unwrap();
        assert_eq!(
            policy.get_directive("script-src-attr").unwrap(),
            list(&["'none'"])
        );
    }
}
