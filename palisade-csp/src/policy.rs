//! Content Security Policy construction and serialization.
//!
//! A [`Policy`] is a table of enabled directives. It is mutated freely while
//! a response is being prepared and serialized once with
//! [`Policy::header_value`], which minimizes the emitted source lists without
//! changing what the browser will enforce.

use crate::catalog::{self, Directive, Grammar};
use crate::error::{CspError, Result};
use crate::reduce::{dedup, reduce_attr_source_list, reduce_source_list};
use crate::source::{self, NONE, STRICT_DYNAMIC};
use crate::value::{split_tokens, DirectiveInput, DirectiveValue};
use palisade_log::trace;
use std::collections::HashMap;
use std::fmt;

pub const HEADER_NAME: &str = "Content-Security-Policy";
pub const REPORT_ONLY_HEADER_NAME: &str = "Content-Security-Policy-Report-Only";

/// A Content Security Policy under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    directives: HashMap<Directive, DirectiveValue>,
    report_only: bool,
}

impl Policy {
    /// Create an empty policy with no directives enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A restrictive starting point: same-origin resources only, no plugins,
    /// no framing by other origins.
    pub fn recommended() -> Self {
        Self::new()
            .default_src(["'self'"])
            .object_src(["'none'"])
            .base_uri(["'self'"])
            .frame_ancestors(["'self'"])
    }

    /// Whether `name` is a catalogued directive
    pub fn is_valid_directive_name(name: &str) -> bool {
        catalog::is_valid_directive_name(name)
    }

    /// Value grammar of a directive
    pub fn directive_grammar(name: &str) -> Result<Grammar> {
        catalog::directive_grammar(name)
    }

    /// Fallback directives of `name`, nearest first
    pub fn fallback_chain(name: &str) -> Result<&'static [&'static str]> {
        catalog::fallback_chain(name)
    }

    // ========================================================================
    // Builder shortcuts
    // ========================================================================

    fn with_sources<I, S>(mut self, name: &str, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Ok(directive) = Directive::lookup(name) {
            self.directives
                .insert(directive, DirectiveValue::Sources(split_tokens(sources)));
        }
        self
    }

    /// Set default-src directive
    pub fn default_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("default-src", sources)
    }

    /// Set script-src directive
    pub fn script_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("script-src", sources)
    }

    /// Set style-src directive
    pub fn style_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("style-src", sources)
    }

    /// Set img-src directive
    pub fn img_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("img-src", sources)
    }

    /// Set connect-src directive
    pub fn connect_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("connect-src", sources)
    }

    /// Set font-src directive
    pub fn font_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("font-src", sources)
    }

    /// Set object-src directive
    pub fn object_src<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("object-src", sources)
    }

    /// Set base-uri directive
    pub fn base_uri<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("base-uri", sources)
    }

    /// Set frame-ancestors directive
    pub fn frame_ancestors<I: IntoIterator<Item = S>, S: AsRef<str>>(self, sources: I) -> Self {
        self.with_sources("frame-ancestors", sources)
    }

    /// Enable upgrade-insecure-requests
    pub fn upgrade_insecure_requests(mut self) -> Self {
        if let Ok(directive) = Directive::lookup("upgrade-insecure-requests") {
            self.directives.insert(directive, DirectiveValue::Flag(true));
        }
        self
    }

    /// Enable report-only mode
    pub fn report_only(mut self, enabled: bool) -> Self {
        self.report_only = enabled;
        self
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Switch between enforcing and report-only mode
    pub fn set_report_only(&mut self, report_only: bool) {
        self.report_only = report_only;
    }

    /// Whether the policy is emitted as report-only
    pub fn is_report_only(&self) -> bool {
        self.report_only
    }

    /// Whether `name` is enabled. Unknown names are never enabled.
    pub fn has_directive(&self, name: &str) -> bool {
        Directive::lookup(name).is_ok_and(|d| self.directives.contains_key(&d))
    }

    /// Deduplicated sources of a directive; empty when it is not set.
    ///
    /// Boolean directives are read with [`Policy::get_flag`].
    pub fn get_directive(&self, name: &str) -> Result<Vec<String>> {
        let directive = Directive::lookup(name)?;
        if directive.grammar() == Grammar::Boolean {
            return Err(CspError::invalid_value(
                name,
                "boolean directives have no source list",
            ));
        }
        Ok(match self.directives.get(&directive) {
            Some(DirectiveValue::Sources(sources)) => dedup(sources),
            _ => Vec::new(),
        })
    }

    /// Value of a boolean directive, `None` when it is not set.
    pub fn get_flag(&self, name: &str) -> Result<Option<bool>> {
        let directive = Directive::lookup(name)?;
        match self.directives.get(&directive) {
            _ if directive.grammar() != Grammar::Boolean => Err(CspError::invalid_value(
                name,
                "only boolean directives have a flag value",
            )),
            Some(DirectiveValue::Flag(flag)) => Ok(Some(*flag)),
            _ => Ok(None),
        }
    }

    /// Replace a directive's value.
    ///
    /// An empty source list still enables the directive.
    pub fn set_directive(&mut self, name: &str, value: impl Into<DirectiveInput>) -> Result<()> {
        let directive = Directive::lookup(name)?;
        match (directive.grammar(), value.into()) {
            (Grammar::Boolean, DirectiveInput::Flag(flag)) => {
                self.directives.insert(directive, DirectiveValue::Flag(flag));
            }
            (Grammar::Boolean, DirectiveInput::Sources(_)) => {
                return Err(CspError::invalid_value(name, "expected a boolean value"));
            }
            (_, DirectiveInput::Flag(_)) => {
                return Err(CspError::invalid_value(name, "expected a source list"));
            }
            (_, DirectiveInput::Sources(sources)) => {
                self.directives
                    .insert(directive, DirectiveValue::Sources(sources));
            }
        }
        Ok(())
    }

    /// Append sources to a directive, enabling it if necessary.
    ///
    /// Appending an empty list is a no-op and does not enable the directive.
    pub fn append_directive(&mut self, name: &str, value: impl Into<DirectiveInput>) -> Result<()> {
        let directive = Directive::lookup(name)?;
        if directive.grammar() == Grammar::Boolean {
            return Err(CspError::invalid_value(
                name,
                "cannot append to a boolean directive",
            ));
        }
        let sources = match value.into() {
            DirectiveInput::Sources(sources) => sources,
            DirectiveInput::Flag(_) => {
                return Err(CspError::invalid_value(name, "expected a source list"));
            }
        };
        if sources.is_empty() {
            return Ok(());
        }

        match self
            .directives
            .entry(directive)
            .or_insert_with(|| DirectiveValue::Sources(Vec::new()))
        {
            DirectiveValue::Sources(existing) => existing.extend(sources),
            DirectiveValue::Flag(_) => {
                return Err(CspError::invalid_value(name, "expected a source list"));
            }
        }
        Ok(())
    }

    /// Append to a directive only if it is in effect.
    ///
    /// An unset directive is first seeded with the value of the nearest set
    /// directive in its fallback chain, so the effective policy for it does
    /// not change before `value` is added. A fallback of exactly `'none'`
    /// seeds an empty list instead. If nothing in the chain is set the
    /// directive stays unset and `value` is dropped.
    pub fn fallback_aware_append_if_enabled(
        &mut self,
        name: &str,
        value: impl Into<DirectiveInput>,
    ) -> Result<()> {
        let directive = Directive::lookup(name)?;

        if !self.directives.contains_key(&directive) {
            if let Some(fallback) = directive
                .fallbacks()
                .iter()
                .find(|fallback| self.has_directive(fallback))
            {
                let mut seed = self.get_directive(fallback)?;
                if seed.len() == 1 && seed[0] == NONE {
                    seed.clear();
                }
                self.set_directive(name, seed)?;
            }
        }

        if self.directives.contains_key(&directive) {
            self.append_directive(name, value)?;
        }
        Ok(())
    }

    /// Disable a directive. Removing an unset directive is not an error.
    pub fn remove_directive(&mut self, name: &str) -> Result<()> {
        let directive = Directive::lookup(name)?;
        self.directives.remove(&directive);
        Ok(())
    }

    /// Names of the enabled directives in catalog order.
    pub fn directive_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        catalog::DIRECTIVES
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| self.has_directive(name))
    }

    /// Run external alteration hooks against this policy, in order.
    pub fn alter(&mut self, hooks: &[&dyn PolicyAlter]) -> Result<()> {
        for hook in hooks {
            hook.alter(self)?;
        }
        Ok(())
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Header name for the current mode
    pub fn header_name(&self) -> &'static str {
        if self.report_only {
            REPORT_ONLY_HEADER_NAME
        } else {
            HEADER_NAME
        }
    }

    /// Serialize the policy into a header value.
    pub fn header_value(&self) -> String {
        let mut shaped = self.shaped_directives();
        collapse_into_fallbacks(&mut shaped);

        for (directive, sources) in shaped.iter_mut() {
            if directive.name().ends_with("-attr") {
                *sources = reduce_attr_source_list(sources);
            }
        }

        inherit_default_keywords(&mut shaped);

        let mut ordered: Vec<(Directive, Vec<String>)> = shaped.into_iter().collect();
        ordered.sort_by_key(|(directive, _)| directive.position());

        let value = ordered
            .iter()
            .map(|(directive, sources)| {
                if sources.is_empty() {
                    directive.name().to_string()
                } else {
                    format!("{} {}", directive.name(), sources.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join("; ");

        trace!(
            target: "palisade::csp",
            "Serialized {} with {} directives",
            self.header_name(),
            ordered.len()
        );
        value
    }

    /// Header name and value pair.
    pub fn header(&self) -> (&'static str, String) {
        (self.header_name(), self.header_value())
    }

    /// Insert the policy header into a header map. Nothing is inserted for a
    /// policy that serializes to an empty value.
    pub fn insert_header(&self, headers: &mut HashMap<String, String>) {
        let value = self.header_value();
        if !value.is_empty() {
            headers.insert(self.header_name().to_string(), value);
        }
    }

    /// Per-directive value shaping on a working copy. Boolean directives
    /// become an empty list marker.
    fn shaped_directives(&self) -> HashMap<Directive, Vec<String>> {
        let mut shaped = HashMap::with_capacity(self.directives.len());
        for (directive, value) in &self.directives {
            let sources = match (directive.grammar(), value) {
                (_, DirectiveValue::Flag(false)) => continue,
                (_, DirectiveValue::Flag(true)) => Vec::new(),
                (Grammar::OptionalTokenList, DirectiveValue::Sources(s)) => dedup(s),
                (_, DirectiveValue::Sources(s)) if s.is_empty() => continue,
                (grammar, DirectiveValue::Sources(s)) if grammar.is_source_list() => {
                    reduce_source_list(s)
                }
                (_, DirectiveValue::Sources(s)) => dedup(s),
            };
            shaped.insert(*directive, sources);
        }
        shaped
    }
}

/// Drop directives whose nearest set fallback has the same sources.
fn collapse_into_fallbacks(shaped: &mut HashMap<Directive, Vec<String>>) {
    let redundant: Vec<Directive> = shaped
        .iter()
        .filter(|(directive, sources)| {
            directive
                .fallbacks()
                .iter()
                .filter_map(|name| Directive::lookup(name).ok())
                .find_map(|fallback| shaped.get(&fallback))
                .is_some_and(|fallback_sources| same_sources(sources, fallback_sources))
        })
        .map(|(directive, _)| *directive)
        .collect();

    for directive in redundant {
        shaped.remove(&directive);
    }
}

/// Some engines ignore `'strict-dynamic'`, nonces and hashes that reach
/// `script-src`/`style-src` only through `default-src`; repeat them
/// explicitly.
fn inherit_default_keywords(shaped: &mut HashMap<Directive, Vec<String>>) {
    let (Ok(default_src), Ok(script_src), Ok(style_src)) = (
        Directive::lookup("default-src"),
        Directive::lookup("script-src"),
        Directive::lookup("style-src"),
    ) else {
        return;
    };

    let Some(defaults) = shaped.get(&default_src).filter(|v| !v.is_empty()).cloned() else {
        return;
    };
    let carries_keywords = defaults
        .iter()
        .any(|s| s == STRICT_DYNAMIC || source::is_nonce(s) || source::is_hash(s));
    if !carries_keywords {
        return;
    }

    if shaped.get(&script_src).is_none_or(Vec::is_empty) {
        shaped.insert(script_src, defaults.clone());
    }
    if shaped.get(&style_src).is_none_or(Vec::is_empty) {
        let styles: Vec<String> = defaults.into_iter().filter(|s| s != STRICT_DYNAMIC).collect();
        if !styles.is_empty() {
            shaped.insert(style_src, styles);
        }
    }
}

fn same_sources(a: &[String], b: &[String]) -> bool {
    a.iter().all(|s| b.contains(s)) && b.iter().all(|s| a.contains(s))
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.header_name(), self.header_value())
    }
}

/// Extension point that may inspect or rewrite a fully populated policy
/// before it is serialized.
pub trait PolicyAlter {
    fn alter(&self, policy: &mut Policy) -> Result<()>;
}

impl<F> PolicyAlter for F
where
    F: Fn(&mut Policy) -> Result<()>,
{
    fn alter(&self, policy: &mut Policy) -> Result<()> {
        self(policy)
    }
}
