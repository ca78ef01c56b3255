//! Static directive and fallback catalogs.
//!
//! The declaration order of [`DIRECTIVES`] is also the order in which
//! directives are emitted in a serialized header.

use crate::error::{CspError, Result};

/// Value grammar of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    SourceList,
    AncestorSourceList,
    MediaTypeList,
    TokenList,
    /// A token list where an empty value is meaningful (e.g. bare `sandbox`)
    OptionalTokenList,
    Token,
    UriReferenceList,
    /// Value-less directive, present or absent
    Boolean,
    /// `'allow'` or `'block'`
    AllowBlock,
}

impl Grammar {
    /// Whether values of this grammar go through source-list reduction.
    pub fn is_source_list(&self) -> bool {
        matches!(self, Grammar::SourceList | Grammar::AncestorSourceList)
    }
}

/// Every directive this crate knows about, in emission order.
pub const DIRECTIVES: &[(&str, Grammar)] = &[
    // Fetch
    ("default-src", Grammar::SourceList),
    ("child-src", Grammar::SourceList),
    ("connect-src", Grammar::SourceList),
    ("fenced-frame-src", Grammar::SourceList),
    ("font-src", Grammar::SourceList),
    ("frame-src", Grammar::SourceList),
    ("img-src", Grammar::SourceList),
    ("manifest-src", Grammar::SourceList),
    ("media-src", Grammar::SourceList),
    ("object-src", Grammar::SourceList),
    ("script-src", Grammar::SourceList),
    ("script-src-attr", Grammar::SourceList),
    ("script-src-elem", Grammar::SourceList),
    ("style-src", Grammar::SourceList),
    ("style-src-attr", Grammar::SourceList),
    ("style-src-elem", Grammar::SourceList),
    ("worker-src", Grammar::SourceList),
    // WebRTC
    ("webrtc", Grammar::AllowBlock),
    // Document
    ("base-uri", Grammar::SourceList),
    ("sandbox", Grammar::OptionalTokenList),
    // Navigation
    ("form-action", Grammar::SourceList),
    ("frame-ancestors", Grammar::AncestorSourceList),
    // Reporting
    ("report-uri", Grammar::UriReferenceList),
    ("report-to", Grammar::Token),
    // Trusted types and transport
    ("require-trusted-types-for", Grammar::TokenList),
    ("trusted-types", Grammar::OptionalTokenList),
    ("upgrade-insecure-requests", Grammar::Boolean),
    // Deprecated
    ("block-all-mixed-content", Grammar::Boolean),
    ("navigate-to", Grammar::SourceList),
    ("plugin-types", Grammar::MediaTypeList),
    ("prefetch-src", Grammar::SourceList),
    ("require-sri-for", Grammar::TokenList),
];

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directive {
    name: &'static str,
    grammar: Grammar,
    position: usize,
}

impl Directive {
    /// Look up a directive by name.
    pub fn lookup(name: &str) -> Result<Self> {
        DIRECTIVES
            .iter()
            .position(|(n, _)| *n == name)
            .map(|position| Directive {
                name: DIRECTIVES[position].0,
                grammar: DIRECTIVES[position].1,
                position,
            })
            .ok_or_else(|| CspError::UnknownDirective(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Position in the catalog, used for emission ordering.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Directives consulted, nearest first, when this one is not set.
    pub fn fallbacks(&self) -> &'static [&'static str] {
        fallback_list(self.name)
    }
}

fn fallback_list(name: &str) -> &'static [&'static str] {
    match name {
        "script-src-elem" | "script-src-attr" => &["script-src", "default-src"],
        "style-src-elem" | "style-src-attr" => &["style-src", "default-src"],
        "worker-src" => &["child-src", "script-src", "default-src"],
        "frame-src" => &["child-src", "default-src"],
        "fenced-frame-src" => &["frame-src", "child-src", "default-src"],
        "child-src" | "connect-src" | "font-src" | "img-src" | "manifest-src" | "media-src"
        | "object-src" | "prefetch-src" | "script-src" | "style-src" => &["default-src"],
        _ => &[],
    }
}

/// Whether `name` appears in the directive catalog.
pub fn is_valid_directive_name(name: &str) -> bool {
    DIRECTIVES.iter().any(|(n, _)| *n == name)
}

/// Grammar of a directive.
pub fn directive_grammar(name: &str) -> Result<Grammar> {
    Directive::lookup(name).map(|d| d.grammar())
}

/// Fallback chain of a directive, nearest first.
pub fn fallback_chain(name: &str) -> Result<&'static [&'static str]> {
    Directive::lookup(name).map(|d| d.fallbacks())
}
