//! # Palisade CSP
//!
//! Content-Security-Policy construction for server-rendered responses.
//!
//! ## Features
//!
//! - ✅ **Directive Catalog** - Every directive name, its value grammar and fallback chain
//! - ✅ **Minimal Headers** - Redundant sources and directives removed on output
//! - ✅ **Nonces & Hashes** - Added without breaking `'unsafe-inline'` for old engines
//! - ✅ **Report-Only Mode** - `Content-Security-Policy-Report-Only`
//! - ✅ **Configurable** - TOML/JSON files and environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use palisade_csp::Policy;
//!
//! let policy = Policy::recommended().img_src(["'self'", "data:"]);
//! assert_eq!(
//!     policy.header_value(),
//!     "default-src 'self'; img-src 'self' data:; object-src 'none'; \
//!      base-uri 'self'; frame-ancestors 'self'"
//! );
//! ```
//!
//! ## Nonces
//!
//! ```rust
//! use palisade_csp::{NonceSource, Policy, PolicyHelper, Resource};
//! use std::sync::Arc;
//!
//! let nonce = Arc::new(NonceSource::new());
//! let helper = PolicyHelper::new(Arc::clone(&nonce));
//!
//! let mut policy = Policy::new().default_src(["'self'"]);
//! helper
//!     .append_nonce(&mut policy, Resource::Script, "'unsafe-inline'", None)
//!     .unwrap();
//!
//! // The same value goes on the <script nonce="..."> tags.
//! assert!(policy.header_value().contains(&nonce.as_source()));
//! ```
//!
//! ## Hashes
//!
//! ```rust
//! use palisade_csp::{HashAlgorithm, Policy, PolicyHelper, NonceSource, Resource, Scope};
//! use std::sync::Arc;
//!
//! let helper = PolicyHelper::new(Arc::new(NonceSource::new()));
//! let mut policy = Policy::new().style_src(["'self'"]);
//!
//! let hash = HashAlgorithm::Sha256.source("body { margin: 0 }");
//! helper
//!     .append_hash(&mut policy, Resource::Style, Scope::Elem, "'unsafe-inline'", &hash)
//!     .unwrap();
//!
//! assert!(policy.get_directive("style-src-elem").unwrap().contains(&hash));
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use palisade_csp::PolicyConfig;
//!
//! let config = PolicyConfig::from_toml_str(r#"
//!     [directives]
//!     default-src = "'self'"
//!     upgrade-insecure-requests = true
//! "#).unwrap();
//!
//! let policy = config.build().unwrap();
//! assert_eq!(policy.header_value(), "default-src 'self'; upgrade-insecure-requests");
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod hash;
pub mod helper;
pub mod nonce;
pub mod policy;
pub mod reduce;
pub mod source;
pub mod value;

pub use catalog::{Directive, Grammar};
pub use config::{ConfigValue, FileFormat, PolicyConfig};
pub use error::{CspError, Result};
pub use hash::HashAlgorithm;
pub use helper::{sub_directive, PolicyHelper, Resource, Scope};
pub use nonce::NonceSource;
pub use policy::{Policy, PolicyAlter, HEADER_NAME, REPORT_ONLY_HEADER_NAME};
pub use value::{DirectiveInput, DirectiveValue};

/// Prelude for common imports.
///
/// ```
/// use palisade_csp::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::PolicyConfig;
    pub use crate::error::{CspError, Result};
    pub use crate::hash::HashAlgorithm;
    pub use crate::helper::{PolicyHelper, Resource, Scope};
    pub use crate::nonce::NonceSource;
    pub use crate::policy::{Policy, PolicyAlter};
    pub use crate::value::DirectiveInput;
}
