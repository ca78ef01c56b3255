//! Per-request nonce values.

use crate::error::{CspError, Result};
use crate::source;
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::OnceCell;
use rand::Rng;

/// Random bytes per nonce (128 bits).
const NONCE_BYTES: usize = 16;

/// A lazily generated nonce shared by everything rendering one response.
///
/// The same value must be stamped on `<script nonce>`/`<style nonce>` tags
/// and added to the policy, so a single `NonceSource` is created per request
/// and shared (usually behind an `Arc`) between the markup renderer and
/// [`PolicyHelper`](crate::PolicyHelper).
#[derive(Debug, Default)]
pub struct NonceSource {
    value: OnceCell<String>,
}

impl NonceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source pinned to an existing base64 value.
    pub fn with_value(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if !source::is_valid_nonce(&format!("'nonce-{}'", value)) {
            return Err(CspError::InvalidArgument(format!(
                "'{}' is not a base64 nonce value",
                value
            )));
        }
        Ok(Self {
            value: OnceCell::with_value(value),
        })
    }

    /// Whether the value has been generated yet.
    pub fn has_value(&self) -> bool {
        self.value.get().is_some()
    }

    /// The base64 nonce, generated on first use.
    pub fn value(&self) -> &str {
        self.value.get_or_init(|| {
            let mut bytes = [0u8; NONCE_BYTES];
            rand::thread_rng().fill(&mut bytes);
            STANDARD.encode(bytes)
        })
    }

    /// The nonce as a source expression, e.g. `'nonce-q4Zs...=='`.
    pub fn as_source(&self) -> String {
        format!("'nonce-{}'", self.value())
    }
}
