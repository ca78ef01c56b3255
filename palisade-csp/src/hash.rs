//! Hash sources for inline `<script>` and `<style>` content.

use crate::error::{CspError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Digest algorithms accepted in hash sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Hash `content` and format it as a source expression, e.g.
    /// `'sha256-<base64>'`.
    pub fn source(&self, content: impl AsRef<[u8]>) -> String {
        let content = content.as_ref();
        let digest = match self {
            HashAlgorithm::Sha256 => STANDARD.encode(Sha256::digest(content)),
            HashAlgorithm::Sha384 => STANDARD.encode(Sha384::digest(content)),
            HashAlgorithm::Sha512 => STANDARD.encode(Sha512::digest(content)),
        };
        format!("'{}-{}'", self.as_str(), digest)
    }
}

impl FromStr for HashAlgorithm {
    type Err = CspError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(CspError::InvalidArgument(format!(
                "unsupported hash algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
