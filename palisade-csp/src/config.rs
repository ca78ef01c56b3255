//! Declarative policy configuration.
//!
//! ```toml
//! report_only = false
//!
//! [directives]
//! default-src = "'self'"
//! img-src = ["'self'", "data:"]
//! upgrade-insecure-requests = true
//! ```

use crate::catalog::{Directive, Grammar};
use crate::error::{CspError, Result};
use crate::policy::Policy;
use crate::value::DirectiveInput;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// A directive value as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl From<ConfigValue> for DirectiveInput {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::Flag(flag) => DirectiveInput::Flag(flag),
            ConfigValue::Text(text) => DirectiveInput::from(text),
            ConfigValue::List(list) => DirectiveInput::from(list),
        }
    }
}

/// Policy settings loaded from a file and/or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub report_only: bool,
    pub directives: BTreeMap<String, ConfigValue>,
}

impl PolicyConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a configuration file, detecting the format from its extension.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CspError::Config(format!("No file extension: {}", path.display())))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| CspError::Config(format!("Unsupported format: {}", ext)))?;

        let content = fs::read_to_string(path)?;
        match format {
            FileFormat::Json => Self::from_json_str(&content),
            FileFormat::Toml => Self::from_toml_str(&content),
        }
    }

    /// Apply `<PREFIX>REPORT_ONLY` and `<PREFIX><DIRECTIVE>` variables, e.g.
    /// `CSP_SCRIPT_SRC="'self' cdn.example.com"` with prefix `CSP_`.
    pub fn with_env_overrides(self, prefix: &str) -> Result<Self> {
        self.with_overrides(prefix, env::vars())
    }

    fn with_overrides<I>(mut self, prefix: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(prefix) else {
                continue;
            };
            if name == "REPORT_ONLY" {
                self.report_only = parse_flag(&key, &value)?;
                continue;
            }

            let directive_name = name.to_lowercase().replace('_', "-");
            let Ok(directive) = Directive::lookup(&directive_name) else {
                continue;
            };
            let value = match directive.grammar() {
                Grammar::Boolean => ConfigValue::Flag(parse_flag(&key, &value)?),
                _ => ConfigValue::Text(value),
            };
            self.directives.insert(directive_name, value);
        }
        Ok(self)
    }

    /// Build a policy, validating every directive name and value.
    pub fn build(&self) -> Result<Policy> {
        let mut policy = Policy::new().report_only(self.report_only);
        for (name, value) in &self.directives {
            policy.set_directive(name, value.clone())?;
        }
        Ok(policy)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(CspError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}
