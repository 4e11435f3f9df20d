//! Tool-level settings stored alongside the plugins

use serde::{Deserialize, Serialize};

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Process environment variables forwarded to every plugin
    #[serde(default = "default_passthrough_env")]
    pub passthrough_env: Vec<String>,

    /// Prefix of variables the tool itself injects (`<PREFIX>_JOB_ID`, ...)
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// Remote catalog merged over the bundled one (requires the `http` feature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<String>,
}

fn default_passthrough_env() -> Vec<String> {
    ["PATH", "HOME", "LANG", "LC_ALL", "TZ", "TMPDIR"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_env_prefix() -> String {
    "CONDUIT".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            passthrough_env: default_passthrough_env(),
            env_prefix: default_env_prefix(),
            catalog_url: None,
        }
    }
}

impl ToolConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.env_prefix.is_empty()
            || !self
                .env_prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(format!(
                "env_prefix must be upper-case alphanumeric, got '{}'",
                self.env_prefix
            ));
        }

        Ok(())
    }

    /// Name of a variable injected by the tool
    pub fn env_var(&self, name: &str) -> String {
        prefixed_env_var(&self.env_prefix, name)
    }
}

/// `<PREFIX>_<NAME>`
pub(crate) fn prefixed_env_var(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}
