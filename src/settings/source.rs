//! Where a resolved value came from, and where environment overrides are read

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Layer that supplied a resolved value, highest precedence first
///
/// The derived ordering follows precedence: `Env < Profile < ... < Undefined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    /// Environment variable override
    Env,
    /// Named profile override
    Profile,
    /// Base config stored in the project
    Project,
    /// Default declared in the settings schema
    Default,
    /// Kind-specific fallback
    Fallback,
    /// No layer supplied a value
    Undefined,
}

impl SettingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingSource::Env => "env",
            SettingSource::Profile => "profile",
            SettingSource::Project => "project",
            SettingSource::Default => "default",
            SettingSource::Fallback => "fallback",
            SettingSource::Undefined => "undefined",
        }
    }

    /// Whether this source has at least the precedence of `lowest`
    pub fn is_at_least(&self, lowest: SettingSource) -> bool {
        *self <= lowest
    }
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read access to environment variables
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The current process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
