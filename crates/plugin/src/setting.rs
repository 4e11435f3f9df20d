//! Setting schema declarations

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{PluginError, PluginResult};

/// Kind of a declared setting
///
/// Each kind carries its own validation, coercion and fallback rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    #[default]
    String,
    Password,
    Hidden,
    Boolean,
    Integer,
    Date,
    Options,
}

impl SettingKind {
    /// Value used when no layer defines the setting
    pub fn fallback(&self) -> Option<Value> {
        match self {
            SettingKind::Boolean => Some(Value::Bool(false)),
            _ => None,
        }
    }

    /// Excluded from display listings entirely
    pub fn is_hidden(&self) -> bool {
        matches!(self, SettingKind::Hidden)
    }

    /// Listed, but with the value masked
    pub fn is_redacted(&self) -> bool {
        matches!(self, SettingKind::Password | SettingKind::Hidden)
    }

    /// Convert a raw string (environment, command line) into a typed value
    pub fn coerce(&self, raw: &str) -> Value {
        match self {
            SettingKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" | "on" | "t" => Value::Bool(true),
                "false" | "0" | "no" | "n" | "off" | "f" | "" => Value::Bool(false),
                _ => Value::String(raw.to_string()),
            },
            SettingKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            _ => Value::String(raw.to_string()),
        }
    }

    /// Check that `value` is acceptable for a setting of this kind
    pub fn validate(
        &self,
        setting: &str,
        value: &Value,
        options: &[SettingOption],
    ) -> PluginResult<()> {
        let invalid = |reason: String| PluginError::InvalidValue {
            setting: setting.to_string(),
            reason,
        };

        if value.is_null() {
            return Err(invalid("value is null".to_string()));
        }

        match self {
            SettingKind::Boolean if !value.is_bool() => {
                Err(invalid("expected a boolean".to_string()))
            }
            SettingKind::Integer if !(value.is_i64() || value.is_u64()) => {
                Err(invalid("expected an integer".to_string()))
            }
            SettingKind::Date => match value.as_str() {
                Some(s) if parse_date(s) => Ok(()),
                _ => Err(invalid(
                    "expected a date (YYYY-MM-DD or RFC 3339)".to_string(),
                )),
            },
            SettingKind::Options => {
                if options.iter().any(|option| &option.value == value) {
                    Ok(())
                } else {
                    let allowed: Vec<String> = options
                        .iter()
                        .map(|option| display_value(&option.value))
                        .collect();
                    Err(invalid(format!("expected one of: {}", allowed.join(", "))))
                }
            }
            _ => Ok(()),
        }
    }
}

fn parse_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// One allowed value of an `options` setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub value: Value,
}

/// A setting declared in a plugin's schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDefinition {
    /// Setting name, unique within the plugin
    pub name: String,

    #[serde(default)]
    pub kind: SettingKind,

    /// Declared default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Pinned values set through the project are not overridden by the environment
    #[serde(default, skip_serializing_if = "is_false")]
    pub protected: bool,

    /// Must resolve to a value before the plugin can be invoked
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    /// Custom environment variable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Allowed values for `kind: options`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SettingOption>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SettingDefinition {
    /// Declare a plain string setting without a default
    pub fn new(name: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: None,
            protected: false,
            required: false,
            env: None,
            label: None,
            description: None,
            options: Vec::new(),
        }
    }

    /// Set the declared default value
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Environment variable that overrides this setting for `plugin_name`
    pub fn env_var(&self, plugin_name: &str) -> String {
        match &self.env {
            Some(env) => env.clone(),
            None => env_var_name(&[plugin_name, &self.name]),
        }
    }

    /// Validate a candidate value against this definition
    pub fn validate(&self, value: &Value) -> PluginResult<()> {
        self.kind.validate(&self.name, value, &self.options)
    }
}

/// Derive an environment variable name from its parts
///
/// Parts are joined with `_`, upper-cased, and every character that is not
/// ASCII alphanumeric becomes `_`.
pub fn env_var_name(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| {
            part.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("_")
}
