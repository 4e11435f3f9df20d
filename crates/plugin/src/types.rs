//! Plugin types, transform modes and config formats

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PluginError;

/// Kind of plugin; also the bucket key in project and catalog files
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PluginType {
    #[default]
    #[serde(rename = "extractors")]
    Extractor,

    #[serde(rename = "loaders")]
    Loader,

    #[serde(rename = "transforms")]
    Transform,

    #[serde(rename = "models")]
    Model,

    #[serde(rename = "dashboards")]
    Dashboard,

    #[serde(rename = "orchestrators")]
    Orchestrator,

    #[serde(rename = "transformers")]
    Transformer,
}

impl PluginType {
    /// Every plugin type, in bucket order
    pub const ALL: [PluginType; 7] = [
        PluginType::Extractor,
        PluginType::Loader,
        PluginType::Transform,
        PluginType::Model,
        PluginType::Dashboard,
        PluginType::Orchestrator,
        PluginType::Transformer,
    ];

    /// Plural form, as used for bucket keys
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Extractor => "extractors",
            PluginType::Loader => "loaders",
            PluginType::Transform => "transforms",
            PluginType::Model => "models",
            PluginType::Dashboard => "dashboards",
            PluginType::Orchestrator => "orchestrators",
            PluginType::Transformer => "transformers",
        }
    }

    /// Singular form, as used in messages
    pub fn descriptor(&self) -> &'static str {
        match self {
            PluginType::Extractor => "extractor",
            PluginType::Loader => "loader",
            PluginType::Transform => "transform",
            PluginType::Model => "model",
            PluginType::Dashboard => "dashboard",
            PluginType::Orchestrator => "orchestrator",
            PluginType::Transformer => "transformer",
        }
    }

    /// Default serialization format for settings handed to this kind of plugin
    pub fn default_config_format(&self) -> ConfigFormat {
        match self {
            PluginType::Extractor | PluginType::Loader => ConfigFormat::Json,
            _ => ConfigFormat::Env,
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = PluginError;

    /// Accepts both the singular and the plural form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        PluginType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered || t.descriptor() == lowered)
            .ok_or_else(|| PluginError::UnknownPluginType(s.to_string()))
    }
}

/// How a pipeline treats the transform step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Transform after loading when a transform package exists
    Run,

    /// Never transform
    #[default]
    Skip,

    /// Transform only; the transform step is mandatory
    Only,
}

impl TransformMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Run => "run",
            TransformMode::Skip => "skip",
            TransformMode::Only => "only",
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformMode {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" => Ok(TransformMode::Run),
            "skip" => Ok(TransformMode::Skip),
            "only" => Ok(TransformMode::Only),
            _ => Err(PluginError::UnknownTransformMode(s.to_string())),
        }
    }
}

/// Format in which resolved settings are handed to a plugin process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// A JSON config file passed with `--config`
    Json,

    /// A YAML config file passed with `--config`
    Yaml,

    /// Environment variables only
    Env,
}

impl ConfigFormat {
    /// File extension of the generated config file, if any
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ConfigFormat::Json => Some("json"),
            ConfigFormat::Yaml => Some("yml"),
            ConfigFormat::Env => None,
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "env" => Ok(ConfigFormat::Env),
            _ => Err(PluginError::UnknownConfigFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_type_parsing() {
        assert_eq!("extractor".parse::<PluginType>().unwrap(), PluginType::Extractor);
        assert_eq!("loaders".parse::<PluginType>().unwrap(), PluginType::Loader);
        assert_eq!("Transformer".parse::<PluginType>().unwrap(), PluginType::Transformer);
        assert!("widget".parse::<PluginType>().is_err());
    }

    #[test]
    fn test_plugin_type_bucket_key() {
        let yaml = serde_yaml::to_string(&PluginType::Orchestrator).unwrap();
        assert_eq!(yaml.trim(), "orchestrators");
    }

    #[test]
    fn test_transform_mode() {
        assert_eq!("ONLY".parse::<TransformMode>().unwrap(), TransformMode::Only);
        assert_eq!(TransformMode::default(), TransformMode::Skip);
        assert!("sometimes".parse::<TransformMode>().is_err());
    }

    #[test]
    fn test_default_config_format() {
        assert_eq!(PluginType::Extractor.default_config_format(), ConfigFormat::Json);
        assert_eq!(PluginType::Transformer.default_config_format(), ConfigFormat::Env);
        assert_eq!(ConfigFormat::Env.extension(), None);
    }
}
