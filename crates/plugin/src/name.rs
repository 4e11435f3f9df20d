//! Plugin identity and the `name@profile` reference syntax

use std::fmt;
use std::str::FromStr;

use crate::{PluginError, PluginResult, PluginType};

/// Separator between a plugin name and a profile name
pub const PROFILE_SEPARATOR: char = '@';

/// Name of the implicit profile every plugin has
pub const DEFAULT_PROFILE: &str = "default";

/// Identity of a plugin within a project
///
/// Two refs are equal iff their type and name match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginRef {
    pub plugin_type: PluginType,
    pub name: String,
}

impl PluginRef {
    pub fn new(plugin_type: PluginType, name: impl Into<String>) -> Self {
        Self {
            plugin_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.plugin_type.descriptor(), self.name)
    }
}

/// A plugin name optionally qualified with a profile (`tap-gitlab@prod`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginName {
    name: String,
    profile: Option<String>,
}

impl PluginName {
    /// Parse a plugin reference
    ///
    /// `name` selects the default profile, `name@profile` a named one.
    /// `name@default` is accepted and normalized to the bare form.
    pub fn parse(input: &str) -> PluginResult<Self> {
        let invalid = |reason: &str| PluginError::InvalidName {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace is not allowed"));
        }

        let mut parts = input.split(PROFILE_SEPARATOR);
        let name = parts.next().unwrap_or_default();
        let profile = parts.next();

        if parts.next().is_some() {
            return Err(invalid("more than one profile separator"));
        }
        if name.is_empty() {
            return Err(invalid("plugin name is empty"));
        }

        let profile = match profile {
            Some("") => return Err(invalid("profile name is empty")),
            Some(DEFAULT_PROFILE) | None => None,
            Some(profile) => Some(profile.to_string()),
        };

        Ok(Self {
            name: name.to_string(),
            profile,
        })
    }

    /// Build a reference from its parts
    pub fn new(name: impl Into<String>, profile: Option<&str>) -> Self {
        Self {
            name: name.into(),
            profile: profile
                .filter(|p| *p != DEFAULT_PROFILE)
                .map(str::to_string),
        }
    }

    /// Bare plugin name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selected profile name, `default` when none was given
    pub fn profile_name(&self) -> &str {
        self.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    pub fn is_default_profile(&self) -> bool {
        self.profile.is_none()
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.profile {
            Some(profile) => write!(f, "{}{}{}", self.name, PROFILE_SEPARATOR, profile),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for PluginName {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tap-gitlab")]
    #[case("tap-gitlab@prod")]
    #[case("target_postgres@staging-eu")]
    #[case("dbt@ci")]
    fn test_name_round_trip(#[case] input: &str) {
        let parsed = PluginName::parse(input).unwrap();
        assert_eq!(parsed.to_string(), input);
    }

    #[test]
    fn test_default_profile_normalizes_to_bare_form() {
        let parsed = PluginName::parse("tap-mock@default").unwrap();
        assert_eq!(parsed.name(), "tap-mock");
        assert_eq!(parsed.profile_name(), DEFAULT_PROFILE);
        assert!(parsed.is_default_profile());
        assert_eq!(parsed.to_string(), "tap-mock");
    }

    #[test]
    fn test_parse_parts() {
        let parsed = PluginName::parse("tap-mock@prod").unwrap();
        assert_eq!(parsed.name(), "tap-mock");
        assert_eq!(parsed.profile_name(), "prod");
        assert!(!parsed.is_default_profile());
    }

    #[rstest]
    #[case("")]
    #[case("@prod")]
    #[case("tap-mock@")]
    #[case("tap@a@b")]
    #[case("tap mock")]
    fn test_invalid_names(#[case] input: &str) {
        assert!(matches!(
            PluginName::parse(input),
            Err(PluginError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_plugin_ref_equality() {
        let a = PluginRef::new(PluginType::Extractor, "tap-mock");
        let b = PluginRef::new(PluginType::Extractor, "tap-mock");
        let c = PluginRef::new(PluginType::Loader, "tap-mock");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "extractor 'tap-mock'");
    }
}
