// azure-leanix-sync/src/utils/mapping.rs
use std::collections::{BTreeMap, HashMap};

/// Static table from a resource's `project` tag value to the LeanIX application
/// display name it belongs to. Built once from configuration and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectAppMapping {
    entries: BTreeMap<String, String>,
}

impl ProjectAppMapping {
    pub fn new(entries: HashMap<String, String>) -> Self {
        ProjectAppMapping {
            entries: entries.into_iter().collect(),
        }
    }

    /// Application name for a project tag value. Tag values are matched exactly.
    pub fn resolve(&self, project_tag: &str) -> Option<&str> {
        self.entries.get(project_tag).map(String::as_str)
    }

    pub fn contains(&self, project_tag: &str) -> bool {
        self.entries.contains_key(project_tag)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for ProjectAppMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        ProjectAppMapping {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Collapses internal whitespace, trims and lowercases an application name so that
/// `" Auth0  EU "` and `"auth0 eu"` compare equal.
pub fn normalize_application_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectAppMapping {
        vec![
            ("xemay".to_string(), "Auth0-AS".to_string()),
            ("ABC".to_string(), "Auth0-EU".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_known_and_unknown_tags() {
        let mapping = sample();
        assert_eq!(mapping.resolve("xemay"), Some("Auth0-AS"));
        assert_eq!(mapping.resolve("abc"), None);
        assert_eq!(mapping.resolve("nothing"), None);
        assert_eq!(mapping.iter().count(), 2);
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_application_name(" Auth0  EU "),
            normalize_application_name("auth0 eu")
        );
        assert_eq!(normalize_application_name("Battery\tSwap\nApp"), "battery swap app");
        assert_eq!(normalize_application_name("   "), "");
    }
}
