use super::ImportMapError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Specifier (or specifier prefix) to target URL/path.
pub type SpecifierMap = BTreeMap<String, String>;

/// Parsed import map: `{ "imports": {..}, "scopes": { scope: {..} } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMap {
    #[serde(default)]
    pub imports: SpecifierMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scopes: BTreeMap<String, SpecifierMap>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert into the top-level `imports` table.
    pub fn with_import(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.imports.insert(key.into(), target.into());
        self
    }

    /// Builder-style insert into the `scopes` table.
    pub fn with_scoped_import(
        mut self,
        scope: impl Into<String>,
        key: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.scopes
            .entry(scope.into())
            .or_default()
            .insert(key.into(), target.into());
        self
    }

    /// Top-level target for `key`, if mapped verbatim.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.imports.get(key).map(String::as_str)
    }

    /// Return a new map where every entry of `overrides` replaces the
    /// corresponding entry of `self`. Scopes are merged key by key.
    pub fn merge(&self, overrides: &ImportMap) -> ImportMap {
        let mut merged = self.clone();
        for (key, target) in &overrides.imports {
            merged.imports.insert(key.clone(), target.clone());
        }
        for (scope, table) in &overrides.scopes {
            let entry = merged.scopes.entry(scope.clone()).or_default();
            for (key, target) in table {
                entry.insert(key.clone(), target.clone());
            }
        }
        merged
    }

    /// Check the shape rules resolution relies on.
    pub fn validate(&self) -> Result<(), ImportMapError> {
        validate_table(&self.imports, None)?;
        for (scope, table) in &self.scopes {
            if scope.is_empty() {
                return Err(ImportMapError::EmptyScope);
            }
            validate_table(table, Some(scope))?;
        }
        Ok(())
    }
}

fn validate_table(table: &SpecifierMap, scope: Option<&String>) -> Result<(), ImportMapError> {
    for (key, target) in table {
        if key.is_empty() {
            return Err(ImportMapError::EmptyKey {
                scope: scope.cloned(),
            });
        }
        if key.ends_with('/') && !target.ends_with('/') {
            return Err(ImportMapError::InvalidPrefixTarget {
                key: key.clone(),
                target: target.clone(),
            });
        }
    }
    Ok(())
}

/// Outcome of one resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpecifier {
    /// Specifier as written by the referencing module
    pub specifier: String,
    /// URL of the referencing module
    pub referrer: Url,
    /// Resolved absolute URL, `None` when the specifier could not be resolved
    /// even as a relative reference
    pub resolved: Option<Url>,
}

impl ResolvedSpecifier {
    pub fn href(&self) -> Option<&str> {
        self.resolved.as_ref().map(Url::as_str)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_shape() {
        let map: ImportMap = serde_json::from_str(
            r##"{
                "imports": { "react": "https://esm.sh/react", "#/": "./src/" },
                "scopes": { "https://deno.land/x/ultra/": { "ultra/root.tsx": "./src/root.tsx" } }
            }"##,
        )
        .unwrap();
        assert_eq!(map.get("react"), Some("https://esm.sh/react"));
        assert_eq!(map.scopes.len(), 1);
        assert!(map.validate().is_ok());
    }

    #[test]
    fn test_scopes_optional() {
        let map: ImportMap = serde_json::from_str(r#"{ "imports": {} }"#).unwrap();
        assert!(map.scopes.is_empty());
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"imports":{}}"#);
    }

    #[test]
    fn test_merge_overrides_win() {
        let base = ImportMap::new()
            .with_import("react", "https://esm.sh/react@17")
            .with_import("wouter", "https://esm.sh/wouter")
            .with_scoped_import("https://a/", "x", "./a.js");
        let user = ImportMap::new()
            .with_import("react", "https://esm.sh/react@18")
            .with_scoped_import("https://a/", "y", "./b.js");
        let merged = base.merge(&user);
        assert_eq!(merged.get("react"), Some("https://esm.sh/react@18"));
        assert_eq!(merged.get("wouter"), Some("https://esm.sh/wouter"));
        assert_eq!(merged.scopes["https://a/"].len(), 2);
        // inputs untouched
        assert_eq!(base.get("react"), Some("https://esm.sh/react@17"));
    }

    #[test]
    fn test_validate_prefix_target() {
        let map = ImportMap::new().with_import("fmt/", "https://deno.land/std/fmt");
        assert_eq!(
            map.validate(),
            Err(ImportMapError::InvalidPrefixTarget {
                key: "fmt/".to_string(),
                target: "https://deno.land/std/fmt".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_empty_keys() {
        let map = ImportMap::new().with_scoped_import("https://a/", "", "./x.js");
        assert_eq!(
            map.validate(),
            Err(ImportMapError::EmptyKey {
                scope: Some("https://a/".to_string())
            })
        );
        let map = ImportMap::new().with_scoped_import("", "x", "./x.js");
        assert_eq!(map.validate(), Err(ImportMapError::EmptyScope));
    }
}
