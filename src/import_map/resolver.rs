//! Module specifier resolution against an [`ImportMap`].
//!
//! Lookup order for a `(specifier, referrer)` pair:
//!
//! 1. A specifier that already parses as an absolute URL is returned unchanged.
//! 2. Every scope whose (absolute) prefix matches the referrer is consulted,
//!    longest prefix first, then the top-level `imports` table.
//! 3. Inside a table an exact key wins; otherwise the longest key ending in `/`
//!    that prefixes the specifier wins and the remainder is appended to its target.
//! 4. Unmatched specifiers resolve relative to the referrer.
//!
//! Mapped targets that are not absolute URLs are joined onto the resolver's base
//! URL (the project root), never onto the referrer.

use super::types::{ImportMap, ResolvedSpecifier, SpecifierMap};
use std::iter;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Resolves specifiers against one immutable [`ImportMap`].
///
/// Cheap to clone; the map is shared.
#[derive(Debug, Clone)]
pub struct ImportMapResolver {
    import_map: Arc<ImportMap>,
    base_url: Url,
    /// `(absolute scope prefix, original scope key)`, longest prefix first
    scopes: Vec<(String, String)>,
}

impl ImportMapResolver {
    pub fn new(import_map: ImportMap, base_url: Url) -> Self {
        Self::from_shared(Arc::new(import_map), base_url)
    }

    pub fn from_shared(import_map: Arc<ImportMap>, base_url: Url) -> Self {
        let mut scopes: Vec<(String, String)> = import_map
            .scopes
            .keys()
            .map(|key| {
                let prefix = match Url::parse(key) {
                    Ok(url) => url.to_string(),
                    Err(_) => base_url
                        .join(key)
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| key.clone()),
                };
                (prefix, key.clone())
            })
            .collect();
        scopes.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self {
            import_map,
            base_url,
            scopes,
        }
    }

    pub fn import_map(&self) -> &ImportMap {
        &self.import_map
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `specifier` as referenced from the module at `referrer`.
    pub fn resolve(&self, specifier: &str, referrer: &Url) -> ResolvedSpecifier {
        let resolved = self.resolve_specifier(specifier, referrer);
        trace!(
            specifier,
            referrer = %referrer,
            resolved = resolved.as_ref().map(Url::as_str).unwrap_or("<unresolved>"),
            "Specifier resolved"
        );
        ResolvedSpecifier {
            specifier: specifier.to_string(),
            referrer: referrer.clone(),
            resolved,
        }
    }

    /// Resolve `specifier` using the base URL as the referrer.
    pub fn resolve_url(&self, specifier: &str) -> Option<Url> {
        self.resolve_specifier(specifier, &self.base_url)
    }

    /// Resolved href, or `specifier` itself when it cannot be resolved.
    pub fn resolve_href(&self, specifier: &str, referrer: &Url) -> String {
        match self.resolve_specifier(specifier, referrer) {
            Some(url) => url.into(),
            None => specifier.to_string(),
        }
    }

    fn resolve_specifier(&self, specifier: &str, referrer: &Url) -> Option<Url> {
        if let Ok(url) = Url::parse(specifier) {
            return Some(url);
        }
        let mapped = self
            .tables_for(referrer)
            .find_map(|table| match_specifier(table, specifier));
        match mapped {
            Some(target) => self.resolve_target(&target),
            None => referrer.join(specifier).ok(),
        }
    }

    /// Applicable scope tables, most specific first, followed by `imports`.
    fn tables_for<'a>(&'a self, referrer: &'a Url) -> impl Iterator<Item = &'a SpecifierMap> + 'a {
        let referrer = referrer.as_str();
        self.scopes
            .iter()
            .filter(move |(prefix, _)| referrer.starts_with(prefix.as_str()))
            .filter_map(|(_, key)| self.import_map.scopes.get(key))
            .chain(iter::once(&self.import_map.imports))
    }

    fn resolve_target(&self, target: &str) -> Option<Url> {
        match Url::parse(target) {
            Ok(url) => Some(url),
            Err(_) => self.base_url.join(target).ok(),
        }
    }
}

/// Best target for `specifier` in one table, with any query or fragment
/// suffix carried over. Keys are matched against the path part only.
fn match_specifier(table: &SpecifierMap, specifier: &str) -> Option<String> {
    let (path, suffix) = split_suffix(specifier);
    match_path(table, path).map(|target| format!("{target}{suffix}"))
}

/// Split `specifier` at its first `?` or `#`. A `#` at position 0 is part of
/// the specifier (`#/components/..`), not a fragment.
fn split_suffix(specifier: &str) -> (&str, &str) {
    let split = specifier
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '?' || *c == '#')
        .map(|(idx, _)| idx);
    match split {
        Some(idx) => specifier.split_at(idx),
        None => (specifier, ""),
    }
}

fn match_path(table: &SpecifierMap, specifier: &str) -> Option<String> {
    if let Some(target) = table.get(specifier) {
        return Some(target.clone());
    }
    table
        .iter()
        .filter(|(key, _)| key.ends_with('/') && specifier.starts_with(key.as_str()))
        .max_by_key(|(key, _)| key.len())
        .map(|(key, target)| format!("{target}{}", &specifier[key.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("file:///project/").unwrap()
    }

    #[test]
    fn test_absolute_specifier_passes_through() {
        let map = ImportMap::new().with_import("https://esm.sh/react", "./x/react.js");
        let resolver = ImportMapResolver::new(map, base());
        let resolved = resolver.resolve("https://esm.sh/react", &base());
        assert_eq!(resolved.href(), Some("https://esm.sh/react"));
    }

    #[test]
    fn test_exact_beats_prefix() {
        let map = ImportMap::new()
            .with_import("lib/", "https://cdn.dev/lib/")
            .with_import("lib/index.js", "https://other.dev/index.js");
        let resolver = ImportMapResolver::new(map, base());
        assert_eq!(
            resolver.resolve_href("lib/index.js", &base()),
            "https://other.dev/index.js"
        );
        assert_eq!(
            resolver.resolve_href("lib/util.js", &base()),
            "https://cdn.dev/lib/util.js"
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let map = ImportMap::new()
            .with_import("a/", "https://one.dev/")
            .with_import("a/b/", "https://two.dev/");
        let resolver = ImportMapResolver::new(map, base());
        assert_eq!(resolver.resolve_href("a/b/c.js", &base()), "https://two.dev/c.js");
        assert_eq!(resolver.resolve_href("a/c.js", &base()), "https://one.dev/c.js");
    }

    #[test]
    fn test_local_targets_are_root_relative() {
        let map = ImportMap::new().with_import("app", "./src/app.tsx");
        let resolver = ImportMapResolver::new(map, base());
        let referrer = Url::parse("file:///project/src/components/deep/x.tsx").unwrap();
        assert_eq!(resolver.resolve_href("app", &referrer), "file:///project/src/app.tsx");
    }

    #[test]
    fn test_unmatched_is_referrer_relative() {
        let resolver = ImportMapResolver::new(ImportMap::new(), base());
        let referrer = Url::parse("https://cdn.dev/pkg/lib/mod.js").unwrap();
        assert_eq!(resolver.resolve_href("./util.js", &referrer), "https://cdn.dev/pkg/lib/util.js");
        assert_eq!(resolver.resolve_href("../x.js", &referrer), "https://cdn.dev/pkg/x.js");
        assert_eq!(resolver.resolve_href("/root.js", &referrer), "https://cdn.dev/root.js");
        assert_eq!(resolver.resolve_href("bare", &referrer), "https://cdn.dev/pkg/lib/bare");
    }

    #[test]
    fn test_unresolvable_keeps_specifier() {
        let resolver = ImportMapResolver::new(ImportMap::new(), base());
        let referrer = Url::parse("data:text/javascript,export{}").unwrap();
        let resolved = resolver.resolve("./x.js", &referrer);
        assert!(!resolved.is_resolved());
        assert_eq!(resolver.resolve_href("./x.js", &referrer), "./x.js");
    }

    #[test]
    fn test_query_and_fragment_preserved() {
        let map = ImportMap::new()
            .with_import("react", "https://esm.sh/react")
            .with_import("fmt/", "https://deno.land/std/fmt/");
        let resolver = ImportMapResolver::new(map, base());
        assert_eq!(resolver.resolve_href("react?dev", &base()), "https://esm.sh/react?dev");
        assert_eq!(
            resolver.resolve_href("fmt/colors.ts?v=2#top", &base()),
            "https://deno.land/std/fmt/colors.ts?v=2#top"
        );
    }

    #[test]
    fn test_query_does_not_defeat_exact_match() {
        let map = ImportMap::new()
            .with_import("lib/", "https://a.dev/")
            .with_import("lib/x.js", "https://b.dev/x.js");
        let resolver = ImportMapResolver::new(map, base());
        assert_eq!(resolver.resolve_href("lib/x.js?v=1", &base()), "https://b.dev/x.js?v=1");
        assert_eq!(resolver.resolve_href("lib/x.js#main", &base()), "https://b.dev/x.js#main");
        assert_eq!(resolver.resolve_href("lib/y.js?v=1", &base()), "https://a.dev/y.js?v=1");
    }

    #[test]
    fn test_split_suffix_keeps_leading_hash() {
        assert_eq!(split_suffix("#/a.tsx?x"), ("#/a.tsx", "?x"));
        assert_eq!(split_suffix("react"), ("react", ""));
        assert_eq!(split_suffix("a.js#f?q"), ("a.js", "#f?q"));
    }

    #[test]
    fn test_longest_scope_wins_then_falls_back() {
        let map = ImportMap::new()
            .with_import("dep", "https://cdn.dev/dep@1.js")
            .with_import("other", "https://cdn.dev/other.js")
            .with_scoped_import("https://pkg.dev/", "dep", "https://cdn.dev/dep@2.js")
            .with_scoped_import("https://pkg.dev/inner/", "dep", "https://cdn.dev/dep@3.js")
            .with_scoped_import("https://pkg.dev/", "other", "https://cdn.dev/other@2.js");
        let resolver = ImportMapResolver::new(map, base());

        let inner = Url::parse("https://pkg.dev/inner/mod.js").unwrap();
        assert_eq!(resolver.resolve_href("dep", &inner), "https://cdn.dev/dep@3.js");
        // missing in the inner scope, present in the outer one
        assert_eq!(resolver.resolve_href("other", &inner), "https://cdn.dev/other@2.js");

        let outer = Url::parse("https://pkg.dev/mod.js").unwrap();
        assert_eq!(resolver.resolve_href("dep", &outer), "https://cdn.dev/dep@2.js");

        let unscoped = Url::parse("https://elsewhere.dev/mod.js").unwrap();
        assert_eq!(resolver.resolve_href("dep", &unscoped), "https://cdn.dev/dep@1.js");
    }

    #[test]
    fn test_relative_scope_keys_use_base() {
        let map = ImportMap::new()
            .with_import("dep", "https://cdn.dev/dep@1.js")
            .with_scoped_import("./vendor/", "dep", "https://cdn.dev/dep@2.js");
        let resolver = ImportMapResolver::new(map, base());
        let referrer = Url::parse("file:///project/vendor/mod.js").unwrap();
        assert_eq!(resolver.resolve_href("dep", &referrer), "https://cdn.dev/dep@2.js");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let map = ImportMap::new()
            .with_import("a/", "https://one.dev/")
            .with_scoped_import("https://pkg.dev/", "a/", "https://two.dev/");
        let resolver = ImportMapResolver::new(map, base());
        let referrer = Url::parse("https://pkg.dev/x.js").unwrap();
        let first = resolver.resolve("a/b.js", &referrer);
        for _ in 0..10 {
            assert_eq!(resolver.resolve("a/b.js", &referrer), first);
        }
    }
}
