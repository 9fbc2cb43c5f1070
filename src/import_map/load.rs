use super::types::ImportMap;
use anyhow::Context;
use std::path::Path;
use tracing::debug;

/// Parse and validate an import map from JSON text.
pub fn parse_import_map(content: &str) -> anyhow::Result<ImportMap> {
    let map: ImportMap = serde_json::from_str(content).context("import map is not valid JSON")?;
    map.validate()?;
    Ok(map)
}

/// Read, parse and validate an import map file.
pub fn load_import_map<P: AsRef<Path>>(path: P) -> anyhow::Result<ImportMap> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read import map {}", path.display()))?;
    let map = parse_import_map(&content)
        .with_context(|| format!("failed to load import map {}", path.display()))?;
    debug!(
        path = %path.display(),
        imports = map.imports.len(),
        scopes = map.scopes.len(),
        "Import map loaded"
    );
    Ok(map)
}

/// Load several import maps and merge them in order; later files win.
pub fn load_merged_import_maps<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<ImportMap> {
    let mut merged = ImportMap::new();
    for path in paths {
        merged = merged.merge(&load_import_map(path)?);
    }
    Ok(merged)
}

/// Serialize `map` as pretty JSON and write it to `path`.
pub fn write_import_map<P: AsRef<Path>>(path: P, map: &ImportMap) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(map).context("failed to serialize import map")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write import map {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_invalid_prefix() {
        let err = parse_import_map(r#"{ "imports": { "fmt/": "https://deno.land/std/fmt" } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("fmt/"));
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        assert!(parse_import_map("{ imports: }").is_err());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importMap.json");
        let map = ImportMap::new()
            .with_import("react", "https://esm.sh/react")
            .with_scoped_import("https://deno.land/x/ultra/", "ultra/root.tsx", "./src/root.tsx");
        write_import_map(&path, &map).unwrap();
        assert_eq!(load_import_map(&path).unwrap(), map);
    }

    #[test]
    fn test_load_merged_later_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, r#"{ "imports": { "react": "./x/react.js", "app": "./src/app.tsx" } }"#)
            .unwrap();
        std::fs::write(&b, r#"{ "imports": { "react": "https://esm.sh/react" } }"#).unwrap();
        let merged = load_merged_import_maps(&[a, b]).unwrap();
        assert_eq!(merged.get("react"), Some("https://esm.sh/react"));
        assert_eq!(merged.get("app"), Some("./src/app.tsx"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_import_map("/definitely/not/here/importMap.json").unwrap_err();
        assert!(err.to_string().contains("failed to read import map"));
    }
}
