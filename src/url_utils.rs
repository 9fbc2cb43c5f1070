//! # URL Utilities
//!
//! Pure helpers shared by the resolver, the build pass and the HTTP router:
//!
//! - **Classification** - [`is_valid_url`], [`is_remote_source`], [`is_vendor_source`]
//! - **Path rewriting** - [`replace_file_ext`] and the `jsify`/`tsify`/`jsxify`/`tsxify` shorthands
//! - **Normalisation** - [`strip_trailing_slash`]
//! - **Cache keys** - [`hash_file`], a SHA-256 digest of a specifier with its query string removed
//!
//! None of these functions touch the filesystem except [`resolve_file_url`], which
//! needs the current working directory.

use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};
use url::Url;

/// Directory the build pass writes deployable output into.
pub const BUILD_DIR: &str = ".ultra";

/// Returns `true` when `url` parses as an absolute URL on its own.
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Returns `true` for absolute `http:` or `https:` URLs.
///
/// `file:` URLs are absolute but local, so they are not remote.
pub fn is_remote_source(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Returns `true` when `path` points into the vendor directory.
///
/// Accepts request paths (`/x/react.js`), project paths (`./x/react.js`) and
/// build output paths (`./.ultra/x/react.js`).
pub fn is_vendor_source(path: &str, vendor_dir: &str) -> bool {
    let vendor_dir = vendor_dir.trim_matches('/');
    if vendor_dir.is_empty() {
        return false;
    }
    let mut rest = path.trim_start_matches("./").trim_start_matches('/');
    if let Some(stripped) = rest.strip_prefix(BUILD_DIR) {
        rest = stripped.trim_start_matches('/');
    }
    rest.strip_prefix(vendor_dir)
        .is_some_and(|tail| tail.starts_with('/') && tail.len() > 1)
}

/// Replace the final extension of `path` with `new_ext`.
///
/// A path without an extension gets `new_ext` appended, after any trailing
/// `.` has been removed. Dotfiles such as `.env` count as extensionless.
pub fn replace_file_ext(path: &str, new_ext: &str) -> String {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    let stem_end = match name.rfind('.') {
        Some(idx) if idx > 0 => name_start + idx,
        _ => path.len(),
    };
    let stem = path[..stem_end].trim_end_matches('.');
    format!("{stem}{new_ext}")
}

pub fn jsify(path: &str) -> String {
    replace_file_ext(path, ".js")
}

pub fn tsify(path: &str) -> String {
    replace_file_ext(path, ".ts")
}

pub fn jsxify(path: &str) -> String {
    replace_file_ext(path, ".jsx")
}

pub fn tsxify(path: &str) -> String {
    replace_file_ext(path, ".tsx")
}

/// Remove a single trailing `/`. Idempotent on already-stripped input.
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Hex SHA-256 digest of `url`, ignoring everything from the first `?`.
///
/// Used as a cache key for remote modules, so cache-busting query parameters
/// never produce a second copy of the same file.
pub fn hash_file(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    let digest = Sha256::digest(without_query.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// `file://` URL for `<cwd>/<dir>/<file>`.
pub fn resolve_file_url(dir: &str, file: &str) -> anyhow::Result<Url> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let path = cwd.join(dir).join(file);
    Url::from_file_path(&path).map_err(|_| anyhow!("not an absolute path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_file_known_digest() {
        assert_eq!(
            hash_file("https://esm.sh/react"),
            "8ca2952001a498bd682ddd3c98f70920ce4fdaa3b326d23d5d66a6d338c6efdd"
        );
    }

    #[test]
    fn test_hash_file_ignores_query() {
        let base = "https://esm.sh/react@18.2.0";
        assert_eq!(hash_file(&format!("{base}?dev")), hash_file(base));
        assert_eq!(hash_file(&format!("{base}?v=1&target=es2022")), hash_file(base));
        assert_eq!(hash_file(base).len(), 64);
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://ultrajs.dev"));
        assert!(!is_valid_url("./app.jsx"));
        assert!(!is_valid_url("react"));
    }

    #[test]
    fn test_is_vendor_source() {
        assert!(is_vendor_source("./.ultra/x/react.js", "x"));
        assert!(is_vendor_source("/x/react.js", "x"));
        assert!(!is_vendor_source("./components/Heading.jsx", "x"));
        assert!(!is_vendor_source("/xylophone.js", "x"));
        assert!(!is_vendor_source("/x/", "x"));
    }

    #[test]
    fn test_is_remote_source() {
        assert!(is_remote_source("https://deno.land/x/foo"));
        assert!(is_remote_source("http://example.com"));
        assert!(!is_remote_source("file:///path/to/Heading.jsx"));
        assert!(!is_remote_source("./app.tsx"));
    }

    #[test]
    fn test_replace_file_ext() {
        assert_eq!(replace_file_ext("app.jsx", ".ts"), "app.ts");
        assert_eq!(replace_file_ext("./app.jsx", ".js"), "./app.js");
        assert_eq!(replace_file_ext("./app.js", ".jsx"), "./app.jsx");
        assert_eq!(replace_file_ext("./app.jsx", ".tsx"), "./app.tsx");
        assert_eq!(replace_file_ext("app", ".ts"), "app.ts");
        assert_eq!(replace_file_ext("app.", ".ts"), "app.ts");
        assert_eq!(replace_file_ext("/foo/bar/baz/app.js", ".ts"), "/foo/bar/baz/app.ts");
        assert_eq!(replace_file_ext("./.ultra/x/react", ".js"), "./.ultra/x/react.js");
    }

    #[test]
    fn test_ext_shorthands() {
        assert_eq!(jsify("src/app.tsx"), "src/app.js");
        assert_eq!(tsify("src/app.jsx"), "src/app.ts");
        assert_eq!(jsxify("src/app.js"), "src/app.jsx");
        assert_eq!(tsxify("src/app.ts"), "src/app.tsx");
    }

    #[test]
    fn test_strip_trailing_slash() {
        assert_eq!(strip_trailing_slash("https://ultrajs.dev/"), "https://ultrajs.dev");
        assert_eq!(strip_trailing_slash("https://x.dev/"), "https://x.dev");
        assert_eq!(strip_trailing_slash("https://x.dev"), "https://x.dev");
    }

    #[test]
    fn test_resolve_file_url() {
        let url = resolve_file_url("foo", "bar").unwrap();
        assert!(url.as_str().ends_with("/foo/bar"));
        assert!(url.as_str().starts_with("file:///"));
    }
}
