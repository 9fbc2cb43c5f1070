use crate::config::UltraConfig;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// `cache-control` sent with vendored modules. Their paths change whenever
/// their content does, so they can be cached for a week.
pub const VENDOR_CACHE_CONTROL: &str =
    "public, max-age=604800, stale-while-revalidate=86400, stale-if-error=259200";

const JAVASCRIPT: &str = "text/javascript";

/// A file ready to be written to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAsset {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub cache_control: Option<&'static str>,
}

/// Serves files from one or more directories, first match wins.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    roots: Vec<PathBuf>,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            roots: vec![base.into()],
        }
    }

    /// Build output first, then sources. The project root itself is never a
    /// root, so dotfiles and config next to the sources stay private.
    pub fn for_project(project_dir: &Path, config: &UltraConfig) -> Self {
        Self::new(project_dir.join(&config.build_dir)).with_root(project_dir.join(&config.source_dir))
    }

    /// Add a fallback directory searched after the existing ones.
    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn map_path(base: &Path, url_path: &str) -> Option<PathBuf> {
        let mut pb = base.to_path_buf();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// First existing file for `url_path` across the roots.
    pub fn find(&self, url_path: &str) -> Option<PathBuf> {
        let url_path = url_path.split(['?', '#']).next().unwrap_or(url_path);
        if url_path.trim_start_matches('/').is_empty() {
            return None;
        }
        self.roots
            .iter()
            .filter_map(|root| Self::map_path(root, url_path))
            .find(|path| path.is_file())
    }

    pub fn content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|s| s.to_str()).unwrap_or("").to_lowercase().as_str() {
            "html" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" | "mjs" => JAVASCRIPT,
            "json" | "map" => "application/json",
            "txt" => "text/plain",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "webp" => "image/webp",
            "woff2" => "font/woff2",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
    }

    /// Load a source asset with the content type of its extension.
    pub fn load(&self, url_path: &str) -> io::Result<StaticAsset> {
        let path = self
            .find(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))?;
        Ok(StaticAsset {
            bytes: fs::read(&path)?,
            content_type: Self::content_type(&path),
            cache_control: None,
        })
    }

    /// Load a vendored module: always JavaScript, long-lived cache headers.
    pub fn load_vendor(&self, url_path: &str) -> io::Result<StaticAsset> {
        let path = self
            .find(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "vendor module not found"))?;
        Ok(StaticAsset {
            bytes: fs::read(&path)?,
            content_type: JAVASCRIPT,
            cache_control: Some(VENDOR_CACHE_CONTROL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build/x")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("build/x/react.js"), "export default 1;").unwrap();
        fs::write(dir.path().join("src/style.css"), "body{}").unwrap();
        fs::write(dir.path().join("build/style.css"), "/* built */").unwrap();
        fs::write(dir.path().join("src/hello.txt"), "Hello\n").unwrap();
        dir
    }

    #[test]
    fn test_map_path_prevents_traversal() {
        let base = Path::new("tests/staticdata");
        assert!(StaticFiles::map_path(base, "../Cargo.toml").is_none());
        assert!(StaticFiles::map_path(base, "/a/../../Cargo.toml").is_none());
        assert!(StaticFiles::map_path(base, "./a/b.js").is_some());
    }

    #[test]
    fn test_first_root_wins() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path().join("build")).with_root(dir.path().join("src"));
        let asset = files.load("/style.css").unwrap();
        assert_eq!(asset.bytes, b"/* built */".to_vec());
        assert_eq!(asset.content_type, "text/css");
        let asset = files.load("/hello.txt?v=2").unwrap();
        assert_eq!(asset.content_type, "text/plain");
        assert_eq!(asset.cache_control, None);
    }

    #[test]
    fn test_project_root_is_not_served() {
        let dir = fixture();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        fs::write(dir.path().join("ultra.yaml"), "port: 1").unwrap();
        let config = UltraConfig {
            build_dir: "build".into(),
            source_dir: "src".into(),
            ..UltraConfig::default()
        };
        let files = StaticFiles::for_project(dir.path(), &config);
        assert!(files.find("/.env").is_none());
        assert!(files.find("/ultra.yaml").is_none());
        assert_eq!(files.load("/style.css").unwrap().bytes, b"/* built */".to_vec());
        assert!(files.find("/hello.txt").is_some());
    }

    #[test]
    fn test_vendor_headers() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path().join("build"));
        let asset = files.load_vendor("/x/react.js").unwrap();
        assert_eq!(asset.content_type, "text/javascript");
        assert_eq!(asset.cache_control, Some(VENDOR_CACHE_CONTROL));
    }

    #[test]
    fn test_missing_and_directories_are_not_found() {
        let dir = fixture();
        let files = StaticFiles::new(dir.path().join("build"));
        assert_eq!(files.load("/nope.js").unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(files.find("/x").is_none());
        assert!(files.find("/").is_none());
    }
}
