//! HTML framing around the rendered body.
//!
//! The head carries the doctype, the `lang` attribute, collected head tags and
//! a module script that imports the client runtime from the same import map the
//! server rendered with, then hydrates the root element. The tail carries the
//! serialized data cache so the client can resume without re-fetching.

use super::context::{DataCache, Helmet};
use super::error::RenderError;
use crate::config::UltraConfig;
use crate::import_map::ImportMap;
use crate::url_utils::{is_remote_source, jsify};
use minijinja::{context, Environment};
use serde::Serialize;
use tracing::warn;
use url::Url;

const HEAD_TEMPLATE: &str = concat!(
    r#"<!DOCTYPE html><html lang="{{ lang }}"><head>{{ head_tags }}"#,
    r#"<script type="module" defer>{{ dev_socket }}"#,
    r#"{% for dep in deps %}import { {{ dep.binding }} } from "{{ dep.href }}";{% endfor %}"#,
    r#"import App from "/{{ app }}";"#,
    r#"const root = hydrateRoot(document.getElementById("{{ root_id }}"),"#,
    r#"createElement(Router, null, createElement(HelmetProvider, null, createElement(App))))"#,
    r#"</script></head><body><div id="{{ root_id }}">"#,
);

const TAIL_TEMPLATE: &str =
    r#"</div></body><script>self.__ultra = {{ cache }}</script></html>"#;

/// A runtime binding the hydration script imports, e.g. `hydrateRoot` from `react-dom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationImport {
    pub binding: String,
    pub specifier: String,
}

impl HydrationImport {
    pub fn new(binding: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            specifier: specifier.into(),
        }
    }
}

/// The runtime set the default composition needs on the client.
pub fn default_hydration_imports() -> Vec<HydrationImport> {
    vec![
        HydrationImport::new("createElement", "react"),
        HydrationImport::new("hydrateRoot", "react-dom"),
        HydrationImport::new("Router", "wouter"),
        HydrationImport::new("HelmetProvider", "react-helmet"),
    ]
}

#[derive(Serialize)]
struct ClientImport<'a> {
    binding: &'a str,
    href: String,
}

/// Compiled head/tail templates plus the settings they need.
pub struct DocumentShell {
    env: Environment<'static>,
    imports: Vec<HydrationImport>,
    root_id: String,
    source_dir: String,
    build_dir: String,
    dev: bool,
}

impl DocumentShell {
    pub fn new(config: &UltraConfig) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template("head", HEAD_TEMPLATE)?;
        env.add_template("tail", TAIL_TEMPLATE)?;
        Ok(Self {
            env,
            imports: default_hydration_imports(),
            root_id: "ultra".to_string(),
            source_dir: config.source_dir.clone(),
            build_dir: config.build_dir.clone(),
            dev: config.dev,
        })
    }

    pub fn with_imports(mut self, imports: Vec<HydrationImport>) -> Self {
        self.imports = imports;
        self
    }

    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    /// Document head up to and including the opening root element.
    ///
    /// `root` is the public origin; in dev mode the live-reload socket connects to it.
    pub fn head(
        &self,
        lang: &str,
        root: &Url,
        import_map: &ImportMap,
        helmet: &Helmet,
    ) -> Result<String, RenderError> {
        let deps: Vec<ClientImport<'_>> = self
            .imports
            .iter()
            .map(|import| ClientImport {
                binding: &import.binding,
                href: match import_map.get(&import.specifier) {
                    Some(target) => client_href(target, &self.build_dir),
                    None => {
                        warn!(specifier = %import.specifier, "Hydration import missing from import map");
                        import.specifier.clone()
                    }
                },
            })
            .collect();
        let dev_socket = if self.dev { socket_script(root) } else { String::new() };
        let head = self.env.get_template("head")?.render(context! {
            lang => lang,
            head_tags => helmet.to_markup(),
            dev_socket => dev_socket,
            deps => deps,
            app => transpiled_app(import_map, &self.source_dir),
            root_id => self.root_id.as_str(),
        })?;
        Ok(head)
    }

    pub fn tail(&self, cache: &DataCache) -> Result<String, RenderError> {
        let json = serde_json::to_string(&cache.to_json())
            .map_err(|e| RenderError::Document(e.to_string()))?;
        let tail = self
            .env
            .get_template("tail")?
            .render(context! { cache => escape_script_json(&json) })?;
        Ok(tail)
    }
}

/// Client-side href for an import map target: remote URLs as-is, local paths
/// made root-relative with the build output directory removed.
pub fn client_href(target: &str, build_dir: &str) -> String {
    if is_remote_source(target) {
        return target.to_string();
    }
    let build_dir = build_dir.trim_start_matches("./").trim_matches('/');
    let rest = target.trim_start_matches("./").trim_start_matches('/');
    let rest = rest
        .strip_prefix(build_dir)
        .and_then(|r| r.strip_prefix('/'))
        .unwrap_or(rest);
    format!("/{rest}")
}

/// Path of the transpiled app module, relative to the site root.
///
/// `./src/app.tsx` with source dir `src` becomes `app.js`.
pub fn transpiled_app(import_map: &ImportMap, source_dir: &str) -> String {
    let app = import_map.get("app").unwrap_or("app.js");
    let prefix = format!("./{}/", source_dir.trim_matches('/'));
    let app = app.strip_prefix(prefix.as_str()).unwrap_or(app);
    jsify(app.trim_start_matches("./"))
}

fn socket_script(root: &Url) -> String {
    let host = match (root.host_str(), root.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => "localhost".to_string(),
    };
    format!(
        "const _ultra_socket = new WebSocket(\"ws://{host}/_ultra_socket\");\
         _ultra_socket.addEventListener(\"message\", (e) => {{\
         if (e.data === \"reload\") {{ location.reload(); }}\
         }});"
    )
}

/// Keep serialized JSON from terminating the surrounding `<script>`.
fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
}
