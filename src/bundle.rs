//! # Build Pass
//!
//! Prepares the deployable output directory for a project:
//!
//! 1. the vendor import map becomes the deploy map (local targets `.js`)
//! 2. every file under the source directory is classified: modules
//!    (`.js`, `.jsx`, `.ts`, `.tsx`) are planned for transpilation with an
//!    import map localized to their directory depth, everything else is copied
//! 3. `importMap.json` (deploy map) and `server.importMap.json` (targets
//!    relative to the build root) are written into the build directory
//!
//! Transpiling the planned modules is left to an external tool; the plan
//! carries everything it needs (output path, localized map, relative prefix).

use crate::config::UltraConfig;
use crate::import_map::derive::{localized_map, relative_prefix, server_map, vendor_deploy_map};
use crate::import_map::{write_import_map as write_map_file, ImportMap};
use crate::url_utils::jsify;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const IMPORT_MAP_FILE: &str = "importMap.json";
pub const SERVER_IMPORT_MAP_FILE: &str = "server.importMap.json";

const MODULE_EXTENSIONS: [&str; 4] = ["js", "jsx", "ts", "tsx"];

/// A source module and the rewritten import map it should be compiled with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedModule {
    /// Project-relative source path, e.g. `src/app.tsx`
    pub source: String,
    /// Build-relative output path, e.g. `src/app.js`
    pub output: String,
    pub relative_prefix: String,
    pub import_map: ImportMap,
}

/// A file copied into the build directory unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCopy {
    pub source: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildPlan {
    pub deploy_map: ImportMap,
    pub server_map: ImportMap,
    pub modules: Vec<PlannedModule>,
    pub copies: Vec<PlannedCopy>,
}

/// Project-relative paths of every file under `dir`, sorted.
///
/// Symlinks are not followed, so a link pointing back up the tree is never
/// walked twice; links themselves are skipped.
pub fn scan_dir(project_dir: &Path, dir: &str) -> anyhow::Result<Vec<String>> {
    let root = project_dir.join(dir);
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(project_dir) {
            let relative: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            found.push(relative.join("/"));
        }
    }
    found.sort();
    Ok(found)
}

pub fn is_module(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}

/// Compute the build plan for `files` (project-relative paths).
pub fn plan(config: &UltraConfig, vendor_map: &ImportMap, files: &[String]) -> BuildPlan {
    let deploy_map = vendor_deploy_map(vendor_map);
    let mut modules = Vec::new();
    let mut copies = Vec::new();
    for file in files {
        if is_module(file) {
            modules.push(PlannedModule {
                source: file.clone(),
                output: jsify(file),
                relative_prefix: relative_prefix(file),
                import_map: localized_map(&deploy_map, file, &config.build_dir),
            });
        } else {
            copies.push(PlannedCopy {
                source: file.clone(),
                output: file.clone(),
            });
        }
    }
    BuildPlan {
        server_map: server_map(&deploy_map, &config.build_dir),
        deploy_map,
        modules,
        copies,
    }
}

/// Write `map` as `importMap.json` inside `dir`.
pub fn write_import_map(dir: &Path, map: &ImportMap) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(IMPORT_MAP_FILE);
    write_map_file(&path, map)?;
    Ok(path)
}

/// Run the build pass for the project at `project_dir`.
///
/// Empties the build directory, copies non-module sources and writes both
/// import maps. Returns the plan so the caller can hand modules to a
/// transpiler.
pub fn build(config: &UltraConfig, project_dir: &Path, vendor_map: &ImportMap) -> anyhow::Result<BuildPlan> {
    let build_dir = project_dir.join(&config.build_dir);
    if build_dir.exists() {
        fs::remove_dir_all(&build_dir)
            .with_context(|| format!("failed to empty {}", build_dir.display()))?;
    }
    fs::create_dir_all(build_dir.join(&config.source_dir))?;
    fs::create_dir_all(build_dir.join(&config.vendor_dir))?;

    let files = scan_dir(project_dir, &config.source_dir)?;
    let plan = plan(config, vendor_map, &files);

    for copy in &plan.copies {
        let target = build_dir.join(&copy.output);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(project_dir.join(&copy.source), &target)
            .with_context(|| format!("failed to copy {}", copy.source))?;
        debug!(source = %copy.source, "Copied static asset");
    }

    write_import_map(&build_dir, &plan.deploy_map)?;
    write_map_file(build_dir.join(SERVER_IMPORT_MAP_FILE), &plan.server_map)?;

    info!(
        build_dir = %build_dir.display(),
        modules = plan.modules.len(),
        copies = plan.copies.len(),
        "Build complete"
    );
    Ok(plan)
}
