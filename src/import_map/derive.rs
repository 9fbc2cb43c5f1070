//! Build-time import map derivations.
//!
//! The build pass never mutates the loaded map. Each function here takes the
//! source map by reference and returns a new [`ImportMap`] with local (non
//! remote) targets rewritten:
//!
//! - [`vendor_deploy_map`] - local module targets point at transpiled `.js` files
//! - [`localized_map`] - targets relative to one asset's directory (`./../..`)
//! - [`server_map`] - targets relative to the build output root
//!
//! Remote targets (`http:`/`https:`) are left alone by [`vendor_deploy_map`] and
//! dropped by the other two, which only feed local path rewriting.

use super::types::{ImportMap, SpecifierMap};
use crate::url_utils::{is_remote_source, jsify};

/// `./` followed by one `../` per directory segment of `asset_path`.
///
/// `src/app.tsx` lives one directory deep, so its prefix is `./../`.
pub fn relative_prefix(asset_path: &str) -> String {
    let depth = asset_path
        .trim_start_matches("./")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .count()
        .saturating_sub(1);
    let mut prefix = String::from("./");
    for _ in 0..depth {
        prefix.push_str("../");
    }
    prefix
}

/// Local module targets get a `.js` extension; prefix targets and remote
/// targets are unchanged.
pub fn vendor_deploy_map(map: &ImportMap) -> ImportMap {
    rewrite(map, true, |target| {
        if target.ends_with('/') {
            target.to_string()
        } else {
            jsify(target)
        }
    })
}

/// Local targets rewritten relative to `asset_path`, with the build output
/// directory prefix removed. Remote targets are omitted.
pub fn localized_map(map: &ImportMap, asset_path: &str, build_dir: &str) -> ImportMap {
    let prefix = relative_prefix(asset_path);
    rewrite(map, false, |target| {
        format!("{prefix}{}", strip_build_dir(target, build_dir))
    })
}

/// Local targets rewritten relative to the build output root. Remote targets
/// are omitted.
pub fn server_map(map: &ImportMap, build_dir: &str) -> ImportMap {
    rewrite(map, false, |target| format!("./{}", strip_build_dir(target, build_dir)))
}

fn strip_build_dir<'a>(target: &'a str, build_dir: &str) -> &'a str {
    let build_dir = build_dir.trim_start_matches("./").trim_matches('/');
    let rest = target.trim_start_matches("./");
    rest.strip_prefix(build_dir)
        .and_then(|r| r.strip_prefix('/'))
        .unwrap_or(rest)
}

fn rewrite<F>(map: &ImportMap, keep_remote: bool, f: F) -> ImportMap
where
    F: Fn(&str) -> String,
{
    let table = |source: &SpecifierMap| -> SpecifierMap {
        source
            .iter()
            .filter_map(|(key, target)| {
                if is_remote_source(target) {
                    keep_remote.then(|| (key.clone(), target.clone()))
                } else {
                    Some((key.clone(), f(target)))
                }
            })
            .collect()
    };
    ImportMap {
        imports: table(&map.imports),
        scopes: map
            .scopes
            .iter()
            .map(|(scope, entries)| (scope.clone(), table(entries)))
            .filter(|(_, entries)| !entries.is_empty())
            .collect(),
    }
}
