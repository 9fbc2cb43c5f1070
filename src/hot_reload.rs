//! # Hot Reload
//!
//! Dev-mode watcher that swaps the app behind a [`ReloadableApp`] whenever a
//! watched path changes. In-flight renders keep the app they started with;
//! the next job picks up the new one.
//!
//! ```rust,ignore
//! use ultrarender::hot_reload::watch_app;
//! use ultrarender::render::{MarkupApp, ReloadableApp};
//!
//! let app = ReloadableApp::new(MarkupApp::loader("dist/index.html".into()))?;
//! let _watcher = watch_app(["dist"], app.clone(), |generation| {
//!     println!("now serving generation {generation}");
//! })?;
//! ```
//!
//! The returned watcher must be kept alive for as long as reloading is wanted.
//! A failed reload is logged and the previous app keeps serving.

use crate::render::ReloadableApp;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Watch `paths` and reload `app` on every create or modify event.
///
/// Directories are watched recursively. `on_reload` receives the new
/// generation after each successful reload.
pub fn watch_app<I, P, F>(paths: I, app: ReloadableApp, mut on_reload: F) -> notify::Result<RecommendedWatcher>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
    F: FnMut(u64) + Send + 'static,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !is_reload_event(&event.kind) {
                    return;
                }
                debug!(paths = ?event.paths, "hot-reload: change detected");
                if app.reload() {
                    on_reload(app.generation());
                }
            }
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    for path in &paths {
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(path, mode)?;
        info!(path = %path.display(), "hot-reload: watching");
    }
    Ok(watcher)
}

fn is_reload_event(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}
