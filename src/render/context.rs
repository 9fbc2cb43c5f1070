//! Per-job render state.
//!
//! A [`RenderContext`] is created fresh for every render job and dropped with
//! it. Apps write head tags and fetched data into it while rendering; the
//! assembler reads both back when it builds the document head and tail.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Head tags collected while rendering, keyed by name (`title`, `meta`, ..).
///
/// Keeps first-insertion order; re-inserting a name replaces its markup in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Helmet {
    tags: Vec<(String, String)>,
}

impl Helmet {
    pub fn insert(&mut self, name: impl Into<String>, markup: impl Into<String>) {
        let name = name.into();
        let markup = markup.into();
        match self.tags.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = markup,
            None => self.tags.push((name, markup)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// All collected markup concatenated in order.
    pub fn to_markup(&self) -> String {
        self.tags.iter().map(|(_, m)| m.as_str()).collect()
    }
}

/// Data fetched during a render, replayed on the client after hydration.
///
/// Serializes as an array of `[key, value]` pairs in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataCache {
    entries: Vec<(String, Value)>,
}

impl DataCache {
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(
            self.entries
                .iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        )
    }
}

/// Owner side of a job's cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    aborted: Arc<AtomicBool>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            aborted: Arc::clone(&self.aborted),
        }
    }
}

/// Read side of a job's cancellation flag, handed to the app.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

/// Side channels of one render job.
///
/// Clones share state, so an app can move a clone into its lazy fragment
/// iterator and keep recording data while the body streams.
#[derive(Debug, Clone)]
pub struct RenderContext {
    helmet: Arc<Mutex<Helmet>>,
    cache: Arc<Mutex<DataCache>>,
    signal: AbortSignal,
}

impl RenderContext {
    pub fn new(signal: AbortSignal) -> Self {
        Self {
            helmet: Arc::new(Mutex::new(Helmet::default())),
            cache: Arc::new(Mutex::new(DataCache::default())),
            signal,
        }
    }

    pub fn helmet(&self) -> MutexGuard<'_, Helmet> {
        self.helmet.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn cache(&self) -> MutexGuard<'_, DataCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_head_tag(&self, name: impl Into<String>, markup: impl Into<String>) {
        self.helmet().insert(name, markup);
    }

    pub fn cache_set(&self, key: impl Into<String>, value: Value) {
        self.cache().set(key, value);
    }

    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_helmet_replaces_in_place() {
        let mut helmet = Helmet::default();
        helmet.insert("title", "<title>a</title>");
        helmet.insert("meta", "<meta charset=\"utf-8\">");
        helmet.insert("title", "<title>b</title>");
        assert_eq!(helmet.len(), 2);
        assert_eq!(helmet.to_markup(), "<title>b</title><meta charset=\"utf-8\">");
    }

    #[test]
    fn test_cache_serializes_as_pairs() {
        let mut cache = DataCache::default();
        cache.set("/api/user", json!({ "name": "ultra" }));
        cache.set("/api/count", json!(3));
        assert_eq!(
            cache.to_json(),
            json!([["/api/user", { "name": "ultra" }], ["/api/count", 3]])
        );
    }

    #[test]
    fn test_abort_signal_observes_controller() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());
        controller.abort();
        assert!(signal.is_aborted());
    }

    #[test]
    fn test_contexts_are_isolated() {
        let a = RenderContext::new(AbortController::new().signal());
        let b = RenderContext::new(AbortController::new().signal());
        a.set_head_tag("title", "<title>a</title>");
        a.cache_set("k", json!(1));
        assert!(b.helmet().is_empty());
        assert!(b.cache().is_empty());
        let shared = a.clone();
        shared.cache_set("k2", json!(2));
        assert_eq!(a.cache().len(), 2);
    }
}
