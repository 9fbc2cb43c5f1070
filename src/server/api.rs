//! Named `/api/<name>` handlers.
//!
//! Handlers are registered under the path that follows `/api/`
//! (`posts/latest` serves `/api/posts/latest`). Anything under `/api/` without
//! a handler answers 404 `{"error":"Not Found"}`; it never reaches the renderer.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const API_PREFIX: &str = "/api";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    /// Path below `/api/`
    pub name: String,
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: serde_json::json!({ "error": "Not Found" }),
        }
    }
}

pub trait ApiHandler: Send + Sync {
    fn handle(&self, req: &ApiRequest) -> ApiResponse;
}

impl<F> ApiHandler for F
where
    F: Fn(&ApiRequest) -> ApiResponse + Send + Sync,
{
    fn handle(&self, req: &ApiRequest) -> ApiResponse {
        self(req)
    }
}

#[derive(Clone, Default)]
pub struct ApiRegistry {
    handlers: HashMap<String, Arc<dyn ApiHandler>>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `/api/{name}`. Leading and trailing slashes on
    /// `name` are ignored; a second registration replaces the first.
    pub fn register<H: ApiHandler + 'static>(&mut self, name: &str, handler: H) {
        self.handlers
            .insert(name.trim_matches('/').to_string(), Arc::new(handler));
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a request already known to be under `/api/`.
    pub fn dispatch(&self, req: &ApiRequest) -> ApiResponse {
        match self.handlers.get(req.name.as_str()) {
            Some(handler) => handler.handle(req),
            None => ApiResponse::not_found(),
        }
    }
}

/// The handler name for `path`, or `None` when `path` is not an API path.
pub fn api_name(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(API_PREFIX)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('/').map(|name| name.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &str) -> ApiRequest {
        ApiRequest {
            method: "GET".to_string(),
            path: format!("/api/{name}"),
            name: name.to_string(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            body: None,
        }
    }

    #[test]
    fn test_api_name() {
        assert_eq!(api_name("/api/posts"), Some("posts"));
        assert_eq!(api_name("/api/posts/latest/"), Some("posts/latest"));
        assert_eq!(api_name("/api"), Some(""));
        assert_eq!(api_name("/apis"), None);
        assert_eq!(api_name("/about"), None);
    }

    #[test]
    fn test_dispatch_and_fallback() {
        let mut registry = ApiRegistry::new();
        registry.register("/hello/", |req: &ApiRequest| {
            ApiResponse::ok(json!({ "method": req.method }))
        });
        assert_eq!(registry.names(), vec!["hello"]);
        assert_eq!(registry.dispatch(&request("hello")).body, json!({ "method": "GET" }));
        let missing = registry.dispatch(&request("nope"));
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body, json!({ "error": "Not Found" }));
    }
}
