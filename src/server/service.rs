use super::api::{api_name, ApiRegistry, ApiRequest};
use super::request::{parse_request, ParsedRequest};
use super::response::{write_json, write_json_error, write_render_response, write_static_asset};
use crate::config::UltraConfig;
use crate::ids::RenderId;
use crate::import_map::ImportMap;
use crate::render::{RenderJob, Renderer};
use crate::static_files::StaticFiles;
use crate::url_utils::is_vendor_source;
use anyhow::Context;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/api/<name>`, dispatched to the registry
    Api(String),
    /// A file under the vendor directory
    Vendor,
    /// An existing source or build file
    Static,
    /// Everything else is a page
    Render,
    NotFound,
}

/// `may_minihttp` service composing API handlers, vendor and static files,
/// and the renderer, tried in that order.
#[derive(Clone)]
pub struct UltraService {
    renderer: Arc<Renderer>,
    import_map: Arc<ImportMap>,
    root: Url,
    vendor_dir: String,
    static_files: Option<StaticFiles>,
    api: Arc<ApiRegistry>,
}

impl UltraService {
    pub fn new(
        config: &UltraConfig,
        renderer: Arc<Renderer>,
        import_map: Arc<ImportMap>,
    ) -> anyhow::Result<Self> {
        let root = config.root_url().context("cannot build service")?;
        Ok(Self {
            renderer,
            import_map,
            root,
            vendor_dir: config.vendor_dir.clone(),
            static_files: None,
            api: Arc::new(ApiRegistry::new()),
        })
    }

    pub fn with_static_files(mut self, static_files: StaticFiles) -> Self {
        self.static_files = Some(static_files);
        self
    }

    pub fn with_api(mut self, api: ApiRegistry) -> Self {
        self.api = Arc::new(api);
        self
    }

    pub fn route(&self, method: &str, path: &str) -> Route {
        if let Some(name) = api_name(path) {
            return Route::Api(name.to_string());
        }
        if !matches!(method.parse::<Method>(), Ok(Method::GET | Method::HEAD)) {
            return Route::NotFound;
        }
        if is_vendor_source(path, &self.vendor_dir) {
            return Route::Vendor;
        }
        if self
            .static_files
            .as_ref()
            .is_some_and(|files| files.find(path).is_some())
        {
            return Route::Static;
        }
        Route::Render
    }

    fn render(&self, req: &ParsedRequest, res: &mut Response) {
        let url = match self.root.join(&req.raw_path) {
            Ok(url) => url,
            Err(err) => {
                write_json_error(res, 400, json!({ "error": "Bad Request", "details": err.to_string() }));
                return;
            }
        };
        let id = RenderId::from_header_or_new(req.headers.get("x-request-id").map(String::as_str));
        let job = RenderJob::new(url, self.root.clone(), Arc::clone(&self.import_map)).with_id(id);
        let rendered = self.renderer.render(job);
        info!(
            render_id = %id,
            path = %req.path,
            status = rendered.status,
            did_error = rendered.did_error,
            "Page rendered"
        );
        write_render_response(res, rendered);
    }
}

fn not_found(res: &mut Response) {
    write_json_error(res, 404, json!({ "error": "Not Found" }));
}

impl HttpService for UltraService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        let route = self.route(&parsed.method, &parsed.path);
        debug!(method = %parsed.method, path = %parsed.path, route = ?route, "Request routed");

        match route {
            Route::Api(name) => {
                let ParsedRequest {
                    method,
                    path,
                    headers,
                    query_params,
                    body,
                    ..
                } = parsed;
                let api_req = ApiRequest {
                    method,
                    path,
                    name,
                    headers,
                    query_params,
                    body,
                };
                let api_res = self.api.dispatch(&api_req);
                write_json(res, api_res.status, &api_res.body);
            }
            Route::Vendor => {
                let asset = self
                    .static_files
                    .as_ref()
                    .and_then(|files| files.load_vendor(&parsed.path).ok());
                match asset {
                    Some(asset) => write_static_asset(res, asset),
                    None => not_found(res),
                }
            }
            Route::Static => {
                let asset = self
                    .static_files
                    .as_ref()
                    .and_then(|files| files.load(&parsed.path).ok());
                match asset {
                    Some(asset) => write_static_asset(res, asset),
                    None => not_found(res),
                }
            }
            Route::Render => self.render(&parsed, res),
            Route::NotFound => not_found(res),
        }
        Ok(())
    }
}
