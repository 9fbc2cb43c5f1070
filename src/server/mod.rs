pub mod api;
pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use api::{ApiHandler, ApiRegistry, ApiRequest, ApiResponse};
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, ParsedRequest};
pub use service::{Route, UltraService};
