use crate::render::RenderResponse;
use crate::static_files::StaticAsset;
use may_minihttp::Response;
use serde_json::Value;
use tracing::warn;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// `may_minihttp` only takes `'static` header lines, so every content type the
/// crate produces has its line spelled out here.
fn content_type_header(content_type: &str) -> &'static str {
    match content_type {
        "text/html; charset=utf-8" => "Content-Type: text/html; charset=utf-8",
        "text/javascript" => "Content-Type: text/javascript",
        "text/css" => "Content-Type: text/css",
        "text/plain" => "Content-Type: text/plain",
        "application/json" => "Content-Type: application/json",
        "image/svg+xml" => "Content-Type: image/svg+xml",
        "image/png" => "Content-Type: image/png",
        "image/jpeg" => "Content-Type: image/jpeg",
        "image/gif" => "Content-Type: image/gif",
        "image/x-icon" => "Content-Type: image/x-icon",
        "image/webp" => "Content-Type: image/webp",
        "font/woff2" => "Content-Type: font/woff2",
        "application/wasm" => "Content-Type: application/wasm",
        _ => "Content-Type: application/octet-stream",
    }
}

fn cache_control_header(cache_control: &str) -> Option<&'static str> {
    match cache_control {
        crate::static_files::VENDOR_CACHE_CONTROL => Some(
            "Cache-Control: public, max-age=604800, stale-while-revalidate=86400, stale-if-error=259200",
        ),
        _ => None,
    }
}

pub fn write_json(res: &mut Response, status: u16, body: &Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    write_json(res, status, &body);
}

pub fn write_static_asset(res: &mut Response, asset: StaticAsset) {
    res.status_code(200, "OK");
    res.header(content_type_header(asset.content_type));
    if let Some(header) = asset.cache_control.and_then(cache_control_header) {
        res.header(header);
    }
    res.body_vec(asset.bytes);
}

/// Write a rendered document. A streamed body is drained here; if the stream
/// ends with an error, the bytes received before it are sent as they are and
/// the status stays what the renderer reported.
pub fn write_render_response(res: &mut Response, rendered: RenderResponse) {
    res.status_code(rendered.status as usize, status_reason(rendered.status));
    res.header(content_type_header(rendered.content_type));
    let body = match rendered.body {
        crate::render::RenderBody::Buffered(bytes) => bytes,
        crate::render::RenderBody::Stream(stream) => {
            let mut body = Vec::new();
            for chunk in stream {
                match chunk {
                    Ok(chunk) => body.extend_from_slice(&chunk),
                    Err(err) => {
                        warn!(error = %err, bytes = body.len(), "Render stream ended early");
                        break;
                    }
                }
            }
            body
        }
    };
    res.body_vec(body);
}
