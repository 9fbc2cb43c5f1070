//! # Streaming Render Assembler
//!
//! Turns an app's lazy fragment sequence into a complete HTML document:
//! head (doctype, collected head tags, hydration bootstrap), body re-chunked
//! into fixed-size units with an idle flush, and a tail carrying the data
//! cache for the client.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ultrarender::config::UltraConfig;
//! use ultrarender::import_map::ImportMap;
//! use ultrarender::render::{AppProvider, MarkupApp, RenderJob, Renderer};
//! use url::Url;
//!
//! let config = UltraConfig::default();
//! let renderer = Renderer::new(&config, AppProvider::new_static(MarkupApp::new("<h1>hi</h1>"))).unwrap();
//! let root = Url::parse(&config.root).unwrap();
//! let job = RenderJob::new(root.join("/").unwrap(), root, Arc::new(ImportMap::new()));
//! let html = renderer.render(job).into_bytes().unwrap();
//! ```
//!
//! Every job gets its own [`RenderContext`], [`ChunkBuffer`] and abort flag;
//! the only state shared between jobs is the immutable import map and the
//! app provider.

mod app;
mod assembler;
mod chunk;
mod context;
mod document;
mod error;
mod stream;

pub use app::{
    App, AppLoader, AppProvider, Fragment, FragmentIter, MarkupApp, ReloadableApp, RenderRequest,
    SharedApp,
};
pub use assembler::{
    RenderBody, RenderJob, RenderResponse, RenderState, RenderStrategy, Renderer,
    HTML_CONTENT_TYPE,
};
pub use chunk::{pump, ChunkBuffer, PumpEnd, PumpOutcome, DEFAULT_CHUNK_SIZE, DEFAULT_FLUSH_IDLE};
pub use context::{AbortController, AbortSignal, DataCache, Helmet, RenderContext};
pub use document::{
    client_href, default_hydration_imports, transpiled_app, DocumentShell, HydrationImport,
};
pub use error::RenderError;
pub use stream::ByteStream;
