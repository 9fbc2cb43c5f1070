//! # ultrarender
//!
//! **ultrarender** delivers server-side rendered pages for import-map based
//! frontends, powered by `may` coroutines and `may_minihttp`.
//!
//! ## Overview
//!
//! Two subsystems do the work:
//!
//! - a **module specifier resolution engine** that maps bare and relative
//!   specifiers to URLs through an import map, honouring scopes keyed on the
//!   referencing module's URL
//! - a **streaming render assembler** that wraps an application's fragment
//!   stream in a generated document head and tail, and re-buffers the body
//!   into delivery-sized chunks with a bounded flush latency
//!
//! ## Architecture
//!
//! - **[`url_utils`]** - URL validity, extension rewriting, cache-key hashing
//! - **[`import_map`]** - Import map model, loading, merging, resolution and
//!   build-time derivations
//! - **[`render`]** - Render jobs, fragment producers, chunking and the output
//!   byte stream
//! - **[`config`]** - `UltraConfig`, read once at startup from YAML and `ULTRA_*`
//! - **[`server`]** - HTTP adapter: API routes, vendor and static files, renders
//! - **[`static_files`]** - Asset lookup with traversal protection
//! - **[`hot_reload`]** - Dev-mode app reloading
//! - **[`bundle`]** - Build pass writing derived import maps
//! - **[`otel`]** - Structured logging setup
//! - **[`cli`]** - The `ultrarender` command
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as UltraService<br/>(may_minihttp)
//!     participant Renderer
//!     participant Producer as Producer<br/>(Coroutine)
//!     participant Assembler as Assembler<br/>(Coroutine)
//!
//!     Client->>Server: GET /about
//!     Server->>Server: not /api, not vendor, not a static file
//!     Server->>Renderer: render(RenderJob)
//!     Renderer->>Producer: app.render(request, ctx)
//!     Renderer->>Assembler: spawn
//!     Assembler-->>Server: head (helmet + bootstrap script)
//!     loop fragments
//!         Producer->>Assembler: fragment
//!         Assembler-->>Server: full chunks, or idle flush
//!     end
//!     Assembler-->>Server: tail (serialized cache)
//!     Server-->>Client: 200 text/html
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ultrarender::config::UltraConfig;
//! use ultrarender::import_map::load_import_map;
//! use ultrarender::render::{AppProvider, MarkupApp, Renderer};
//! use ultrarender::server::{HttpServer, UltraService};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = UltraConfig::from_env();
//! let import_map = Arc::new(load_import_map("importMap.json")?);
//! let app = AppProvider::new_static(MarkupApp::from_file("index.html")?);
//! let renderer = Arc::new(Renderer::new(&config, app)?);
//! let service = UltraService::new(&config, renderer, import_map)?;
//! let handle = HttpServer(service).start("0.0.0.0:8000")?;
//! handle.join().ok();
//! # Ok(())
//! # }
//! ```
//!
//! ## Runtime Considerations
//!
//! Rendering runs on `may` coroutines, not tokio. Coroutine stack size comes
//! from `UltraConfig::stack_size` (`ULTRA_STACK_SIZE`, decimal or `0x` hex);
//! apps that build deep fragment trees may need more than the 32 KiB default.

pub mod bundle;
pub mod cli;
pub mod config;
pub mod hot_reload;
pub mod ids;
pub mod import_map;
pub mod otel;
pub mod render;
pub mod server;
pub mod static_files;
pub mod url_utils;

pub use config::{ErrorMode, UltraConfig};
pub use import_map::{ImportMap, ImportMapResolver, ResolvedSpecifier};
pub use render::{RenderJob, RenderResponse, Renderer};
