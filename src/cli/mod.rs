//! # CLI Module
//!
//! Command-line entry points for the `ultrarender` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve a project: `/api/*` handlers, vendor files, static files, and
//! streamed renders for everything else.
//!
//! ```bash
//! ultrarender serve --app dist/index.html --import-map importMap.json --watch
//! ```
//!
//! ### `build`
//!
//! Empty the build directory, copy non-module sources into it and write
//! `importMap.json` plus `server.importMap.json`:
//!
//! ```bash
//! ultrarender build --project . --plan
//! ```
//!
//! ### `resolve`
//!
//! ```bash
//! ultrarender resolve react --referrer http://localhost:8000/src/app.js
//! ```
//!
//! ### `hash`
//!
//! ```bash
//! ultrarender hash "https://esm.sh/react?dev"
//! ```
//!
//! Every command accepts `--config <FILE>` (or `ULTRA_CONFIG`); `ULTRA_*`
//! variables override file values.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run, run_cli, Cli, Commands};
