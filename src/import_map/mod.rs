//! # Import Map Module
//!
//! Parsed import maps and the module specifier resolution engine.
//!
//! - **[`ImportMap`]** - `imports` + `scopes` tables, loaded from the standard JSON shape
//! - **[`ImportMapResolver`]** - resolves `(specifier, referrer)` pairs to absolute URLs
//! - **[`derive`]** - build-time rewrites producing deployment-relative maps
//!
//! An [`ImportMap`] is immutable once constructed. Derivations and merges always
//! return a new map, so one instance can be shared across coroutines behind an
//! `Arc` without locking.

mod error;
mod load;
mod resolver;
mod types;

pub mod derive;

pub use error::ImportMapError;
pub use load::*;
pub use resolver::ImportMapResolver;
pub use types::*;
