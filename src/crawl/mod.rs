// src/crawl/mod.rs
// =============================================================================
// This module crawls the targets.
//
// Features:
// - Bounded worker pool, one task per target
// - Optional override IP per target that still sends the real Host/SNI
// - Fixed timeout and redirect cap, both reported as classified errors
// - Optional one-level fetch of page assets (css/js/images), same host only
//   unless remote assets are allowed
//
// Submodules:
// - engine: the worker pool
// - fetch:  per-target HTTP client and requests
// - assets: finding asset references in a page
// - result: outcomes and the ResultSet handed to the caller
// =============================================================================

mod assets;
mod engine;
mod fetch;
pub mod result;

pub use engine::Crawler;
pub use result::{FetchOutcome, ResultSet};
