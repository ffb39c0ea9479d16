//! TOML content front-end
//!
//! Turns on-disk rule trees (base rules, expansion overrides, per-map
//! deltas) into defined templates and map-local overrides. The engine in
//! [`crate::templates`] never touches the filesystem; everything here is
//! conversion and batching.

pub mod loader;
pub mod schema;

pub use loader::{
    load_content, ContentLoader, LoadError, LoadSummary, LoadedContent, MapOverrides,
};
pub use schema::{ContentDoc, MapDeltaDoc, ModuleDoc, PatchDoc, PatchOpDoc, ReskinDoc, TemplateDoc};
