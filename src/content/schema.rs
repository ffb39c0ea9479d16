//! Rule-file document schema for TOML deserialization.
//!
//! These types mirror the on-disk shape of rule files, before conversion
//! into engine types: a rule file may declare any number of templates and
//! reskins, and a map delta file carries patch blocks against already
//! resolved templates. Attribute and parameter tables stay as raw TOML
//! tables here; the loader converts them to typed values.

use ahash::AHashMap;
use serde::Deserialize;

use crate::templates::ModuleKind;

/// One rule file: template definitions plus reskin declarations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDoc {
    #[serde(default)]
    pub templates: Vec<TemplateDoc>,
    #[serde(default)]
    pub reskins: Vec<ReskinDoc>,
}

/// A template definition as written in content.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDoc {
    /// Unique identity (case-sensitive).
    pub id: String,
    /// Parent identity; may be declared in any rule file of the batch.
    #[serde(default)]
    pub parent: Option<String>,
    /// Open-keyed field table.
    #[serde(default)]
    pub attributes: toml::Table,
    /// Per-category asset reference arrays.
    #[serde(default)]
    pub asset_sets: AHashMap<String, Vec<String>>,
    /// Module declarations in order.
    #[serde(default)]
    pub modules: Vec<ModuleDoc>,
}

/// A module declaration: family, optional instance name, parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDoc {
    pub kind: ModuleKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: toml::Table,
}

/// A reskin: clone `base` under `id` with attribute overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ReskinDoc {
    pub id: String,
    pub base: String,
    #[serde(default)]
    pub attributes: toml::Table,
}

/// One map delta file: patch blocks applied at map-load time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapDeltaDoc {
    #[serde(default)]
    pub patches: Vec<PatchDoc>,
}

/// Patch block against one resolved template.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchDoc {
    pub target: String,
    #[serde(default)]
    pub ops: Vec<PatchOpDoc>,
}

/// A single patch operation, tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOpDoc {
    Remove { name: String },
    Add { module: ModuleDoc },
    Replace { name: String, module: ModuleDoc },
}
