//! Module declarations carried by templates.
//!
//! The engine is deliberately agnostic about what a module *does*: a module
//! is a family tag, an optional instance name, and a private parameter bag.
//! Interpreting the parameters is the simulation layer's job.

use serde::{Deserialize, Serialize};

use super::value::AttributeBag;

/// Module family. `Body` is cardinality-one per template; the other
/// families are ordered append lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Behavior,
    Draw,
    Body,
    ClientUpdate,
}

impl ModuleKind {
    /// Scan order for name lookups across a template's module lists.
    /// Matches the declaration order of the module families.
    pub const SCAN_ORDER: [ModuleKind; 4] = [
        ModuleKind::Behavior,
        ModuleKind::Draw,
        ModuleKind::Body,
        ModuleKind::ClientUpdate,
    ];

    /// Whether this family holds an ordered list (as opposed to the single
    /// body slot).
    pub fn is_list(self) -> bool {
        !matches!(self, ModuleKind::Body)
    }
}

/// A single module declaration.
///
/// `name` addresses the module for remove/replace patches and must be
/// unique among same-family siblings of one resolved template. Anonymous
/// specs are allowed in list families only; a body is always named.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSpec {
    pub kind: ModuleKind,
    pub name: Option<String>,
    pub params: AttributeBag,
}

impl ModuleSpec {
    pub fn new(kind: ModuleKind, name: Option<String>, params: AttributeBag) -> Self {
        Self { kind, name, params }
    }

    /// Convenience constructor for a named module with empty parameters.
    pub fn named(kind: ModuleKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            params: AttributeBag::new(),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}
