//! Inheritance merge.
//!
//! Flattens one template onto its already-resolved parent:
//! - attributes and asset-set categories shadow field-by-field, child wins;
//! - the body is cardinality-one, a child body replaces the parent's;
//! - list families append, parent modules first, then the child's own in
//!   declaration order. Inheritance adds modules, it never implicitly
//!   replaces them.
//!
//! Chain walking, memoization and cycle detection live in the registry;
//! this module only knows how to combine two adjacent levels.

use std::sync::Arc;

use crate::core::error::{Result, TemplateError};

use super::module::{ModuleKind, ModuleSpec};
use super::template::{ResolvedTemplate, Template};

/// Merge `child` onto its resolved parent, producing the child's resolved
/// form.
pub(crate) fn merge(child: &Template, parent: &ResolvedTemplate) -> Result<ResolvedTemplate> {
    let mut attributes = parent.attributes().clone();
    attributes.apply(&child.attributes);

    let mut asset_sets = parent.asset_sets().clone();
    for (category, references) in &child.asset_sets {
        asset_sets.insert(category.clone(), references.clone());
    }

    let body = match &child.body {
        Some(own) => Some(Arc::new(own.clone())),
        None => parent.modules(ModuleKind::Body).first().cloned(),
    };

    Ok(ResolvedTemplate {
        identity: child.identity.clone(),
        attributes,
        asset_sets,
        behaviors: append_list(parent, child, ModuleKind::Behavior)?,
        draws: append_list(parent, child, ModuleKind::Draw)?,
        client_updates: append_list(parent, child, ModuleKind::ClientUpdate)?,
        body,
    })
}

/// Parent modules first, then the child's own. A child module repeating an
/// inherited name would make patch addressing ambiguous, so it is an error
/// rather than an implicit replacement.
fn append_list(
    parent: &ResolvedTemplate,
    child: &Template,
    kind: ModuleKind,
) -> Result<Vec<Arc<ModuleSpec>>> {
    let mut merged: Vec<Arc<ModuleSpec>> = parent.modules(kind).to_vec();
    for own in child.modules(kind) {
        if let Some(name) = own.name.as_deref() {
            if merged.iter().any(|inherited| inherited.is_named(name)) {
                return Err(TemplateError::DuplicateModuleName {
                    template: child.identity.clone(),
                    name: name.to_string(),
                });
            }
        }
        merged.push(Arc::new(own.clone()));
    }
    Ok(merged)
}
