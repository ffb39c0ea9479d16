//! Module patch algebra for map-level deltas.
//!
//! Maps customize a resolved template's module set without touching the
//! shared value: every application starts from a clone and returns a new
//! `ResolvedTemplate`, so a failed op leaves the input untouched and a
//! value concurrently read by other consumers is never mutated. The ops are
//! data, applied strictly in order; order is significant (remove-then-add
//! and add-then-remove of the same name are both legal and mean different
//! things).

use std::sync::Arc;

use crate::core::error::{Result, TemplateError};

use super::module::{ModuleKind, ModuleSpec};
use super::template::ResolvedTemplate;

/// One module operation from a map delta.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Remove the first module with this instance name, scanning families
    /// in [`ModuleKind::SCAN_ORDER`]. A missing name is a hard error: it
    /// signals a stale or mistyped patch, not a no-op.
    Remove(String),
    /// Append a module to its family's list, or install the body.
    Add(ModuleSpec),
    /// Substitute the named module. Same-family substitution keeps the
    /// slot; a cross-family replacement moves the module to the end of the
    /// new family's list.
    Replace { name: String, module: ModuleSpec },
}

/// Apply `ops` in order to a copy of `base`. Pure: `base` is never
/// mutated, and on error the partially patched copy is discarded.
pub fn apply_patches(base: &ResolvedTemplate, ops: &[PatchOp]) -> Result<ResolvedTemplate> {
    let mut derived = base.clone();
    for op in ops {
        match op {
            PatchOp::Remove(name) => {
                remove_named(&mut derived, name)?;
            }
            PatchOp::Add(spec) => add_module(&mut derived, spec.clone())?,
            PatchOp::Replace { name, module } => replace_module(&mut derived, name, module.clone())?,
        }
    }
    Ok(derived)
}

fn list_mut(template: &mut ResolvedTemplate, kind: ModuleKind) -> &mut Vec<Arc<ModuleSpec>> {
    match kind {
        ModuleKind::Behavior => &mut template.behaviors,
        ModuleKind::Draw => &mut template.draws,
        ModuleKind::ClientUpdate => &mut template.client_updates,
        ModuleKind::Body => panic!("body is not a list family"),
    }
}

fn remove_named(template: &mut ResolvedTemplate, name: &str) -> Result<Arc<ModuleSpec>> {
    for kind in ModuleKind::SCAN_ORDER {
        if kind == ModuleKind::Body {
            if let Some(body) = template.body.take() {
                if body.is_named(name) {
                    return Ok(body);
                }
                template.body = Some(body);
            }
        } else {
            let list = list_mut(template, kind);
            if let Some(position) = list.iter().position(|spec| spec.is_named(name)) {
                return Ok(list.remove(position));
            }
        }
    }
    Err(TemplateError::ModuleNotFound {
        template: template.identity().to_string(),
        name: name.to_string(),
    })
}

fn add_module(template: &mut ResolvedTemplate, spec: ModuleSpec) -> Result<()> {
    if spec.kind == ModuleKind::Body {
        if spec.name.is_none() {
            return Err(TemplateError::UnnamedBody(template.identity().to_string()));
        }
        if template.body.is_some() {
            return Err(TemplateError::DuplicateBody(template.identity().to_string()));
        }
        template.body = Some(Arc::new(spec));
        return Ok(());
    }

    if let Some(name) = spec.name.as_deref() {
        let list = list_mut(template, spec.kind);
        if list.iter().any(|existing| existing.is_named(name)) {
            return Err(TemplateError::DuplicateModuleName {
                template: template.identity().to_string(),
                name: name.to_string(),
            });
        }
    }
    list_mut(template, spec.kind).push(Arc::new(spec));
    Ok(())
}

/// Where a named module lives inside a resolved template.
#[derive(Clone, Copy)]
enum Slot {
    List(ModuleKind, usize),
    Body,
}

/// First match for `name` in [`ModuleKind::SCAN_ORDER`].
fn locate(template: &ResolvedTemplate, name: &str) -> Option<Slot> {
    for kind in ModuleKind::SCAN_ORDER {
        if kind == ModuleKind::Body {
            if template.body.as_ref().is_some_and(|body| body.is_named(name)) {
                return Some(Slot::Body);
            }
        } else if let Some(position) = template
            .modules(kind)
            .iter()
            .position(|spec| spec.is_named(name))
        {
            return Some(Slot::List(kind, position));
        }
    }
    None
}

fn replace_module(template: &mut ResolvedTemplate, name: &str, spec: ModuleSpec) -> Result<()> {
    let slot = locate(template, name).ok_or_else(|| TemplateError::ModuleNotFound {
        template: template.identity().to_string(),
        name: name.to_string(),
    })?;

    match slot {
        // Same-family substitution keeps the slot. The replacement may
        // rename the module as long as the new name stays unique.
        Slot::List(kind, position) if kind == spec.kind => {
            if let Some(new_name) = spec.name.as_deref() {
                let collision = template
                    .modules(kind)
                    .iter()
                    .enumerate()
                    .any(|(other, existing)| other != position && existing.is_named(new_name));
                if collision {
                    return Err(TemplateError::DuplicateModuleName {
                        template: template.identity().to_string(),
                        name: new_name.to_string(),
                    });
                }
            }
            list_mut(template, kind)[position] = Arc::new(spec);
            Ok(())
        }
        Slot::Body if spec.kind == ModuleKind::Body => {
            if spec.name.is_none() {
                return Err(TemplateError::UnnamedBody(template.identity().to_string()));
            }
            template.body = Some(Arc::new(spec));
            Ok(())
        }
        // Cross-family replacement: out of the old slot, appended under the
        // new family.
        Slot::List(kind, position) => {
            list_mut(template, kind).remove(position);
            add_module(template, spec)
        }
        Slot::Body => {
            template.body = None;
            add_module(template, spec)
        }
    }
}
