//! Raw and resolved template types.
//!
//! A `Template` is a definition exactly as declared in content: it may still
//! point at a parent by name. A `ResolvedTemplate` has the whole ancestor
//! chain flattened in and is immutable from then on; registry consumers
//! share it by `Arc` and derive new values (reskins, map patches) instead of
//! mutating it.

use std::sync::Arc;

use ahash::AHashMap;
use serde::Serialize;

use crate::core::error::{Result, TemplateError};

use super::module::{ModuleKind, ModuleSpec};
use super::value::AttributeBag;

/// A named entity definition as declared in content.
///
/// Raw templates are built once during content load and never mutated after
/// they enter the registry. The parent is a name lookup into the registry,
/// never ownership; many children may point at the same parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub identity: String,
    pub parent: Option<String>,
    pub attributes: AttributeBag,
    /// Per-category asset reference arrays, merged by category key.
    pub asset_sets: AHashMap<String, Vec<String>>,
    pub behaviors: Vec<ModuleSpec>,
    pub draws: Vec<ModuleSpec>,
    pub client_updates: Vec<ModuleSpec>,
    pub body: Option<ModuleSpec>,
}

impl Template {
    pub fn new(identity: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            identity: identity.into(),
            parent,
            attributes: AttributeBag::new(),
            asset_sets: AHashMap::new(),
            behaviors: Vec::new(),
            draws: Vec::new(),
            client_updates: Vec::new(),
            body: None,
        }
    }

    /// The template's own modules for one family, body included.
    pub fn modules(&self, kind: ModuleKind) -> &[ModuleSpec] {
        match kind {
            ModuleKind::Behavior => &self.behaviors,
            ModuleKind::Draw => &self.draws,
            ModuleKind::ClientUpdate => &self.client_updates,
            ModuleKind::Body => self.body.as_slice(),
        }
    }

    /// Attach a module to the list its kind selects, or install the body.
    pub fn push_module(&mut self, spec: ModuleSpec) -> Result<()> {
        match spec.kind {
            ModuleKind::Behavior => self.behaviors.push(spec),
            ModuleKind::Draw => self.draws.push(spec),
            ModuleKind::ClientUpdate => self.client_updates.push(spec),
            ModuleKind::Body => {
                if self.body.is_some() {
                    return Err(TemplateError::DuplicateBody(self.identity.clone()));
                }
                self.body = Some(spec);
            }
        }
        Ok(())
    }

    /// Check the module invariants this template can violate on its own:
    /// the body must be named, and named same-family siblings must not
    /// repeat a name (patches address modules by name).
    pub fn validate(&self) -> Result<()> {
        if let Some(body) = &self.body {
            if body.name.is_none() {
                return Err(TemplateError::UnnamedBody(self.identity.clone()));
            }
        }
        for kind in [ModuleKind::Behavior, ModuleKind::Draw, ModuleKind::ClientUpdate] {
            let list = self.modules(kind);
            for (position, spec) in list.iter().enumerate() {
                if let Some(name) = spec.name.as_deref() {
                    if list[..position].iter().any(|earlier| earlier.is_named(name)) {
                        return Err(TemplateError::DuplicateModuleName {
                            template: self.identity.clone(),
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A template with its full inheritance chain flattened in.
///
/// Structurally a `Template` without the parent reference. Immutable once
/// produced; the module lists hold `Arc`s so derived values (reskins,
/// patched map-local templates) share unaffected specs with their source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTemplate {
    pub(crate) identity: String,
    pub(crate) attributes: AttributeBag,
    pub(crate) asset_sets: AHashMap<String, Vec<String>>,
    pub(crate) behaviors: Vec<Arc<ModuleSpec>>,
    pub(crate) draws: Vec<Arc<ModuleSpec>>,
    pub(crate) client_updates: Vec<Arc<ModuleSpec>>,
    pub(crate) body: Option<Arc<ModuleSpec>>,
}

impl ResolvedTemplate {
    /// Convert a parentless template into resolved form (identity merge).
    pub(crate) fn from_root(template: &Template) -> Self {
        let share = |specs: &[ModuleSpec]| specs.iter().cloned().map(Arc::new).collect();
        Self {
            identity: template.identity.clone(),
            attributes: template.attributes.clone(),
            asset_sets: template.asset_sets.clone(),
            behaviors: share(&template.behaviors),
            draws: share(&template.draws),
            client_updates: share(&template.client_updates),
            body: template.body.clone().map(Arc::new),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    pub fn asset_sets(&self) -> &AHashMap<String, Vec<String>> {
        &self.asset_sets
    }

    /// The resolved modules for one family, body included.
    pub fn modules(&self, kind: ModuleKind) -> &[Arc<ModuleSpec>] {
        match kind {
            ModuleKind::Behavior => &self.behaviors,
            ModuleKind::Draw => &self.draws,
            ModuleKind::ClientUpdate => &self.client_updates,
            ModuleKind::Body => self.body.as_slice(),
        }
    }

    pub fn body(&self) -> Option<&ModuleSpec> {
        self.body.as_deref()
    }

    /// Find a named module, scanning families in
    /// [`ModuleKind::SCAN_ORDER`].
    pub fn find_module(&self, name: &str) -> Option<&ModuleSpec> {
        ModuleKind::SCAN_ORDER
            .iter()
            .flat_map(|&kind| self.modules(kind))
            .find(|spec| spec.is_named(name))
            .map(Arc::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::value::AttributeValue;

    fn tank() -> Template {
        let mut template = Template::new("Tank", None);
        template.attributes.set("HitPoints", 100i64);
        template.draws.push(ModuleSpec::named(ModuleKind::Draw, "TankDraw"));
        template.body = Some(ModuleSpec::named(ModuleKind::Body, "TankBody"));
        template
    }

    #[test]
    fn test_push_module_routes_by_kind() {
        let mut template = Template::new("Test", None);
        template
            .push_module(ModuleSpec::named(ModuleKind::Behavior, "AutoHeal"))
            .unwrap();
        template
            .push_module(ModuleSpec::named(ModuleKind::Body, "ActiveBody"))
            .unwrap();

        assert_eq!(template.behaviors.len(), 1);
        assert!(template.body.is_some());

        let second_body = template.push_module(ModuleSpec::named(ModuleKind::Body, "OtherBody"));
        assert!(matches!(second_body, Err(TemplateError::DuplicateBody(_))));
    }

    #[test]
    fn test_validate_rejects_unnamed_body() {
        let mut template = tank();
        template.body = Some(ModuleSpec::new(ModuleKind::Body, None, AttributeBag::new()));
        assert!(matches!(
            template.validate(),
            Err(TemplateError::UnnamedBody(identity)) if identity == "Tank"
        ));
    }

    #[test]
    fn test_validate_rejects_repeated_sibling_name() {
        let mut template = tank();
        template.draws.push(ModuleSpec::named(ModuleKind::Draw, "TankDraw"));
        assert!(matches!(
            template.validate(),
            Err(TemplateError::DuplicateModuleName { name, .. }) if name == "TankDraw"
        ));
    }

    #[test]
    fn test_validate_allows_anonymous_list_modules() {
        let mut template = tank();
        template
            .behaviors
            .push(ModuleSpec::new(ModuleKind::Behavior, None, AttributeBag::new()));
        template
            .behaviors
            .push(ModuleSpec::new(ModuleKind::Behavior, None, AttributeBag::new()));
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_same_name_allowed_across_families() {
        let mut template = tank();
        template
            .behaviors
            .push(ModuleSpec::named(ModuleKind::Behavior, "TankDraw"));
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_from_root_preserves_everything() {
        let resolved = ResolvedTemplate::from_root(&tank());

        assert_eq!(resolved.identity(), "Tank");
        assert_eq!(
            resolved.attributes().get("HitPoints"),
            Some(&AttributeValue::Integer(100))
        );
        assert_eq!(resolved.modules(ModuleKind::Draw).len(), 1);
        assert_eq!(resolved.modules(ModuleKind::Body).len(), 1);
        assert!(resolved.body().is_some());
    }

    #[test]
    fn test_find_module_scans_all_families() {
        let resolved = ResolvedTemplate::from_root(&tank());
        assert!(resolved.find_module("TankBody").is_some());
        assert!(resolved.find_module("TankDraw").is_some());
        assert!(resolved.find_module("Missing").is_none());
    }
}
