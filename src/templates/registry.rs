//! Template registry: the owning store of all raw templates.
//!
//! Built once at content-load time. Resolution is lazy and memoized: each
//! template is flattened against its ancestor chain at most once per
//! published value, and the resulting `Arc<ResolvedTemplate>` is shared by
//! every consumer. After `freeze()` the parent graph can no longer change,
//! so concurrent `resolve` calls need no coordination beyond the cache lock:
//! a lost race recomputes a value identical to the published one.

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use tracing::debug;

use crate::core::error::{Result, TemplateError};

use super::resolver;
use super::template::{ResolvedTemplate, Template};

pub struct TemplateRegistry {
    raw: AHashMap<String, Template>,
    /// Memoized resolved forms, reskins included. Guarded by a mutex so
    /// parallel resolution publishes each identity at most once.
    resolved: Mutex<AHashMap<String, Arc<ResolvedTemplate>>>,
    frozen: bool,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            raw: AHashMap::new(),
            resolved: Mutex::new(AHashMap::new()),
            frozen: false,
        }
    }

    /// Insert a raw template. Identities are case-sensitive and globally
    /// unique across raw definitions and registered reskins.
    pub fn define(&mut self, template: Template) -> Result<()> {
        if self.frozen {
            return Err(TemplateError::RegistryFrozen);
        }
        template.validate()?;
        if self.contains(&template.identity) {
            return Err(TemplateError::DuplicateIdentity(template.identity.clone()));
        }
        self.raw.insert(template.identity.clone(), template);
        Ok(())
    }

    /// Mark the registry read-only. Resolution stays available (the cache
    /// may still populate lazily), further definitions fail.
    pub fn freeze(&mut self) {
        self.frozen = true;
        debug!(templates = self.raw.len(), "registry frozen");
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.raw.contains_key(identity) || self.cached(identity).is_some()
    }

    /// All known identities (raw templates plus registered reskins),
    /// sorted for deterministic iteration.
    pub fn identities(&self) -> Vec<String> {
        let cache = self.lock_cache();
        let mut identities: Vec<String> = self
            .raw
            .keys()
            .chain(cache.keys().filter(|identity| !self.raw.contains_key(*identity)))
            .cloned()
            .collect();
        identities.sort();
        identities
    }

    /// Resolve a template to its flattened form, computing and memoizing it
    /// on first access.
    pub fn resolve(&self, identity: &str) -> Result<Arc<ResolvedTemplate>> {
        let mut chain = Vec::new();
        self.resolve_inner(identity, &mut chain)
    }

    /// Eagerly resolve every known template. Parallel map loads referencing
    /// shared base content do exactly this; the cache lock keeps the
    /// published value unique per identity.
    pub fn resolve_all(&self) -> Result<()> {
        use rayon::prelude::*;

        let identities = self.identities();
        identities
            .par_iter()
            .try_for_each(|identity| self.resolve(identity).map(|_| ()))
    }

    fn resolve_inner(&self, identity: &str, chain: &mut Vec<String>) -> Result<Arc<ResolvedTemplate>> {
        if let Some(hit) = self.cached(identity) {
            return Ok(hit);
        }
        let template = self
            .raw
            .get(identity)
            .ok_or_else(|| TemplateError::UnknownTemplate(identity.to_string()))?;

        if chain.iter().any(|seen| seen == identity) {
            chain.push(identity.to_string());
            return Err(TemplateError::CyclicInheritance { chain: chain.clone() });
        }
        chain.push(identity.to_string());

        let merged = match &template.parent {
            None => ResolvedTemplate::from_root(template),
            Some(parent_identity) => {
                let parent = self
                    .resolve_inner(parent_identity, chain)
                    .map_err(|error| match error {
                        TemplateError::UnknownTemplate(parent) => TemplateError::UnknownParent {
                            template: identity.to_string(),
                            parent,
                        },
                        other => other,
                    })?;
                resolver::merge(template, &parent)?
            }
        };
        chain.pop();

        Ok(self.publish(identity, merged))
    }

    /// Register an externally produced resolved template (a reskin) under a
    /// fresh identity.
    pub(crate) fn publish_new(&mut self, resolved: ResolvedTemplate) -> Result<Arc<ResolvedTemplate>> {
        if self.frozen {
            return Err(TemplateError::RegistryFrozen);
        }
        if self.contains(resolved.identity()) {
            return Err(TemplateError::DuplicateIdentity(resolved.identity().to_string()));
        }
        let identity = resolved.identity().to_string();
        Ok(self.publish(&identity, resolved))
    }

    /// Idempotent cache write: the first published value for an identity
    /// wins, a racing recomputation gets the already-published one back.
    fn publish(&self, identity: &str, merged: ResolvedTemplate) -> Arc<ResolvedTemplate> {
        let mut cache = self.lock_cache();
        Arc::clone(
            cache
                .entry(identity.to_string())
                .or_insert_with(|| Arc::new(merged)),
        )
    }

    fn cached(&self, identity: &str) -> Option<Arc<ResolvedTemplate>> {
        self.lock_cache().get(identity).cloned()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, AHashMap<String, Arc<ResolvedTemplate>>> {
        self.resolved
            .lock()
            .expect("resolution cache lock poisoned")
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
