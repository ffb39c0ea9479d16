//! Reskin resolution.
//!
//! A reskin clones a resolved base template under a new identity and layers
//! override attributes on top, using the same overlay rule as inheritance.
//! Module lists cannot be altered through this path; that is what map
//! patches are for. The derived template is registered so both identities
//! stay independently resolvable.

use std::sync::Arc;

use crate::core::error::Result;

use super::registry::TemplateRegistry;
use super::template::ResolvedTemplate;
use super::value::AttributeBag;

/// Derive the reskinned value. Module lists are shared with the base; only
/// the identity and attribute bag differ.
pub(crate) fn derive(
    base: &ResolvedTemplate,
    new_identity: &str,
    overrides: &AttributeBag,
) -> ResolvedTemplate {
    let mut derived = base.clone();
    derived.identity = new_identity.to_string();
    derived.attributes.apply(overrides);
    derived
}

impl TemplateRegistry {
    /// Clone the resolved `base_identity` under `new_identity` with
    /// `overrides` layered on top, register the result, and return it.
    pub fn reskin(
        &mut self,
        new_identity: &str,
        base_identity: &str,
        overrides: AttributeBag,
    ) -> Result<Arc<ResolvedTemplate>> {
        let base = self.resolve(base_identity)?;
        self.publish_new(derive(&base, new_identity, &overrides))
    }
}
