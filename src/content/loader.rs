//! Loads rule files and map deltas into the template engine.
//!
//! Loading is a two-phase batch: every template of every file is defined
//! first, then reskins are applied, so definitions may reference parents
//! and reskin bases declared in files that have not been read yet.
//! Map deltas are applied last, against the frozen registry, and the
//! patched templates stay owned by the map that loaded them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::{ContentConfig, LoadPolicy};
use crate::core::error::TemplateError;
use crate::templates::{
    apply_patches, AttributeBag, AttributeValue, ModuleSpec, PatchOp, ResolvedTemplate, Template,
    TemplateRegistry,
};

use super::schema::{ContentDoc, MapDeltaDoc, ModuleDoc, PatchDoc, PatchOpDoc, TemplateDoc};

/// Errors that can occur while loading content.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing failed
    #[error("parse error in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    /// An attribute or parameter value the engine cannot represent
    #[error("unsupported value for field {field} in {context}")]
    UnsupportedValue { context: String, field: String },
    /// The engine rejected a definition, reskin or patch
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Counters for one load batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub templates: usize,
    pub reskins: usize,
    /// Definitions skipped under [`LoadPolicy::Lenient`].
    pub skipped: usize,
}

impl LoadSummary {
    fn absorb(&mut self, other: LoadSummary) {
        self.templates += other.templates;
        self.reskins += other.reskins;
        self.skipped += other.skipped;
    }
}

/// Map-local resolved templates derived by delta patches.
///
/// Owned by the map (or scenario) that loaded them; never registered back
/// into the shared registry, so every other consumer keeps seeing the
/// unpatched values.
#[derive(Debug, Clone, Default)]
pub struct MapOverrides {
    overrides: AHashMap<String, Arc<ResolvedTemplate>>,
}

impl MapOverrides {
    pub fn get(&self, identity: &str) -> Option<&Arc<ResolvedTemplate>> {
        self.overrides.get(identity)
    }

    /// The template this map should instantiate: the patched value if one
    /// exists, otherwise the shared resolved template.
    pub fn effective(
        &self,
        registry: &TemplateRegistry,
        identity: &str,
    ) -> crate::core::error::Result<Arc<ResolvedTemplate>> {
        match self.overrides.get(identity) {
            Some(patched) => Ok(Arc::clone(patched)),
            None => registry.resolve(identity),
        }
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ResolvedTemplate>)> {
        self.overrides
            .iter()
            .map(|(identity, template)| (identity.as_str(), template))
    }
}

/// A fully loaded content set.
pub struct LoadedContent {
    /// Frozen registry of shared templates.
    pub registry: TemplateRegistry,
    /// Map-local patched templates, empty when no delta directory was given.
    pub overrides: MapOverrides,
    pub summary: LoadSummary,
}

/// Load a whole content set: rule directories in order, freeze, then map
/// deltas.
pub fn load_content(config: &ContentConfig) -> Result<LoadedContent, LoadError> {
    let loader = ContentLoader::new(config.policy);
    let mut registry = TemplateRegistry::new();
    let mut summary = LoadSummary::default();

    for dir in &config.rule_dirs {
        summary.absorb(loader.load_directory(&mut registry, dir)?);
    }
    registry.freeze();

    let overrides = match &config.map_delta_dir {
        Some(dir) => loader.load_delta_directory(&registry, dir)?,
        None => MapOverrides::default(),
    };

    info!(
        templates = summary.templates,
        reskins = summary.reskins,
        skipped = summary.skipped,
        map_overrides = overrides.len(),
        "content set loaded"
    );
    Ok(LoadedContent {
        registry,
        overrides,
        summary,
    })
}

/// Loader for rule files and map deltas.
pub struct ContentLoader {
    policy: LoadPolicy,
}

impl ContentLoader {
    pub fn new(policy: LoadPolicy) -> Self {
        Self { policy }
    }

    /// Load all `.toml` rule files from a directory tree.
    pub fn load_directory(
        &self,
        registry: &mut TemplateRegistry,
        dir: &Path,
    ) -> Result<LoadSummary, LoadError> {
        let mut summary = LoadSummary::default();
        let mut docs = Vec::new();
        self.collect_docs(dir, &mut docs, &mut summary)?;

        // Phase 1: definitions from every file, so parents may live anywhere
        // in the batch. Phase 2: reskins, which need a resolvable base.
        for (path, doc) in &docs {
            self.define_templates(registry, doc, path, &mut summary)?;
        }
        for (path, doc) in &docs {
            self.apply_reskins(registry, doc, path, &mut summary)?;
        }
        Ok(summary)
    }

    /// Parse one rule document from text and feed it into the registry.
    pub fn load_str(
        &self,
        registry: &mut TemplateRegistry,
        text: &str,
    ) -> Result<LoadSummary, LoadError> {
        let doc: ContentDoc = toml::from_str(text).map_err(|source| LoadError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        let mut summary = LoadSummary::default();
        self.define_templates(registry, &doc, "<inline>", &mut summary)?;
        self.apply_reskins(registry, &doc, "<inline>", &mut summary)?;
        Ok(summary)
    }

    /// Load every map delta file under `dir`, in lexical path order so
    /// later files layer deterministically on earlier ones.
    pub fn load_delta_directory(
        &self,
        registry: &TemplateRegistry,
        dir: &Path,
    ) -> Result<MapOverrides, LoadError> {
        let mut paths = Vec::new();
        collect_toml_paths(dir, &mut paths)?;
        paths.sort();

        let mut overrides = MapOverrides::default();
        for path in &paths {
            let text = fs::read_to_string(path)?;
            let label = path.display().to_string();
            match toml::from_str::<MapDeltaDoc>(&text) {
                Ok(doc) => self.apply_delta_doc(registry, &doc, &label, &mut overrides)?,
                Err(source) => match self.policy {
                    LoadPolicy::Strict => {
                        return Err(LoadError::Parse { path: label, source });
                    }
                    LoadPolicy::Lenient => {
                        warn!(path = %label, %source, "skipping unparseable delta file");
                    }
                },
            }
        }
        Ok(overrides)
    }

    /// Parse one map delta document from text and apply it.
    pub fn load_delta_str(
        &self,
        registry: &TemplateRegistry,
        text: &str,
    ) -> Result<MapOverrides, LoadError> {
        let doc: MapDeltaDoc = toml::from_str(text).map_err(|source| LoadError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        let mut overrides = MapOverrides::default();
        self.apply_delta_doc(registry, &doc, "<inline>", &mut overrides)?;
        Ok(overrides)
    }

    fn collect_docs(
        &self,
        dir: &Path,
        docs: &mut Vec<(String, ContentDoc)>,
        summary: &mut LoadSummary,
    ) -> Result<(), LoadError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_docs(&path, docs, summary)?;
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                let text = fs::read_to_string(&path)?;
                let label = path.display().to_string();
                match toml::from_str::<ContentDoc>(&text) {
                    Ok(doc) => {
                        debug!(path = %label, templates = doc.templates.len(), "parsed rule file");
                        docs.push((label, doc));
                    }
                    Err(source) => {
                        let error = LoadError::Parse { path: label.clone(), source };
                        self.skip_or_fail(error, &label, summary)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn define_templates(
        &self,
        registry: &mut TemplateRegistry,
        doc: &ContentDoc,
        path: &str,
        summary: &mut LoadSummary,
    ) -> Result<(), LoadError> {
        for template_doc in &doc.templates {
            let outcome = convert_template(template_doc)
                .and_then(|template| registry.define(template).map_err(LoadError::from));
            match outcome {
                Ok(()) => summary.templates += 1,
                Err(error) => self.skip_or_fail(error, path, summary)?,
            }
        }
        Ok(())
    }

    fn apply_reskins(
        &self,
        registry: &mut TemplateRegistry,
        doc: &ContentDoc,
        path: &str,
        summary: &mut LoadSummary,
    ) -> Result<(), LoadError> {
        for reskin_doc in &doc.reskins {
            let outcome = convert_table(&reskin_doc.attributes, &reskin_doc.id).and_then(
                |attribute_overrides| {
                    registry
                        .reskin(&reskin_doc.id, &reskin_doc.base, attribute_overrides)
                        .map(|_| ())
                        .map_err(LoadError::from)
                },
            );
            match outcome {
                Ok(()) => summary.reskins += 1,
                Err(error) => self.skip_or_fail(error, path, summary)?,
            }
        }
        Ok(())
    }

    fn apply_delta_doc(
        &self,
        registry: &TemplateRegistry,
        doc: &MapDeltaDoc,
        path: &str,
        overrides: &mut MapOverrides,
    ) -> Result<(), LoadError> {
        for patch in &doc.patches {
            match self.apply_patch_doc(registry, patch, overrides) {
                Ok(()) => {}
                Err(error) => match self.policy {
                    LoadPolicy::Strict => return Err(error),
                    LoadPolicy::Lenient => {
                        warn!(path = %path, error = %error, "skipping map patch");
                    }
                },
            }
        }
        Ok(())
    }

    /// Later patch blocks against the same target layer onto the already
    /// patched value; patches for one target are applied once, in order.
    fn apply_patch_doc(
        &self,
        registry: &TemplateRegistry,
        patch: &PatchDoc,
        overrides: &mut MapOverrides,
    ) -> Result<(), LoadError> {
        let base = match overrides.get(&patch.target) {
            Some(existing) => Arc::clone(existing),
            None => registry.resolve(&patch.target)?,
        };
        let ops = patch
            .ops
            .iter()
            .map(|op| convert_patch_op(op, &patch.target))
            .collect::<Result<Vec<PatchOp>, LoadError>>()?;
        let patched = apply_patches(&base, &ops)?;
        overrides
            .overrides
            .insert(patch.target.clone(), Arc::new(patched));
        Ok(())
    }

    fn skip_or_fail(
        &self,
        error: LoadError,
        path: &str,
        summary: &mut LoadSummary,
    ) -> Result<(), LoadError> {
        match self.policy {
            LoadPolicy::Strict => Err(error),
            LoadPolicy::Lenient => {
                warn!(path = %path, error = %error, "skipping content definition");
                summary.skipped += 1;
                Ok(())
            }
        }
    }
}

fn collect_toml_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_toml_paths(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    Ok(())
}

/// Convert a parsed template document into an engine template.
fn convert_template(doc: &TemplateDoc) -> Result<Template, LoadError> {
    let mut template = Template::new(&doc.id, doc.parent.clone());
    template.attributes = convert_table(&doc.attributes, &doc.id)?;
    template.asset_sets = doc.asset_sets.clone();
    for module_doc in &doc.modules {
        let spec = convert_module(module_doc, &doc.id)?;
        template.push_module(spec)?;
    }
    Ok(template)
}

fn convert_module(doc: &ModuleDoc, context: &str) -> Result<ModuleSpec, LoadError> {
    let label = match &doc.name {
        Some(name) => format!("{context}.{name}"),
        None => context.to_string(),
    };
    Ok(ModuleSpec::new(
        doc.kind,
        doc.name.clone(),
        convert_table(&doc.params, &label)?,
    ))
}

fn convert_table(table: &toml::Table, context: &str) -> Result<AttributeBag, LoadError> {
    let mut bag = AttributeBag::new();
    for (field, value) in table {
        bag.set(field.clone(), convert_value(value, context, field)?);
    }
    Ok(bag)
}

fn convert_value(
    value: &toml::Value,
    context: &str,
    field: &str,
) -> Result<AttributeValue, LoadError> {
    let unsupported = || LoadError::UnsupportedValue {
        context: context.to_string(),
        field: field.to_string(),
    };
    match value {
        toml::Value::Integer(v) => Ok(AttributeValue::Integer(*v)),
        toml::Value::Float(v) => Ok(AttributeValue::Float(*v as f32)),
        toml::Value::Boolean(v) => Ok(AttributeValue::Bool(*v)),
        toml::Value::String(v) => Ok(AttributeValue::String(v.clone())),
        toml::Value::Array(items) => {
            let mut references = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    toml::Value::String(reference) => references.push(reference.clone()),
                    _ => return Err(unsupported()),
                }
            }
            Ok(AttributeValue::StringArray(references))
        }
        toml::Value::Table(inner) => {
            // `{ enum = "NAME" }` marks a symbolic constant.
            if inner.len() == 1 {
                if let Some(toml::Value::String(name)) = inner.get("enum") {
                    return Ok(AttributeValue::Enum(name.clone()));
                }
            }
            Err(unsupported())
        }
        toml::Value::Datetime(_) => Err(unsupported()),
    }
}

fn convert_patch_op(doc: &PatchOpDoc, target: &str) -> Result<PatchOp, LoadError> {
    Ok(match doc {
        PatchOpDoc::Remove { name } => PatchOp::Remove(name.clone()),
        PatchOpDoc::Add { module } => PatchOp::Add(convert_module(module, target)?),
        PatchOpDoc::Replace { name, module } => PatchOp::Replace {
            name: name.clone(),
            module: convert_module(module, target)?,
        },
    })
}
