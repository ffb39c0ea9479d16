use thiserror::Error;

/// Failures surfaced by the template engine.
///
/// All of these are deterministic content errors: retrying reproduces the
/// same failure, so callers treat them as fatal for the offending template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template already defined: {0}")]
    DuplicateIdentity(String),

    #[error("registry is frozen, no further definitions accepted")]
    RegistryFrozen,

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("template {template} inherits from unknown parent {parent}")]
    UnknownParent { template: String, parent: String },

    #[error("cyclic inheritance: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("template {template} has no module named {name}")]
    ModuleNotFound { template: String, name: String },

    #[error("template {0} already has a body module")]
    DuplicateBody(String),

    #[error("template {template} repeats module name {name}")]
    DuplicateModuleName { template: String, name: String },

    #[error("body module of template {0} must be named")]
    UnnamedBody(String),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
