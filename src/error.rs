//! Error types for declaration generation.

use std::path::PathBuf;

use thiserror::Error;

/// Violations of the declaration tree's ownership rules.
///
/// These always indicate a bug in the caller, never bad input data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// A declaration was attached to itself.
    #[error("cannot attach `{name}` to itself")]
    AttachToSelf { name: String },

    /// A declaration was attached below one of its own descendants.
    #[error("cannot attach `{name}` below its own descendant `{parent}`")]
    AttachToAncestor { name: String, parent: String },

    /// A declaration that still has a parent was attached elsewhere.
    #[error("`{name}` is already a child of `{parent}`")]
    AlreadyParented { name: String, parent: String },

    /// A child with the same name and kind already exists where duplicates are not allowed.
    #[error("`{parent}` already has a {kind} named `{name}`")]
    DuplicateChild {
        parent: String,
        kind: String,
        name: String,
    },

    /// Two parameters with the same name were added to one declaration.
    #[error("`{owner}` already has a parameter named `{name}`")]
    DuplicateParameter { owner: String, name: String },

    /// Parameters were added to a declaration kind that cannot own them.
    #[error("`{name}` ({kind}) cannot own parameters")]
    NotExtended { name: String, kind: String },
}

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Tree ownership violation.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A referenced node or declaration could not be found.
    #[error("missing reference `{name}`: {context}")]
    MissingReference { name: String, context: String },

    /// An `extends` chain loops back onto itself.
    #[error("cyclic extends: {}", chain.join(" -> "))]
    CyclicExtends { chain: Vec<String> },

    /// I/O error reading or writing a file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A doclet dump could not be decoded.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The configuration file could not be decoded.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl GenerateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerateError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing(name: impl Into<String>, context: impl Into<String>) -> Self {
        GenerateError::MissingReference {
            name: name.into(),
            context: context.into(),
        }
    }
}

pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
