//! Doclet trees consumed by the generators.
//!
//! Two dumps feed a run: the options tree (one nested node per chart
//! option) and the namespace tree (one sub-tree per source file). Both are
//! read from JSON and normalised before generation starts.

pub mod namespace;
pub mod options;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{GenerateError, Result};

pub use namespace::{NamespaceDoclet, NamespaceNode, NamespaceTree, ParameterDoclet, ReturnDoclet};
pub use options::{Meta, OptionDoclet, OptionNode, TypeNames};

/// Read and decode a JSON dump.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
    serde_json::from_str(&content).map_err(|source| GenerateError::Json {
        path: path.to_path_buf(),
        source,
    })
}
