//! Writes rendered modules to disk.
//!
//! Every module with content is written twice: `<key>.d.ts` for the
//! minified build and `<key>.src.d.ts` for the source build. The two only
//! differ in the paths of ambient `module "..."` declarations, which point
//! at the matching `.src` module.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{GenerateError, Result};
use crate::tsd::{DeclarationId, Forest, Variant};

static AMBIENT_MODULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^([ \t]*(?:declare[ \t]+)?module[ \t]+)"([^"]+)""#).unwrap());

/// Writer for `.d.ts` / `.src.d.ts` pairs below one output directory.
pub struct DeclarationWriter {
    out_dir: PathBuf,
    /// Banner applied to every module; empty keeps each module's own.
    copyright: String,
}

/// Files produced for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub dts_path: PathBuf,
    pub src_path: PathBuf,
}

impl DeclarationWriter {
    pub fn new(out_dir: impl Into<PathBuf>, copyright: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            copyright: copyright.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Render `module` and write both variants.
    ///
    /// Returns `None` without touching the disk when the module renders
    /// empty.
    pub fn write_module(&self, forest: &mut Forest, module: DeclarationId) -> Result<Option<WriteResult>> {
        let key = match &mut forest.get_mut(module).variant {
            Variant::Module(info) => {
                if !self.copyright.is_empty() {
                    info.copyright = self.copyright.clone();
                }
                info.path.clone()
            }
            _ => {
                return Err(GenerateError::missing(
                    forest.full_name(module),
                    "only file modules can be written",
                ))
            }
        };

        let code = forest.render(module, "", false);
        if code.is_empty() {
            debug!(module = %key, "nothing to write");
            return Ok(None);
        }

        let dts_path = self.path_for(&key, "d.ts");
        let src_path = self.path_for(&key, "src.d.ts");
        if let Some(parent) = dts_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| GenerateError::io(parent, err))?;
            }
        }
        fs::write(&dts_path, &code).map_err(|err| GenerateError::io(&dts_path, err))?;
        fs::write(&src_path, to_src_variant(&code).as_ref())
            .map_err(|err| GenerateError::io(&src_path, err))?;

        debug!(module = %key, path = %dts_path.display(), "wrote declarations");
        Ok(Some(WriteResult { dts_path, src_path }))
    }

    /// Write every module in order, skipping the empty ones.
    pub fn write_all(&self, forest: &mut Forest, modules: &[DeclarationId]) -> Result<Vec<WriteResult>> {
        let mut written = Vec::new();
        for &module in modules {
            if let Some(result) = self.write_module(forest, module)? {
                written.push(result);
            }
        }
        Ok(written)
    }

    fn path_for(&self, key: &str, extension: &str) -> PathBuf {
        let mut path = self.out_dir.clone();
        path.extend(key.split('/').filter(|segment| !segment.is_empty()));
        let file = format!(
            "{}.{extension}",
            path.file_name().and_then(|name| name.to_str()).unwrap_or("index")
        );
        path.set_file_name(file);
        path
    }
}

/// Point ambient module declarations at the `.src` modules.
pub fn to_src_variant(code: &str) -> Cow<'_, str> {
    AMBIENT_MODULE_RE.replace_all(code, |caps: &Captures<'_>| {
        let path = &caps[2];
        if path.ends_with(".src") {
            caps[0].to_string()
        } else {
            format!("{}\"{path}.src\"", &caps[1])
        }
    })
}
