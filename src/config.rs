//! Generator configuration (tsdgen.toml) and the type-string mapper.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::{GenerateError, Result};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "tsdgen.toml";

/// Text substitution service applied to every type and value string before
/// it enters the declaration model.
pub trait TypeMapper {
    /// Normalise a documentation type expression into TypeScript syntax.
    fn map_type(&self, ty: &str) -> String;
    /// Normalise a default value literal.
    fn map_value(&self, value: &str) -> String;
    /// Reference documentation URL for an entity, if one is configured.
    fn see_link(&self, name: &str, kind: LinkKind) -> Option<String>;
}

/// Which reference documentation a link points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// A dotted chart options path.
    Option,
    /// A class, function or namespace member.
    Class,
}

/// Root configuration structure for tsdgen.toml.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Name mapping table for type expressions.
    #[serde(default)]
    pub types: IndexMap<String, String>,
    /// Mapping table for default value literals.
    #[serde(default)]
    pub values: IndexMap<String, String>,
    #[serde(default)]
    pub see: SeeConfig,
}

/// `[generator]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Module key of the main module.
    pub main_module: String,
    /// Module key of the shared globals module.
    pub globals_module: String,
    /// Name of the root namespace.
    pub namespace: String,
    /// Product filter for the options tree (e.g. "highstock").
    pub product: Option<String>,
    pub max_line_length: usize,
    /// Banner written at the top of every file.
    pub copyright: String,
    /// Where to dump the options tree when an `extends` target is missing.
    pub debug_dump: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            main_module: "highcharts".to_string(),
            globals_module: "globals".to_string(),
            namespace: "Highcharts".to_string(),
            product: None,
            max_line_length: 80,
            copyright: String::new(),
            debug_dump: None,
        }
    }
}

/// `[see]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SeeConfig {
    /// Base URL of the options reference.
    pub options_url: Option<String>,
    /// Base URL of the class reference.
    pub class_url: Option<String>,
}

impl Config {
    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| GenerateError::io(path, err))?;
        Ok(Self::parse(&content)?)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `tsdgen.toml` from the working directory, or defaults when the
    /// file does not exist.
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// A quoted literal, a dotted identifier, or the `*` wildcard.
static TYPE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*|\*"#)
        .unwrap()
});

/// JSDoc generic syntax: `Array.<T>`.
static JSDOC_GENERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*<").unwrap());

impl TypeMapper for Config {
    fn map_type(&self, ty: &str) -> String {
        let ty = JSDOC_GENERIC_RE.replace_all(ty.trim(), "<");
        TYPE_TOKEN_RE
            .replace_all(&ty, |caps: &Captures<'_>| {
                let token = &caps[0];
                if let Some(mapped) = self.types.get(token) {
                    return mapped.clone();
                }
                match token {
                    "*" => "any".to_string(),
                    "function" => "Function".to_string(),
                    _ if token.starts_with('\'') => requote(token),
                    _ => token.to_string(),
                }
            })
            .into_owned()
    }

    fn map_value(&self, value: &str) -> String {
        let value = value.trim();
        if let Some(mapped) = self.values.get(value) {
            return mapped.clone();
        }
        if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
            return requote(value);
        }
        value.to_string()
    }

    fn see_link(&self, name: &str, kind: LinkKind) -> Option<String> {
        let base = match kind {
            LinkKind::Option => self.see.options_url.as_deref()?,
            LinkKind::Class => self.see.class_url.as_deref()?,
        };
        Some(format!("{base}{name}"))
    }
}

/// Turn a single-quoted literal into a double-quoted one.
fn requote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let unescaped = inner.replace("\\'", "'");
    serde_json::to_string(&unescaped).unwrap_or_else(|_| format!("\"{unescaped}\""))
}
