//! Options doclet tree and its preparation passes.
//!
//! The raw dump mirrors the chart configuration object: every node has a
//! doclet, a meta record and named children. Before generation the tree is
//! filtered by product, stripped of deprecated and internal nodes, has its
//! `extends` chains resolved and gets a type for every node.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GenerateError, Result};

/// One node of the options tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OptionNode {
    #[serde(default)]
    pub doclet: OptionDoclet,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub children: IndexMap<String, OptionNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fullname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TypeNames {
    #[serde(default)]
    pub names: Vec<String>,
}

/// Documentation record of one option.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OptionDoclet {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub type_names: Option<TypeNames>,
    #[serde(rename = "defaultvalue", default)]
    pub default_value: Option<Value>,
    /// Products this option belongs to; empty means all.
    #[serde(default)]
    pub products: Option<Vec<String>>,
    #[serde(default)]
    pub deprecated: Option<Value>,
    #[serde(default)]
    pub internal: Option<bool>,
    #[serde(default)]
    pub access: Option<String>,
    /// Unresolved comma separated list of option paths to inherit from.
    #[serde(default)]
    pub extends: Option<String>,
    /// Inherited children to drop again after `extends` resolution.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Option paths this node inherited from.
    #[serde(rename = "_extends", default)]
    pub resolved_extends: Vec<String>,
    /// Allowed values, as a JSON array or a string holding one.
    #[serde(default)]
    pub values: Option<Value>,
    #[serde(default)]
    pub see: Vec<String>,
}

impl OptionDoclet {
    pub fn is_private(&self) -> bool {
        self.access.as_deref() == Some("private")
    }

    pub fn is_deprecated(&self) -> bool {
        match &self.deprecated {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.internal.unwrap_or(false)
    }

    pub fn available_for(&self, product: &str) -> bool {
        match &self.products {
            Some(products) if !products.is_empty() => products.iter().any(|p| p == product),
            _ => true,
        }
    }

    pub fn type_names(&self) -> &[String] {
        self.type_names
            .as_ref()
            .map(|types| types.names.as_slice())
            .unwrap_or_default()
    }

    fn set_type_names(&mut self, names: Vec<String>) {
        self.type_names = Some(TypeNames { names });
    }

    /// String values listed in `values`, as double-quoted literals.
    pub fn literal_values(&self) -> Vec<String> {
        let items = match &self.values {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::String(text)) => serde_json::from_str::<Vec<Value>>(text).unwrap_or_default(),
            _ => Vec::new(),
        };
        items
            .iter()
            .filter_map(|item| item.as_str())
            .filter_map(|item| serde_json::to_string(item).ok())
            .collect()
    }

    /// Default value as documentation text.
    pub fn default_text(&self) -> Option<String> {
        match self.default_value.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Fill fields that are missing here from an inherited doclet.
    fn inherit_from(&mut self, other: &OptionDoclet) {
        if self.description.as_deref().map_or(true, str::is_empty) {
            self.description = other.description.clone();
        }
        if self.type_names().is_empty() && !other.type_names().is_empty() {
            self.type_names = other.type_names.clone();
        }
        if self.default_value.is_none() {
            self.default_value = other.default_value.clone();
        }
        if self.values.is_none() {
            self.values = other.values.clone();
        }
    }
}

/// Settings for preparing an options tree.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Keep only options documented for this product.
    pub product: Option<String>,
    /// Where to write a skeleton of the tree when an `extends` target is missing.
    pub debug_dump: Option<PathBuf>,
}

/// Read an options dump and prepare it for generation.
pub fn load(path: &Path, options: &ParseOptions) -> Result<OptionNode> {
    let mut root: OptionNode = super::read_json(path)?;
    prepare(&mut root, options)?;
    Ok(root)
}

/// Run all preparation passes on a decoded options tree.
pub fn prepare(root: &mut OptionNode, options: &ParseOptions) -> Result<()> {
    if let Some(product) = options.product.as_deref() {
        filter_products(root, product);
    }
    prune(root);
    let mut path = Vec::new();
    resolve_all_extends(root, &mut path, options.debug_dump.as_deref())?;
    annotate(root, "");
    infer_types(root);
    debug!(options = count_nodes(root), "prepared options tree");
    Ok(())
}

fn filter_products(node: &mut OptionNode, product: &str) {
    node.children.retain(|_, child| child.doclet.available_for(product));
    for child in node.children.values_mut() {
        filter_products(child, product);
    }
}

fn prune(node: &mut OptionNode) {
    node.children
        .retain(|_, child| !child.doclet.is_deprecated() && !child.doclet.is_internal());
    for child in node.children.values_mut() {
        prune(child);
    }
}

fn annotate(node: &mut OptionNode, path: &str) {
    for (name, child) in node.children.iter_mut() {
        let fullname = if path.is_empty() {
            name.clone()
        } else {
            format!("{path}.{name}")
        };
        child.meta.name = name.clone();
        annotate(child, &fullname);
        child.meta.fullname = fullname;
    }
}

fn count_nodes(node: &OptionNode) -> usize {
    1 + node.children.values().map(count_nodes).sum::<usize>()
}

/// Option paths named by an `extends` value, e.g. `{series,plotOptions.line}`.
fn split_extends(extends: &str) -> Vec<String> {
    extends
        .replace(['{', '}'], "")
        .split(',')
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .collect()
}

fn find<'a>(root: &'a OptionNode, path: &[String]) -> Option<&'a OptionNode> {
    path.iter()
        .try_fold(root, |node, segment| node.children.get(segment))
}

fn find_mut<'a>(root: &'a mut OptionNode, path: &[String]) -> Option<&'a mut OptionNode> {
    path.iter()
        .try_fold(root, |node, segment| node.children.get_mut(segment))
}

fn resolve_all_extends(
    root: &mut OptionNode,
    path: &mut Vec<String>,
    dump: Option<&Path>,
) -> Result<()> {
    if !path.is_empty() {
        resolve_extends(root, path, &mut Vec::new(), dump)?;
    }
    let names: Vec<String> = match find(root, path) {
        Some(node) => node.children.keys().cloned().collect(),
        None => return Ok(()),
    };
    for name in names {
        path.push(name);
        resolve_all_extends(root, path, dump)?;
        path.pop();
    }
    Ok(())
}

/// Resolve the `extends` of one node, resolving its targets first.
fn resolve_extends(
    root: &mut OptionNode,
    path: &[String],
    stack: &mut Vec<String>,
    dump: Option<&Path>,
) -> Result<()> {
    let full = path.join(".");
    let extends = match find(root, path) {
        Some(node) => match &node.doclet.extends {
            Some(extends) => extends.clone(),
            None => return Ok(()),
        },
        None => return Err(GenerateError::missing(full, "option path")),
    };
    if let Some(position) = stack.iter().position(|entry| *entry == full) {
        let mut chain = stack[position..].to_vec();
        chain.push(full);
        return Err(GenerateError::CyclicExtends { chain });
    }

    stack.push(full.clone());
    let targets = split_extends(&extends);
    let mut inherited: IndexMap<String, OptionNode> = IndexMap::new();
    for target in &targets {
        let target_path: Vec<String> = target.split('.').map(str::to_string).collect();
        if find(root, &target_path).is_none() {
            if let Some(dump) = dump {
                write_debug_dump(root, dump);
            }
            return Err(GenerateError::missing(
                target.as_str(),
                format!("extends target of `{full}`"),
            ));
        }
        resolve_extends(root, &target_path, stack, dump)?;

        let Some(target_node) = find(root, &target_path) else {
            continue;
        };
        for (name, child) in &target_node.children {
            let mut child_path = target_path.clone();
            child_path.push(name.clone());
            // Never copy the inheriting node into itself.
            if path.starts_with(&child_path) || inherited.contains_key(name) {
                continue;
            }
            inherited.insert(name.clone(), child.clone());
        }
    }
    stack.pop();

    let node = find_mut(root, path).ok_or_else(|| GenerateError::missing(full.as_str(), "option path"))?;
    node.doclet.extends = None;
    node.doclet.resolved_extends = targets;
    merge_missing(&mut node.children, inherited);
    for excluded in node.doclet.excludes.clone() {
        node.children.shift_remove(&excluded);
    }
    debug!(option = %full, inherits = ?node.doclet.resolved_extends, "resolved extends");
    Ok(())
}

/// Add inherited children without overriding what the node defines itself.
fn merge_missing(target: &mut IndexMap<String, OptionNode>, source: IndexMap<String, OptionNode>) {
    for (name, child) in source {
        match target.get_mut(&name) {
            Some(existing) => {
                existing.doclet.inherit_from(&child.doclet);
                merge_missing(&mut existing.children, child.children);
            }
            None => {
                target.insert(name, child);
            }
        }
    }
}

/// Nested child names only, for debugging broken `extends` chains.
fn skeleton(node: &OptionNode) -> Value {
    Value::Object(
        node.children
            .iter()
            .map(|(name, child)| (name.clone(), skeleton(child)))
            .collect(),
    )
}

fn write_debug_dump(root: &OptionNode, path: &Path) {
    let written = serde_json::to_string_pretty(&skeleton(root))
        .map_err(std::io::Error::from)
        .and_then(|json| fs::write(path, json));
    match written {
        Ok(()) => debug!(path = %path.display(), "wrote options debug dump"),
        Err(err) => warn!(path = %path.display(), "could not write options debug dump: {err}"),
    }
}

/// Give every node a type: explicit names win, otherwise leaves infer one
/// from their default value and branches become `*`.
fn infer_types(node: &mut OptionNode) {
    for child in node.children.values_mut() {
        if child.doclet.type_names().is_empty() {
            let inferred = if !child.children.is_empty() {
                "*"
            } else {
                match &child.doclet.default_value {
                    Some(Value::Bool(_)) => "boolean",
                    Some(Value::String(text)) if text == "true" || text == "false" => "boolean",
                    Some(Value::Null) | None => "object",
                    // Numbers and non-numeric strings alike.
                    Some(_) => "number",
                }
            };
            child.doclet.set_type_names(vec![inferred.to_string()]);
        }
        infer_types(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn tree(value: Value) -> OptionNode {
        serde_json::from_value(value).unwrap()
    }

    fn prepared(value: Value) -> OptionNode {
        let mut root = tree(value);
        prepare(&mut root, &ParseOptions::default()).unwrap();
        root
    }

    #[test]
    fn filters_by_product() {
        let mut root = tree(json!({
            "children": {
                "navigator": { "doclet": { "products": ["highstock"] } },
                "chart": { "doclet": { "products": ["highcharts", "highstock"] } },
                "title": {}
            }
        }));
        let options = ParseOptions {
            product: Some("highcharts".to_string()),
            ..Default::default()
        };
        prepare(&mut root, &options).unwrap();
        let names: Vec<_> = root.children.keys().cloned().collect();
        assert_eq!(names, vec!["chart", "title"]);
    }

    #[test]
    fn prunes_deprecated_and_internal() {
        let root = prepared(json!({
            "children": {
                "old": { "doclet": { "deprecated": true } },
                "hidden": { "doclet": { "internal": true } },
                "legacy": { "doclet": { "deprecated": "since 7" } },
                "kept": { "doclet": { "deprecated": false } }
            }
        }));
        assert_eq!(root.children.keys().collect::<Vec<_>>(), vec!["kept"]);
    }

    #[test]
    fn resolves_extends_without_override() {
        let root = prepared(json!({
            "children": {
                "plotOptions": { "children": {
                    "series": { "children": {
                        "lineWidth": { "doclet": { "defaultvalue": 2, "description": "Width." } },
                        "marker": { "children": { "enabled": { "doclet": { "defaultvalue": true } } } },
                        "dataParser": {}
                    } },
                    "line": {
                        "doclet": { "extends": "{plotOptions.series}", "excludes": ["dataParser"] },
                        "children": {
                            "lineWidth": { "doclet": { "defaultvalue": 3 } }
                        }
                    }
                } }
            }
        }));
        let line = &root.children["plotOptions"].children["line"];
        assert_eq!(line.doclet.resolved_extends, vec!["plotOptions.series"]);
        assert!(line.doclet.extends.is_none());
        assert_eq!(line.children["lineWidth"].doclet.default_value, Some(json!(3)));
        assert_eq!(
            line.children["lineWidth"].doclet.description.as_deref(),
            Some("Width.")
        );
        assert!(line.children.contains_key("marker"));
        assert!(!line.children.contains_key("dataParser"));
        assert_eq!(line.children["marker"].meta.fullname, "plotOptions.line.marker");
    }

    #[test]
    fn resolves_targets_first() {
        let root = prepared(json!({
            "children": {
                "a": { "doclet": { "extends": "b" } },
                "b": { "doclet": { "extends": "c" } },
                "c": { "children": { "x": {} } }
            }
        }));
        assert!(root.children["a"].children.contains_key("x"));
        assert!(root.children["b"].children.contains_key("x"));
    }

    #[test]
    fn does_not_copy_node_into_itself() {
        let root = prepared(json!({
            "children": {
                "series": { "children": {
                    "data": {},
                    "line": { "doclet": { "extends": "series" } }
                } }
            }
        }));
        let line = &root.children["series"].children["line"];
        assert!(line.children.contains_key("data"));
        assert!(!line.children.contains_key("line"));
    }

    #[test]
    fn reports_cyclic_extends() {
        let mut root = tree(json!({
            "children": {
                "a": { "doclet": { "extends": "b" } },
                "b": { "doclet": { "extends": "a" } }
            }
        }));
        let err = prepare(&mut root, &ParseOptions::default()).unwrap_err();
        match err {
            GenerateError::CyclicExtends { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_target_writes_debug_dump() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("tree-debug.json");
        let mut root = tree(json!({
            "children": {
                "chart": { "doclet": { "extends": "plotOptions.nothing", "description": "x" } }
            }
        }));
        let options = ParseOptions {
            debug_dump: Some(dump.clone()),
            ..Default::default()
        };
        let err = prepare(&mut root, &options).unwrap_err();
        assert!(matches!(err, GenerateError::MissingReference { ref name, .. } if name == "plotOptions.nothing"));

        let written: Value = serde_json::from_str(&fs::read_to_string(dump).unwrap()).unwrap();
        assert_eq!(written, json!({ "chart": {} }));
    }

    #[test]
    fn infers_types() {
        let root = prepared(json!({
            "children": {
                "enabled": { "doclet": { "defaultvalue": true } },
                "animation": { "doclet": { "defaultvalue": "false" } },
                "width": { "doclet": { "defaultvalue": 10 } },
                "align": { "doclet": { "defaultvalue": "center" } },
                "style": {},
                "title": { "children": { "text": { "doclet": { "type": { "names": ["string"] } } } } }
            }
        }));
        let names = |key: &str| root.children[key].doclet.type_names().to_vec();
        assert_eq!(names("enabled"), vec!["boolean"]);
        assert_eq!(names("animation"), vec!["boolean"]);
        assert_eq!(names("width"), vec!["number"]);
        assert_eq!(names("align"), vec!["number"]);
        assert_eq!(names("style"), vec!["object"]);
        assert_eq!(names("title"), vec!["*"]);
        assert_eq!(root.children["title"].children["text"].doclet.type_names(), ["string"]);
    }

    #[test]
    fn reads_literal_values() {
        let doclet: OptionDoclet =
            serde_json::from_value(json!({ "values": "[\"left\", \"center\", null]" })).unwrap();
        assert_eq!(doclet.literal_values(), vec!["\"left\"", "\"center\""]);
        let doclet: OptionDoclet = serde_json::from_value(json!({ "values": ["a", "b"] })).unwrap();
        assert_eq!(doclet.literal_values(), vec!["\"a\"", "\"b\""]);
    }
}
