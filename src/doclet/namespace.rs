//! Namespace doclet tree: classes, functions, namespaces and typedefs,
//! grouped by the source file that documents them.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Result;
use crate::session::{GenerationSession, WarningKind};

/// One documented entity and its members.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NamespaceNode {
    #[serde(default)]
    pub doclet: NamespaceDoclet,
    #[serde(default)]
    pub children: Vec<NamespaceNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceDoclet {
    /// `global`, `namespace`, `class`, `constructor`, `function`,
    /// `interface`, `member`, `event`, `external` or `typedef`.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Property types, extended types or alias types.
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub parameters: Option<IndexMap<String, ParameterDoclet>>,
    #[serde(rename = "return", default)]
    pub return_value: Option<ReturnDoclet>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub see: Vec<String>,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(rename = "uniqueID", default)]
    pub unique_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDoclet {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub is_optional: bool,
    /// Rest parameter.
    #[serde(default)]
    pub is_variable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReturnDoclet {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl NamespaceDoclet {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Whether parameter or return information is documented.
    pub fn is_callable(&self) -> bool {
        self.parameters.is_some() || self.return_value.is_some()
    }

    fn same_entity(&self, other: &NamespaceDoclet) -> bool {
        let mut left = self.clone();
        let mut right = other.clone();
        left.unique_id = None;
        right.unique_id = None;
        left == right
    }
}

/// Namespace doclets of every source file, keyed by module key.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTree {
    pub files: IndexMap<String, NamespaceNode>,
}

/// Read a namespace dump and prepare it for generation.
pub fn load(path: &Path, session: &mut GenerationSession) -> Result<NamespaceTree> {
    let raw: IndexMap<String, NamespaceNode> = super::read_json(path)?;
    Ok(prepare(raw, session))
}

/// Normalise file keys, drop repeated doclets and assign unique ids.
pub fn prepare(raw: IndexMap<String, NamespaceNode>, session: &mut GenerationSession) -> NamespaceTree {
    let mut files: IndexMap<String, NamespaceNode> = IndexMap::new();
    for (path, mut node) in raw {
        let key = module_key(&path);
        drop_duplicates(&mut node, &key, session);
        assign_unique_ids(&mut node, session);
        match files.get_mut(&key) {
            Some(existing) => existing.children.extend(node.children),
            None => {
                files.insert(key, node);
            }
        }
    }
    NamespaceTree { files }
}

/// Turn a source path into a POSIX module key without extension.
pub fn module_key(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.trim_start_matches("./");
    for extension in [".src.js", ".src.ts", ".d.ts", ".js", ".ts"] {
        if let Some(stem) = path.strip_suffix(extension) {
            return stem.to_string();
        }
    }
    path.to_string()
}

fn drop_duplicates(node: &mut NamespaceNode, file: &str, session: &mut GenerationSession) {
    let mut kept: Vec<NamespaceNode> = Vec::with_capacity(node.children.len());
    for child in std::mem::take(&mut node.children) {
        match kept
            .iter_mut()
            .find(|other| other.doclet.same_entity(&child.doclet))
        {
            Some(existing) => {
                session.warn(
                    WarningKind::Duplicate,
                    format!(
                        "dropped repeated {} `{}` in {file}",
                        child.doclet.kind, child.doclet.name
                    ),
                );
                existing.children.extend(child.children);
            }
            None => kept.push(child),
        }
    }
    for child in &mut kept {
        drop_duplicates(child, file, session);
    }
    node.children = kept;
}

fn assign_unique_ids(node: &mut NamespaceNode, session: &mut GenerationSession) {
    if node.doclet.unique_id.is_none() {
        node.doclet.unique_id = Some(session.next_unique_id());
    }
    for child in &mut node.children {
        assign_unique_ids(child, session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> IndexMap<String, NamespaceNode> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalises_module_keys() {
        assert_eq!(module_key("highcharts.src.js"), "highcharts");
        assert_eq!(module_key("./modules/exporting.js"), "modules/exporting");
        assert_eq!(module_key("modules\\data.ts"), "modules/data");
        assert_eq!(module_key("globals"), "globals");
    }

    #[test]
    fn drops_exact_duplicates_and_keeps_overloads() {
        let mut session = GenerationSession::default();
        let tree = prepare(
            raw(json!({
                "highcharts.src.js": {
                    "doclet": { "kind": "global" },
                    "children": [
                        { "doclet": { "kind": "function", "name": "chart", "uniqueID": 7 },
                          "children": [] },
                        { "doclet": { "kind": "function", "name": "chart" } },
                        { "doclet": { "kind": "function", "name": "chart",
                                      "parameters": { "options": { "types": ["Highcharts.Options"] } } } }
                    ]
                }
            })),
            &mut session,
        );

        let file = &tree.files["highcharts"];
        assert_eq!(file.children.len(), 2);
        assert_eq!(file.children[0].doclet.unique_id, Some(7));
        assert!(file.children[1].doclet.parameters.is_some());
        assert_eq!(session.warnings().len(), 1);
        assert_eq!(session.warnings()[0].kind, WarningKind::Duplicate);
    }

    #[test]
    fn assigns_sequential_unique_ids() {
        let mut session = GenerationSession::default();
        let tree = prepare(
            raw(json!({
                "a.js": { "doclet": { "kind": "global" },
                          "children": [ { "doclet": { "kind": "class", "name": "A" } } ] }
            })),
            &mut session,
        );
        let file = &tree.files["a"];
        assert_eq!(file.doclet.unique_id, Some(1));
        assert_eq!(file.children[0].doclet.unique_id, Some(2));
    }

    #[test]
    fn reads_camel_case_flags() {
        let doclet: NamespaceDoclet = serde_json::from_value(json!({
            "kind": "member",
            "name": "renderer",
            "isReadOnly": true,
            "isStatic": true,
            "return": { "types": ["void"] }
        }))
        .unwrap();
        assert!(doclet.is_read_only && doclet.is_static);
        assert!(doclet.is_callable());
    }
}
