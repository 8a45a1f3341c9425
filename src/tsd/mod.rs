//! In-memory model of emitted TypeScript declarations.
//!
//! Every declaration lives in a [`Forest`] arena and is addressed by a
//! [`DeclarationId`]. A parent owns its children through its `children`
//! list; the `parent` link on a child is only a back-reference used for full
//! names and scope-dependent rendering.
//!
//! Parameters are owned by their function-like declaration through a
//! separate `parameters` list and are not regular tree members: the
//! logical parent of a parameter is the parent of its owner.

mod render;
pub mod text;

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::error::StructuralError;

/// Handle of a declaration inside a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationId(u32);

impl DeclarationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Syntax kind of a declaration, used for scoping and child ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Global,
    Module,
    Namespace,
    Type,
    Interface,
    Class,
    Constant,
    StaticProperty,
    StaticFunction,
    Constructor,
    Property,
    Event,
    Function,
    Parameter,
}

impl DeclarationKind {
    /// Position in the child ordering of a container.
    ///
    /// Rank 4 belongs to enums, which this generator never emits.
    pub fn rank(self) -> u8 {
        match self {
            DeclarationKind::Global => 0,
            DeclarationKind::Type => 1,
            DeclarationKind::Interface => 2,
            DeclarationKind::Constant => 3,
            DeclarationKind::Class => 5,
            DeclarationKind::StaticProperty => 6,
            DeclarationKind::StaticFunction => 7,
            DeclarationKind::Constructor => 8,
            DeclarationKind::Property => 9,
            DeclarationKind::Event => 10,
            DeclarationKind::Function => 11,
            DeclarationKind::Parameter => 12,
            DeclarationKind::Module => 13,
            DeclarationKind::Namespace => 14,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationKind::Global => "global",
            DeclarationKind::Module => "module",
            DeclarationKind::Namespace => "namespace",
            DeclarationKind::Type => "type",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Class => "class",
            DeclarationKind::Constant => "constant",
            DeclarationKind::StaticProperty => "static property",
            DeclarationKind::StaticFunction => "static function",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Property => "property",
            DeclarationKind::Event => "event",
            DeclarationKind::Function => "function",
            DeclarationKind::Parameter => "parameter",
        }
    }

    /// Kinds that start a new naming scope: their children's full names
    /// do not include the container's name.
    pub fn is_naming_root(self) -> bool {
        matches!(self, DeclarationKind::Global | DeclarationKind::Module)
    }

    /// Kinds whose members are emitted as standalone statements.
    pub fn is_namespace_like(self) -> bool {
        matches!(
            self,
            DeclarationKind::Global | DeclarationKind::Module | DeclarationKind::Namespace
        )
    }

    /// Kinds whose same-named siblings are overloads.
    pub fn is_overloadable(self) -> bool {
        matches!(
            self,
            DeclarationKind::Constructor | DeclarationKind::Function | DeclarationKind::StaticFunction
        )
    }

    /// Kinds that may not appear twice with the same name in one container.
    fn is_unique(self) -> bool {
        matches!(
            self,
            DeclarationKind::Type
                | DeclarationKind::Class
                | DeclarationKind::Constant
                | DeclarationKind::StaticProperty
                | DeclarationKind::Property
                | DeclarationKind::Event
                | DeclarationKind::Namespace
                | DeclarationKind::Module
                | DeclarationKind::Global
        )
    }
}

/// Data carried by a file-level module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    /// POSIX module key without extension, e.g. `modules/exporting`.
    pub path: String,
    /// Import statements, one per line.
    pub imports: Vec<String>,
    /// Export statements, one per line.
    pub exports: Vec<String>,
    /// Banner text written as the leading comment.
    pub copyright: String,
}

/// Concrete construct a declaration renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// One output file.
    Module(ModuleInfo),
    /// `declare module "path" { ... }`
    ExternalModule { path: String },
    /// `declare global { ... }`
    Global,
    Namespace,
    /// `type Name = A|B;`
    Type,
    /// `type Name = (params) => R;`
    FunctionType,
    Interface,
    Class,
    Constructor,
    Function,
    Event,
    Property,
    Parameter { variadic: bool },
}

/// One node of the declaration forest.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Leaf name, e.g. `Chart` for `Highcharts.Chart`.
    pub name: String,
    pub variant: Variant,
    pub description: String,
    /// Type expressions: property types, return types, or extended types.
    pub types: Vec<String>,
    pub default_value: Option<String>,
    pub see: Vec<String>,
    pub is_optional: bool,
    pub is_private: bool,
    pub is_static: bool,
    /// Only rendered for properties.
    pub is_read_only: bool,
    /// Identity marker that survives cloning and relocation.
    pub unique_id: u64,
    parent: Option<DeclarationId>,
    children: Vec<DeclarationId>,
    parameters: Vec<DeclarationId>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, variant: Variant) -> Self {
        Self {
            name: name.into(),
            variant,
            description: String::new(),
            types: Vec::new(),
            default_value: None,
            see: Vec::new(),
            is_optional: false,
            is_private: false,
            is_static: false,
            is_read_only: false,
            unique_id: 0,
            parent: None,
            children: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn module(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            path.clone(),
            Variant::Module(ModuleInfo {
                path,
                ..ModuleInfo::default()
            }),
        )
    }

    pub fn external_module(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(path.clone(), Variant::ExternalModule { path })
    }

    pub fn global() -> Self {
        Self::new("global", Variant::Global)
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Namespace)
    }

    pub fn type_alias(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Type)
    }

    pub fn function_type(name: impl Into<String>) -> Self {
        Self::new(name, Variant::FunctionType)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Interface)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Class)
    }

    pub fn constructor() -> Self {
        Self::new("constructor", Variant::Constructor)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Function)
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Event)
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Property)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new(name, Variant::Parameter { variadic: false })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn optional(mut self, is_optional: bool) -> Self {
        self.is_optional = is_optional;
        self
    }

    /// Whether this construct owns a parameter list.
    pub fn is_extended(&self) -> bool {
        matches!(
            self.variant,
            Variant::Class | Variant::Constructor | Variant::Function | Variant::FunctionType
        )
    }

    /// Kind of this declaration when placed below a parent of `parent_kind`.
    fn kind_under(&self, parent_kind: Option<DeclarationKind>) -> DeclarationKind {
        match &self.variant {
            Variant::Module(_) | Variant::ExternalModule { .. } => DeclarationKind::Module,
            Variant::Global => DeclarationKind::Global,
            Variant::Namespace => DeclarationKind::Namespace,
            Variant::Type | Variant::FunctionType => DeclarationKind::Type,
            Variant::Interface => DeclarationKind::Interface,
            Variant::Class => DeclarationKind::Class,
            Variant::Constructor => DeclarationKind::Constructor,
            Variant::Event => DeclarationKind::Event,
            Variant::Parameter { .. } => DeclarationKind::Parameter,
            Variant::Function if self.is_static => DeclarationKind::StaticFunction,
            Variant::Function => DeclarationKind::Function,
            Variant::Property if self.is_static => DeclarationKind::StaticProperty,
            Variant::Property if parent_kind.is_some_and(DeclarationKind::is_namespace_like) => {
                DeclarationKind::Constant
            }
            Variant::Property => DeclarationKind::Property,
        }
    }

    /// Merge documentation and types of `other` into `self`.
    ///
    /// Returns `false` when nothing was added.
    pub fn merge_from(&mut self, other: &Declaration) -> bool {
        let mut changed = false;
        if self.description.is_empty() && !other.description.is_empty() {
            self.description = other.description.clone();
            changed = true;
        }
        if self.default_value.is_none() && other.default_value.is_some() {
            self.default_value = other.default_value.clone();
            changed = true;
        }
        for ty in &other.types {
            if !self.types.contains(ty) {
                self.types.push(ty.clone());
                changed = true;
            }
        }
        for link in &other.see {
            if !self.see.contains(link) {
                self.see.push(link.clone());
                changed = true;
            }
        }
        changed
    }
}

/// Arena holding every declaration of one generation run.
#[derive(Debug, Clone)]
pub struct Forest {
    nodes: Vec<Declaration>,
    max_line_length: usize,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_line_length: 80,
        }
    }

    /// Set the column limit used when rendering.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Store a new, detached declaration.
    pub fn insert(&mut self, mut declaration: Declaration) -> DeclarationId {
        declaration.parent = None;
        declaration.children.clear();
        declaration.parameters.clear();
        let id = DeclarationId(self.nodes.len() as u32);
        self.nodes.push(declaration);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: DeclarationId) -> &Declaration {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclarationId) -> &mut Declaration {
        &mut self.nodes[id.index()]
    }

    pub fn name(&self, id: DeclarationId) -> &str {
        &self.get(id).name
    }

    /// Logical parent. For parameters this is the parent of the owner.
    pub fn parent(&self, id: DeclarationId) -> Option<DeclarationId> {
        let parent = self.get(id).parent?;
        if matches!(self.get(id).variant, Variant::Parameter { .. }) {
            self.parent(parent)
        } else {
            Some(parent)
        }
    }

    /// Owning declaration of a parameter.
    pub fn owner(&self, parameter: DeclarationId) -> Option<DeclarationId> {
        match self.get(parameter).variant {
            Variant::Parameter { .. } => self.get(parameter).parent,
            _ => None,
        }
    }

    /// Topmost ancestor, or the node itself when detached.
    pub fn root(&self, id: DeclarationId) -> DeclarationId {
        let mut current = id;
        while let Some(parent) = self.get(current).parent {
            current = parent;
        }
        current
    }

    pub fn kind(&self, id: DeclarationId) -> DeclarationKind {
        let parent_kind = self.parent(id).map(|p| self.kind(p));
        self.get(id).kind_under(parent_kind)
    }

    /// Kind `declaration` would have once attached below `parent`.
    pub fn kind_below(&self, parent: DeclarationId, declaration: &Declaration) -> DeclarationKind {
        declaration.kind_under(Some(self.kind(parent)))
    }

    /// Dotted name from the nearest naming root down to this node.
    pub fn full_name(&self, id: DeclarationId) -> String {
        let name = &self.get(id).name;
        match self.parent(id) {
            Some(parent) if !self.kind(parent).is_naming_root() => {
                format!("{}.{}", self.full_name(parent), name)
            }
            _ => name.clone(),
        }
    }

    /// The file-level module containing this node.
    pub fn module_of(&self, id: DeclarationId) -> Option<DeclarationId> {
        let root = self.root(id);
        matches!(self.get(root).variant, Variant::Module(_)).then_some(root)
    }

    /// Outermost namespace enclosing this node, used to shorten type names.
    pub fn root_namespace(&self, id: DeclarationId) -> Option<DeclarationId> {
        let mut found = None;
        let mut current = Some(id);
        while let Some(node) = current {
            match self.get(node).variant {
                Variant::Namespace => found = Some(node),
                Variant::Module(_) | Variant::ExternalModule { .. } | Variant::Global => break,
                _ => {}
            }
            current = self.parent(node);
        }
        found
    }

    /// Children in insertion order.
    pub fn children(&self, id: DeclarationId) -> &[DeclarationId] {
        &self.get(id).children
    }

    pub fn parameters(&self, id: DeclarationId) -> &[DeclarationId] {
        &self.get(id).parameters
    }

    /// Attach detached declarations below `parent`.
    ///
    /// Rejects attaching a node to itself, attaching the root of `parent`
    /// (which would form a cycle), attaching a node that already has a
    /// parent, and repeating a name for kinds that cannot be merged by
    /// TypeScript.
    pub fn add_children(
        &mut self,
        parent: DeclarationId,
        children: &[DeclarationId],
    ) -> Result<(), StructuralError> {
        for &child in children {
            self.check_attach(parent, child)?;
            let kind = self.get(child).kind_under(Some(self.kind(parent)));
            if kind.is_unique() {
                let name = &self.get(child).name;
                let clash = self
                    .get(parent)
                    .children
                    .iter()
                    .any(|&other| self.get(other).name == *name && self.kind(other) == kind);
                if clash {
                    return Err(StructuralError::DuplicateChild {
                        parent: self.full_name(parent),
                        kind: kind.as_str().to_string(),
                        name: name.clone(),
                    });
                }
            }
            self.nodes[child.index()].parent = Some(parent);
            self.nodes[parent.index()].children.push(child);
        }
        Ok(())
    }

    /// Attach parameters to a function-like declaration.
    pub fn add_parameters(
        &mut self,
        owner: DeclarationId,
        parameters: &[DeclarationId],
    ) -> Result<(), StructuralError> {
        if !self.get(owner).is_extended() {
            return Err(StructuralError::NotExtended {
                name: self.full_name(owner),
                kind: self.kind(owner).as_str().to_string(),
            });
        }
        for &parameter in parameters {
            self.check_attach(owner, parameter)?;
            if !matches!(self.get(parameter).variant, Variant::Parameter { .. }) {
                return Err(StructuralError::NotExtended {
                    name: self.get(parameter).name.clone(),
                    kind: self.kind(parameter).as_str().to_string(),
                });
            }
            let name = &self.get(parameter).name;
            if self
                .get(owner)
                .parameters
                .iter()
                .any(|&other| self.get(other).name == *name)
            {
                return Err(StructuralError::DuplicateParameter {
                    owner: self.full_name(owner),
                    name: name.clone(),
                });
            }
            self.nodes[parameter.index()].parent = Some(owner);
            self.nodes[owner.index()].parameters.push(parameter);
        }
        Ok(())
    }

    fn check_attach(&self, parent: DeclarationId, child: DeclarationId) -> Result<(), StructuralError> {
        if child == parent {
            return Err(StructuralError::AttachToSelf {
                name: self.full_name(child),
            });
        }
        if let Some(current) = self.get(child).parent {
            return Err(StructuralError::AlreadyParented {
                name: self.full_name(child),
                parent: self.full_name(current),
            });
        }
        if self.root(parent) == child {
            return Err(StructuralError::AttachToAncestor {
                name: self.full_name(child),
                parent: self.full_name(parent),
            });
        }
        Ok(())
    }

    /// Detach every child named `name` (overloads included).
    pub fn remove_child(&mut self, parent: DeclarationId, name: &str) -> Vec<DeclarationId> {
        let (removed, kept): (Vec<_>, Vec<_>) = self.nodes[parent.index()]
            .children
            .iter()
            .copied()
            .partition(|&child| self.nodes[child.index()].name == name);
        self.nodes[parent.index()].children = kept;
        for &child in &removed {
            self.nodes[child.index()].parent = None;
        }
        removed
    }

    /// Detach all children.
    pub fn remove_children(&mut self, parent: DeclarationId) -> Vec<DeclarationId> {
        let removed = std::mem::take(&mut self.nodes[parent.index()].children);
        for &child in &removed {
            self.nodes[child.index()].parent = None;
        }
        removed
    }

    /// Detach the parameter at `index`.
    pub fn remove_parameter(&mut self, owner: DeclarationId, index: usize) -> Option<DeclarationId> {
        let parameters = &mut self.nodes[owner.index()].parameters;
        if index >= parameters.len() {
            return None;
        }
        let parameter = parameters.remove(index);
        self.nodes[parameter.index()].parent = None;
        Some(parameter)
    }

    /// All children in output order.
    ///
    /// Sorted by kind rank, then case-insensitive name, then parameter count
    /// for constructors and functions so overloads read shortest first.
    pub fn get_children(&self, id: DeclarationId) -> Vec<DeclarationId> {
        let mut children = self.get(id).children.clone();
        children.sort_by(|&a, &b| {
            let (kind_a, kind_b) = (self.kind(a), self.kind(b));
            kind_a
                .rank()
                .cmp(&kind_b.rank())
                .then_with(|| {
                    self.name(a)
                        .to_lowercase()
                        .cmp(&self.name(b).to_lowercase())
                })
                .then_with(|| {
                    if kind_a == kind_b && kind_a.is_overloadable() {
                        self.parameters(a).len().cmp(&self.parameters(b).len())
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
        });
        children
    }

    /// Children named `name`, in insertion order.
    pub fn get_children_named(&self, id: DeclarationId, name: &str) -> Vec<DeclarationId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .filter(|&child| self.name(child) == name)
            .collect()
    }

    /// Names of all children in output order.
    pub fn child_names(&self, id: DeclarationId) -> Vec<String> {
        self.get_children(id)
            .into_iter()
            .map(|child| self.name(child).to_string())
            .collect()
    }

    /// First child with the given name whose kind passes `filter`.
    pub fn find_child(
        &self,
        parent: DeclarationId,
        name: &str,
        filter: impl Fn(DeclarationKind) -> bool,
    ) -> Option<DeclarationId> {
        self.get(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.name(child) == name && filter(self.kind(child)))
    }

    /// Deep copy of a declaration, its parameters and its children.
    ///
    /// The copy is detached, keeps the original `unique_id` and shares no
    /// vectors with the original.
    pub fn clone_declaration(&mut self, id: DeclarationId) -> DeclarationId {
        let source = self.get(id).clone();
        let copy = self.insert(source.clone());
        for parameter in source.parameters {
            let cloned = self.clone_declaration(parameter);
            self.nodes[cloned.index()].parent = Some(copy);
            self.nodes[copy.index()].parameters.push(cloned);
        }
        for child in source.children {
            let cloned = self.clone_declaration(child);
            self.nodes[cloned.index()].parent = Some(copy);
            self.nodes[copy.index()].children.push(cloned);
        }
        copy
    }

    /// Identifier-like names referenced by this declaration's types and
    /// parameter types, optionally including all descendants.
    pub fn referenced_types(&self, id: DeclarationId, include_children: bool) -> Vec<String> {
        let mut names = IndexSet::new();
        let mut visited = HashSet::new();
        self.collect_referenced_types(id, include_children, &mut names, &mut visited);
        names.into_iter().collect()
    }

    fn collect_referenced_types(
        &self,
        id: DeclarationId,
        include_children: bool,
        names: &mut IndexSet<String>,
        visited: &mut HashSet<DeclarationId>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let declaration = self.get(id);
        names.extend(text::extract_type_names(&declaration.types));
        for &parameter in &declaration.parameters {
            names.extend(text::extract_type_names(&self.get(parameter).types));
        }
        if include_children {
            for &child in &declaration.children {
                self.collect_referenced_types(child, true, names, visited);
            }
        }
    }

    /// Whether `ancestor` lies on the parent chain of `id`.
    pub fn is_descendant_of(&self, id: DeclarationId, ancestor: DeclarationId) -> bool {
        let mut current = self.get(id).parent;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get(node).parent;
        }
        false
    }
}
