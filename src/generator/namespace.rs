//! Namespace-tree generator.
//!
//! Walks the per-file namespace doclets and merges them into modules: the
//! main module extends the root namespace built by the option generator,
//! every other source file becomes a wrapper module that re-opens the root
//! namespace through `declare module` and exports a `factory` function, and
//! doclets flagged global land in the shared globals module.

use indexmap::IndexMap;
use tracing::debug;

use super::{attach, attach_or_merge, relative_module_path, MainModule};
use crate::config::{GeneratorConfig, LinkKind, TypeMapper};
use crate::doclet::{NamespaceDoclet, NamespaceNode, NamespaceTree};
use crate::error::Result;
use crate::session::{GenerationSession, WarningKind};
use crate::tsd::{Declaration, DeclarationId, DeclarationKind, Forest, ModuleInfo, Variant};

/// The shared globals module and its `declare global` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalsModule {
    pub module: DeclarationId,
    pub global: DeclarationId,
}

pub struct NamespaceGenerator<'a> {
    session: &'a mut GenerationSession,
    mapper: &'a dyn TypeMapper,
    config: &'a GeneratorConfig,
    main: MainModule,
    globals: GlobalsModule,
    /// Secondary modules by module key.
    modules: IndexMap<String, DeclarationId>,
    current_module: DeclarationId,
}

impl<'a> NamespaceGenerator<'a> {
    /// Create the generator together with the globals module.
    pub fn new(
        session: &'a mut GenerationSession,
        mapper: &'a dyn TypeMapper,
        config: &'a GeneratorConfig,
        main: MainModule,
    ) -> Result<Self> {
        let info = ModuleInfo {
            path: config.globals_module.clone(),
            imports: Vec::new(),
            exports: vec!["export {};".to_string()],
            copyright: config.copyright.clone(),
        };
        let module = session
            .forest
            .insert(Declaration::new(config.globals_module.clone(), Variant::Module(info)));
        let global = session.forest.insert(Declaration::global());
        session.forest.add_children(module, &[global])?;
        session.register_tree(module);

        Ok(Self {
            session,
            mapper,
            config,
            main,
            globals: GlobalsModule { module, global },
            modules: IndexMap::new(),
            current_module: main.module,
        })
    }

    /// Generate every file of the tree, the main module first.
    pub fn generate(&mut self, tree: &NamespaceTree) -> Result<()> {
        let main_key = self.config.main_module.clone();
        if let Some(node) = tree.files.get(&main_key) {
            self.generate_file(&main_key, node)?;
        }
        for (key, node) in &tree.files {
            if *key != main_key {
                self.generate_file(key, node)?;
            }
        }
        Ok(())
    }

    /// All modules in output order: main, globals, then secondary modules.
    pub fn modules(&self) -> Vec<DeclarationId> {
        let mut modules = vec![self.main.module, self.globals.module];
        modules.extend(self.modules.values().copied());
        modules
    }

    pub fn globals(&self) -> GlobalsModule {
        self.globals
    }

    fn generate_file(&mut self, key: &str, node: &NamespaceNode) -> Result<()> {
        self.current_module = if key == self.config.main_module {
            self.main.module
        } else if key == self.config.globals_module {
            self.globals.module
        } else {
            self.secondary_module(key)?
        };
        debug!(module = key, "generating namespace declarations");
        self.generate_node(node, self.current_module)
    }

    /// Wrapper module for a secondary source file.
    fn secondary_module(&mut self, key: &str) -> Result<DeclarationId> {
        if let Some(&module) = self.modules.get(key) {
            return Ok(module);
        }
        let namespace = &self.config.namespace;
        let info = ModuleInfo {
            path: key.to_string(),
            imports: vec![
                format!(
                    "import * as globals from \"{}\";",
                    relative_module_path(key, &self.config.globals_module)
                ),
                format!(
                    "import * as _{namespace} from \"{}\";",
                    relative_module_path(key, &self.config.main_module)
                ),
            ],
            exports: vec![
                "export default factory;".to_string(),
                format!("export let {namespace}: typeof _{namespace};"),
            ],
            copyright: self.config.copyright.clone(),
        };
        let module = self
            .session
            .forest
            .insert(Declaration::new(key.to_string(), Variant::Module(info)));

        let factory = self.session.forest.insert(
            Declaration::function("factory")
                .with_types(["void"])
                .with_description("Adds the module to the imported Highcharts namespace."),
        );
        let highcharts = self.session.forest.insert(
            Declaration::parameter("highcharts")
                .with_types([format!("typeof {namespace}")])
                .with_description("The imported Highcharts namespace to extend."),
        );
        self.session.forest.add_parameters(factory, &[highcharts])?;
        self.session.forest.add_children(module, &[factory])?;
        self.session.register_tree(module);

        self.modules.insert(key.to_string(), module);
        Ok(module)
    }

    /// The root namespace as re-opened inside a secondary module.
    fn wrapper_namespace(&mut self, module: DeclarationId) -> Result<DeclarationId> {
        let path = relative_module_path(&self.module_key(module), &self.config.main_module);
        let forest = &self.session.forest;
        let wrapper = forest
            .children(module)
            .iter()
            .copied()
            .find(|&child| matches!(forest.get(child).variant, Variant::ExternalModule { .. }));
        let wrapper = match wrapper {
            Some(wrapper) => wrapper,
            None => attach_or_merge(self.session, module, Declaration::external_module(path))?,
        };
        let mut namespace = Declaration::namespace(self.config.namespace.clone());
        namespace.unique_id = self.session.next_unique_id();
        attach_or_merge(self.session, wrapper, namespace)
    }

    fn module_key(&self, module: DeclarationId) -> String {
        match &self.session.forest.get(module).variant {
            Variant::Module(info) => info.path.clone(),
            _ => self.session.forest.name(module).to_string(),
        }
    }

    fn generate_node(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        let parent = if doclet.is_global && doclet.kind != "global" {
            self.globals.global
        } else {
            parent
        };
        match doclet.kind.as_str() {
            "global" => self.generate_global(node, parent),
            "namespace" => self.generate_namespace(node, parent),
            "class" => self.generate_class(node, parent),
            "constructor" => self.generate_constructor(node, parent),
            "external" => self.generate_external(node),
            "function" => self.generate_function(node, parent),
            "interface" => self.generate_interface(node, parent),
            "member" | "event" => self.generate_member(node, parent),
            "typedef" => self.generate_typedef(node, parent),
            other => {
                self.session.warn(
                    WarningKind::Unsupported,
                    format!("skipped `{}`: unknown doclet kind `{other}`", doclet.name),
                );
                Ok(())
            }
        }
    }

    fn generate_children(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        for child in &node.children {
            self.generate_node(child, parent)?;
        }
        Ok(())
    }

    /// File boundary: members collected so far move onto the module.
    fn generate_global(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let module = self.current_module;
        if parent != module {
            for child in self.session.forest.remove_children(parent) {
                attach(self.session, module, child)?;
            }
        }
        self.generate_children(node, module)
    }

    fn generate_namespace(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        let at_file_level = parent == self.current_module;
        let target = if at_file_level && doclet.name == self.config.namespace {
            if self.current_module == self.main.module {
                self.main.namespace
            } else if self.current_module == self.globals.module {
                self.globals.global
            } else {
                self.wrapper_namespace(self.current_module)?
            }
        } else {
            let declaration = self.describe(parent, Declaration::namespace(&doclet.name), doclet);
            attach_or_merge(self.session, parent, declaration)?
        };
        let declaration = self.session.forest.get_mut(target);
        if declaration.description.is_empty() {
            declaration.description = doclet.description().to_string();
        }
        self.generate_children(node, target)
    }

    fn generate_class(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        let full_name = self.child_full_name(parent, &doclet.name);
        let target = if self.session.is_declared_elsewhere(&full_name, self.current_module) {
            debug!(class = %full_name, "declared in another module, emitting merge interface");
            let declaration = self.describe(parent, Declaration::interface(&doclet.name), doclet);
            attach_or_merge(self.session, parent, declaration)?
        } else {
            let types = self.map_types(&doclet.types);
            let declaration =
                self.describe(parent, Declaration::class(&doclet.name).with_types(types), doclet);
            let class = attach_or_merge(self.session, parent, declaration)?;
            if doclet.parameters.is_some() {
                let mut constructor = Declaration::constructor();
                constructor.unique_id = self.session.next_unique_id();
                self.generate_callable(class, constructor, doclet)?;
            }
            class
        };
        self.generate_children(node, target)
    }

    fn generate_constructor(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        if self.session.forest.kind(parent) != DeclarationKind::Class {
            debug!(parent = %self.session.forest.full_name(parent), "skipped constructor outside a class");
            return Ok(());
        }
        let declaration = self.describe(parent, Declaration::constructor(), &node.doclet);
        self.generate_callable(parent, declaration, &node.doclet)?;
        Ok(())
    }

    /// Ambient interface in the globals module, e.g. a DOM type.
    fn generate_external(&mut self, node: &NamespaceNode) -> Result<()> {
        let global = self.globals.global;
        let declaration = self.describe(global, Declaration::interface(&node.doclet.name), &node.doclet);
        let interface = attach_or_merge(self.session, global, declaration)?;
        self.generate_children(node, interface)
    }

    fn generate_function(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        if self.skips_static(parent, doclet) {
            return Ok(());
        }
        let types = self.return_types(doclet);
        let declaration = self.describe(parent, Declaration::function(&doclet.name).with_types(types), doclet);
        self.generate_callable(parent, declaration, doclet)?;
        Ok(())
    }

    fn generate_interface(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        let types = self.map_types(&doclet.types);
        let declaration =
            self.describe(parent, Declaration::interface(&doclet.name).with_types(types), doclet);
        let interface = attach_or_merge(self.session, parent, declaration)?;
        self.generate_children(node, interface)
    }

    fn generate_member(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        if self.skips_static(parent, doclet) {
            return Ok(());
        }
        let types = self.map_types(&doclet.types);
        let base = if doclet.kind == "event" {
            Declaration::event(&doclet.name)
        } else {
            Declaration::property(&doclet.name)
        };
        let declaration = self.describe(parent, base.with_types(types), doclet);
        attach_or_merge(self.session, parent, declaration)?;
        Ok(())
    }

    /// Typedefs become a callable interface, a function type, a plain
    /// interface or a type alias, depending on what they document.
    fn generate_typedef(&mut self, node: &NamespaceNode, parent: DeclarationId) -> Result<()> {
        let doclet = &node.doclet;
        let full_name = self.child_full_name(parent, &doclet.name);
        let has_children = !node.children.is_empty();

        if doclet.is_callable() && has_children {
            let declaration = self.describe(parent, Declaration::interface(&doclet.name), doclet);
            let interface = attach_or_merge(self.session, parent, declaration)?;
            let mut signature = Declaration::function("").with_types(self.return_types(doclet));
            signature.unique_id = self.session.next_unique_id();
            self.generate_callable(interface, signature, doclet)?;
            return self.generate_children(node, interface);
        }

        if has_children && doclet.types.iter().any(|ty| ty != "*") {
            let declaration = self.describe(parent, Declaration::interface(&doclet.name), doclet);
            let interface = attach_or_merge(self.session, parent, declaration)?;
            return self.generate_children(node, interface);
        }

        if self.session.is_declared_elsewhere(&full_name, self.current_module) {
            debug!(typedef = %full_name, "declared in another module, skipped");
            return Ok(());
        }
        if doclet.is_callable() {
            let declaration = self.describe(
                parent,
                Declaration::function_type(&doclet.name).with_types(self.return_types(doclet)),
                doclet,
            );
            let id = self.session.forest.insert(declaration);
            self.add_parameters(id, doclet)?;
            attach(self.session, parent, id)?;
        } else {
            let types = self.map_types(&doclet.types);
            let declaration =
                self.describe(parent, Declaration::type_alias(&doclet.name).with_types(types), doclet);
            attach_or_merge(self.session, parent, declaration)?;
        }
        Ok(())
    }

    /// Attach a constructor or function with its parameters.
    ///
    /// TypeScript cannot express an optional parameter in front of a
    /// required one, so `(a?, b)` is emitted as the overloads `(a, b)` and
    /// `(b)`.
    fn generate_callable(
        &mut self,
        parent: DeclarationId,
        declaration: Declaration,
        doclet: &NamespaceDoclet,
    ) -> Result<Vec<DeclarationId>> {
        let id = self.session.forest.insert(declaration);
        self.add_parameters(id, doclet)?;

        let mut variants = vec![id];
        if needs_split(&self.session.forest, id) {
            let forest = &mut self.session.forest;
            let shorter = forest.clone_declaration(id);
            let first = forest.parameters(id)[0];
            forest.get_mut(first).is_optional = false;
            forest.remove_parameter(shorter, 0);
            variants.push(shorter);
        }

        variants
            .into_iter()
            .map(|variant| attach(self.session, parent, variant))
            .collect()
    }

    fn add_parameters(&mut self, owner: DeclarationId, doclet: &NamespaceDoclet) -> Result<()> {
        let Some(parameters) = &doclet.parameters else {
            return Ok(());
        };
        let mut ids = Vec::with_capacity(parameters.len());
        for (name, parameter) in parameters {
            // `options.title` documents a member of `options`.
            if name.contains('.') {
                continue;
            }
            let mut declaration = Declaration::new(
                name.trim_start_matches("..."),
                Variant::Parameter {
                    variadic: parameter.is_variable || name.starts_with("..."),
                },
            )
            .with_types(self.map_types(&parameter.types))
            .with_description(parameter.description.clone().unwrap_or_default())
            .optional(parameter.is_optional);
            declaration.unique_id = self.session.next_unique_id();
            ids.push(self.session.forest.insert(declaration));
        }
        self.session.forest.add_parameters(owner, &ids)?;
        Ok(())
    }

    /// Fill the shared fields of a declaration from its doclet.
    ///
    /// Without a description of its own, the declaration reuses the one of
    /// a same-named sibling with the same staticness.
    fn describe(
        &mut self,
        parent: DeclarationId,
        mut declaration: Declaration,
        doclet: &NamespaceDoclet,
    ) -> Declaration {
        declaration.description = doclet.description().to_string();
        if declaration.description.is_empty() {
            let forest = &self.session.forest;
            if let Some(sibling) = forest
                .get_children_named(parent, &doclet.name)
                .into_iter()
                .map(|sibling| forest.get(sibling))
                .find(|sibling| sibling.is_static == doclet.is_static && !sibling.description.is_empty())
            {
                declaration.description = sibling.description.clone();
            }
        }

        declaration.see = doclet.see.clone();
        if !doclet.name.is_empty() {
            let full_name = self.child_full_name(parent, &doclet.name);
            if let Some(link) = self.mapper.see_link(&full_name, LinkKind::Class) {
                if !declaration.see.contains(&link) {
                    declaration.see.push(link);
                }
            }
        }
        declaration.default_value = doclet
            .default_value
            .as_deref()
            .map(|value| self.mapper.map_value(value));
        declaration.is_optional = doclet.is_optional;
        declaration.is_private = doclet.is_private;
        declaration.is_static = doclet.is_static;
        declaration.is_read_only = doclet.is_read_only;
        declaration.unique_id = match doclet.unique_id {
            Some(id) => id,
            None => self.session.next_unique_id(),
        };
        declaration
    }

    fn skips_static(&self, parent: DeclarationId, doclet: &NamespaceDoclet) -> bool {
        let skip = doclet.is_static && self.session.forest.kind(parent) == DeclarationKind::Interface;
        if skip {
            debug!(member = %doclet.name, "skipped static member of a merge interface");
        }
        skip
    }

    fn child_full_name(&self, parent: DeclarationId, name: &str) -> String {
        let forest = &self.session.forest;
        if forest.kind(parent).is_naming_root() {
            name.to_string()
        } else {
            format!("{}.{name}", forest.full_name(parent))
        }
    }

    fn map_types(&self, types: &[String]) -> Vec<String> {
        types
            .iter()
            .map(|ty| self.mapper.map_type(ty))
            .filter(|ty| !ty.is_empty())
            .collect()
    }

    fn return_types(&self, doclet: &NamespaceDoclet) -> Vec<String> {
        doclet
            .return_value
            .as_ref()
            .map(|value| self.map_types(&value.types))
            .unwrap_or_default()
    }
}

/// Whether a leading optional parameter is followed by a required one.
fn needs_split(forest: &Forest, id: DeclarationId) -> bool {
    let parameters = forest.parameters(id);
    if parameters.len() < 2 {
        return false;
    }
    let (first, second) = (forest.get(parameters[0]), forest.get(parameters[1]));
    let variadic = |declaration: &Declaration| {
        matches!(declaration.variant, Variant::Parameter { variadic: true })
    };
    first.is_optional && !variadic(first) && !second.is_optional && !variadic(second)
}

/// Generate the namespace tree and return every module in output order.
pub fn generate_namespaces(
    session: &mut GenerationSession,
    mapper: &dyn TypeMapper,
    config: &GeneratorConfig,
    main: MainModule,
    tree: &NamespaceTree,
) -> Result<Vec<DeclarationId>> {
    let mut generator = NamespaceGenerator::new(session, mapper, config, main)?;
    generator.generate(tree)?;
    Ok(generator.modules())
}
