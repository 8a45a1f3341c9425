//! Generators that turn doclet trees into declaration modules.

pub mod namespace;
pub mod options;
pub mod relocate;

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::session::GenerationSession;
use crate::tsd::{Declaration, DeclarationId, Forest, ModuleInfo, Variant};

pub use namespace::NamespaceGenerator;
pub use options::OptionsGenerator;
pub use relocate::relocate;

/// The primary module and the root namespace it exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainModule {
    pub module: DeclarationId,
    pub namespace: DeclarationId,
}

/// Create the main module with its root namespace.
pub fn create_main_module(
    session: &mut GenerationSession,
    config: &GeneratorConfig,
) -> Result<MainModule> {
    let info = ModuleInfo {
        path: config.main_module.clone(),
        imports: vec![format!(
            "import * as globals from \"{}\";",
            relative_module_path(&config.main_module, &config.globals_module)
        )],
        exports: vec![format!("export default {};", config.namespace)],
        copyright: config.copyright.clone(),
    };
    let module = session
        .forest
        .insert(Declaration::new(config.main_module.clone(), Variant::Module(info)));
    let mut namespace = Declaration::namespace(config.namespace.clone());
    namespace.unique_id = session.next_unique_id();
    let namespace = session.forest.insert(namespace);
    session.forest.add_children(module, &[namespace])?;
    session.register_tree(module);
    Ok(MainModule { module, namespace })
}

/// Store a new declaration below `parent`, or merge it into a matching one.
pub(crate) fn attach_or_merge(
    session: &mut GenerationSession,
    parent: DeclarationId,
    declaration: Declaration,
) -> Result<DeclarationId> {
    let id = session.forest.insert(declaration);
    attach(session, parent, id)
}

/// Attach a detached declaration below `parent`.
///
/// A same-named child of the same kind absorbs the declaration instead:
/// documentation and types are merged and children move over. For
/// overloadable kinds this only happens when the signatures are identical.
/// Returns the declaration that ends up holding the content.
pub(crate) fn attach(
    session: &mut GenerationSession,
    parent: DeclarationId,
    id: DeclarationId,
) -> Result<DeclarationId> {
    let declaration = session.forest.get(id).clone();
    let kind = session.forest.kind_below(parent, &declaration);
    let forest = &session.forest;
    let existing = forest
        .get_children_named(parent, &declaration.name)
        .into_iter()
        .find(|&other| {
            other != id
                && forest.kind(other) == kind
                && (!kind.is_overloadable() || same_signature(forest, other, id))
        });

    match existing {
        Some(existing) => {
            session.forest.get_mut(existing).merge_from(&declaration);
            for child in session.forest.remove_children(id) {
                attach(session, existing, child)?;
            }
            Ok(existing)
        }
        None => {
            session.forest.add_children(parent, &[id])?;
            session.register_tree(id);
            Ok(id)
        }
    }
}

/// Whether two function-like declarations describe the same overload.
fn same_signature(forest: &Forest, a: DeclarationId, b: DeclarationId) -> bool {
    let (left, right) = (forest.get(a), forest.get(b));
    if left.types != right.types || left.is_static != right.is_static {
        return false;
    }
    let (left, right) = (forest.parameters(a), forest.parameters(b));
    left.len() == right.len()
        && left.iter().zip(right).all(|(&x, &y)| {
            let (x, y) = (forest.get(x), forest.get(y));
            x.types == y.types && x.is_optional == y.is_optional && x.variant == y.variant
        })
}

/// POSIX path from the directory of module `from` to module `to`.
///
/// `modules/exporting` -> `highcharts` gives `../highcharts`; modules in
/// the same directory get a `./` prefix.
pub fn relative_module_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = from.split('/').collect::<Vec<_>>();
    let from_dir = &from_dir[..from_dir.len().saturating_sub(1)];
    let target: Vec<&str> = to.split('/').collect();
    let target_dir = &target[..target.len().saturating_sub(1)];

    let common = from_dir
        .iter()
        .zip(target_dir)
        .take_while(|(a, b)| a == b)
        .count();
    let rest = target[common..].join("/");
    let ups = from_dir.len() - common;
    if ups == 0 {
        format!("./{rest}")
    } else {
        format!("{}{rest}", "../".repeat(ups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsd::DeclarationKind;

    #[test]
    fn relative_paths_between_modules() {
        assert_eq!(relative_module_path("modules/exporting", "highcharts"), "../highcharts");
        assert_eq!(relative_module_path("highcharts", "globals"), "./globals");
        assert_eq!(relative_module_path("a/b/x", "a/c/y"), "../c/y");
        assert_eq!(relative_module_path("a/b/x", "a/b/y"), "./y");
        assert_eq!(relative_module_path("a/b/highcharts", "globals"), "../../globals");
    }

    #[test]
    fn main_module_holds_root_namespace() {
        let mut session = GenerationSession::default();
        let main = create_main_module(&mut session, &GeneratorConfig::default()).unwrap();
        let forest = &session.forest;
        assert_eq!(forest.parent(main.namespace), Some(main.module));
        assert_eq!(forest.full_name(main.namespace), "Highcharts");
        assert_eq!(session.declarations_named("Highcharts"), &[main.namespace]);
        assert_eq!(
            forest.render(main.module, "", false),
            "import * as globals from \"./globals\";\n\nexport namespace Highcharts {}\n\nexport default Highcharts;\n"
        );
    }

    #[test]
    fn attach_merges_same_named_declarations() {
        let mut session = GenerationSession::default();
        let namespace = session.forest.insert(Declaration::namespace("Highcharts"));
        let first = attach_or_merge(
            &mut session,
            namespace,
            Declaration::interface("Chart").with_types(["Highcharts.Base"]),
        )
        .unwrap();
        let second = session
            .forest
            .insert(Declaration::interface("Chart").with_description("The chart."));
        let member = session.forest.insert(Declaration::property("title"));
        session.forest.add_children(second, &[member]).unwrap();

        assert_eq!(attach(&mut session, namespace, second).unwrap(), first);
        let forest = &session.forest;
        assert_eq!(forest.children(namespace), &[first]);
        assert_eq!(forest.get(first).description, "The chart.");
        assert_eq!(forest.children(first), &[member]);
        assert_eq!(forest.kind(member), DeclarationKind::Property);
    }

    #[test]
    fn attach_keeps_distinct_overloads() {
        let mut session = GenerationSession::default();
        let class = session.forest.insert(Declaration::class("Chart"));
        let plain = attach_or_merge(&mut session, class, Declaration::function("redraw")).unwrap();

        let with_parameter = session.forest.insert(Declaration::function("redraw"));
        let animation = session
            .forest
            .insert(Declaration::parameter("animation").with_types(["boolean"]));
        session.forest.add_parameters(with_parameter, &[animation]).unwrap();
        let same = session
            .forest
            .insert(Declaration::function("redraw").with_description("Redraws."));

        assert_eq!(attach(&mut session, class, with_parameter).unwrap(), with_parameter);
        assert_eq!(attach(&mut session, class, same).unwrap(), plain);
        assert_eq!(session.forest.children(class), &[plain, with_parameter]);
        assert_eq!(session.forest.get(plain).description, "Redraws.");
    }
}
