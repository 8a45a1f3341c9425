//! Reference relocation.
//!
//! Secondary modules re-open the root namespace to add declarations. When
//! the main module refers to one of those, importing it back would create a
//! circular module reference, so the declaration is moved into the main
//! namespace instead.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::{attach, MainModule};
use crate::error::Result;
use crate::session::GenerationSession;
use crate::tsd::{DeclarationId, Variant};

/// Move every declaration the main namespace transitively references out of
/// other modules' wrapper namespaces. Returns the number of moved nodes.
pub fn relocate(
    session: &mut GenerationSession,
    main: MainModule,
    modules: &[DeclarationId],
) -> Result<usize> {
    let mut relocator = Relocator::new(session, main);

    let seeds = relocator.session.forest.children(main.namespace).to_vec();
    relocator.run(seeds)?;

    for &module in modules {
        let is_options_module = matches!(
            &relocator.session.forest.get(module).variant,
            Variant::Module(info) if info.path.contains("options")
        );
        if is_options_module && module != main.module {
            let seeds = relocator.wrapped_children(module);
            relocator.run(seeds)?;
        }
    }

    debug!(moved = relocator.moved, "relocation finished");
    Ok(relocator.moved)
}

struct Relocator<'a> {
    session: &'a mut GenerationSession,
    main: MainModule,
    main_name: String,
    /// Identity markers of everything directly below the main namespace.
    main_ids: HashSet<u64>,
    moved: usize,
}

impl<'a> Relocator<'a> {
    fn new(session: &'a mut GenerationSession, main: MainModule) -> Self {
        let forest = &session.forest;
        let main_name = forest.full_name(main.namespace);
        let main_ids = forest
            .children(main.namespace)
            .iter()
            .map(|&child| forest.get(child).unique_id)
            .collect();
        Self {
            session,
            main,
            main_name,
            main_ids,
            moved: 0,
        }
    }

    /// Follow references from `seeds` until nothing is left to move.
    fn run(&mut self, seeds: Vec<DeclarationId>) -> Result<()> {
        let mut queue: VecDeque<DeclarationId> = seeds.into();
        while let Some(node) = queue.pop_front() {
            for name in self.session.forest.referenced_types(node, true) {
                for candidate in self.candidates(&name) {
                    queue.extend(self.move_to_main(candidate)?);
                }
            }
        }
        Ok(())
    }

    /// Declarations named `name` that sit directly in another module's copy
    /// of the root namespace.
    fn candidates(&self, name: &str) -> Vec<DeclarationId> {
        let forest = &self.session.forest;
        self.session
            .declarations_named(name)
            .iter()
            .copied()
            .filter(|&id| {
                let Some(parent) = forest.parent(id) else {
                    return false;
                };
                parent != self.main.namespace
                    && matches!(forest.get(parent).variant, Variant::Namespace)
                    && forest.full_name(parent) == self.main_name
                    && forest.module_of(id) != Some(self.main.module)
            })
            .collect()
    }

    /// Detach `candidate` with its overloads and attach them to the main
    /// namespace. Returns the declarations that still need to be followed.
    fn move_to_main(&mut self, candidate: DeclarationId) -> Result<Vec<DeclarationId>> {
        let Some(parent) = self.session.forest.parent(candidate) else {
            return Ok(Vec::new());
        };
        if parent == self.main.namespace {
            return Ok(Vec::new());
        }
        let name = self.session.forest.name(candidate).to_string();
        let mut attached = Vec::new();
        let mut arrived = Vec::new();
        for id in self.session.forest.remove_child(parent, &name) {
            // Split overloads share one id, so only ids held before this
            // move count as duplicates.
            let unique_id = self.session.forest.get(id).unique_id;
            if unique_id != 0 && self.main_ids.contains(&unique_id) {
                debug!(%name, unique_id, "already in the main namespace, dropped");
                continue;
            }
            arrived.push(unique_id);
            debug!(
                %name,
                from = %self.session.forest.full_name(parent),
                "moving declaration into the main namespace"
            );
            let target = attach(self.session, self.main.namespace, id)?;
            self.moved += 1;
            attached.push(target);
        }
        self.main_ids.extend(arrived.into_iter().filter(|&id| id != 0));
        Ok(attached)
    }

    /// Children of the namespaces wrapped in a module's external modules.
    fn wrapped_children(&self, module: DeclarationId) -> Vec<DeclarationId> {
        let forest = &self.session.forest;
        forest
            .children(module)
            .iter()
            .filter(|&&child| matches!(forest.get(child).variant, Variant::ExternalModule { .. }))
            .flat_map(|&wrapper| forest.children(wrapper).iter().copied())
            .flat_map(|namespace| forest.children(namespace).iter().copied())
            .collect()
    }
}
