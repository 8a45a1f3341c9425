//! Run-scoped state shared by the generators.

use indexmap::IndexMap;
use tracing::warn;

use crate::tsd::{DeclarationId, DeclarationKind, Forest};

/// A non-fatal condition noticed while generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Two sources disagree, e.g. literal unions under one alias name.
    Conflict,
    /// Input the generator does not know how to handle.
    Unsupported,
    /// A repeated doclet that was dropped.
    Duplicate,
}

/// State of one generation run.
///
/// Holds the declaration forest, the reference dictionary, the series
/// registry and the unique-id counter. Nothing here is shared between runs;
/// create a new session for every run.
#[derive(Debug)]
pub struct GenerationSession {
    pub forest: Forest,
    /// Full name -> every declaration registered under that name.
    references: IndexMap<String, Vec<DeclarationId>>,
    /// Series type name -> full name of its options interface.
    series: IndexMap<String, String>,
    next_unique_id: u64,
    warnings: Vec<Warning>,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new(Forest::new())
    }
}

impl GenerationSession {
    pub fn new(forest: Forest) -> Self {
        Self {
            forest,
            references: IndexMap::new(),
            series: IndexMap::new(),
            next_unique_id: 1,
            warnings: Vec::new(),
        }
    }

    /// Next identity marker for a doclet or declaration.
    pub fn next_unique_id(&mut self) -> u64 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    /// Record an attached declaration under its current full name.
    pub fn register(&mut self, id: DeclarationId) {
        let full_name = self.forest.full_name(id);
        let entries = self.references.entry(full_name).or_default();
        if !entries.contains(&id) {
            entries.push(id);
        }
    }

    /// Record a declaration and all of its descendants.
    pub fn register_tree(&mut self, id: DeclarationId) {
        self.register(id);
        let children = self.forest.children(id).to_vec();
        for child in children {
            self.register_tree(child);
        }
    }

    /// Every declaration ever registered under `full_name`.
    pub fn declarations_named(&self, full_name: &str) -> &[DeclarationId] {
        self.references
            .get(full_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `full_name` is declared in a module other than `module`.
    ///
    /// Interfaces do not count: they only extend a declaration through
    /// declaration merging.
    pub fn is_declared_elsewhere(&self, full_name: &str, module: DeclarationId) -> bool {
        self.declarations_named(full_name).iter().any(|&id| {
            self.forest.kind(id) != DeclarationKind::Interface
                && self.forest.module_of(id).is_some_and(|other| other != module)
        })
    }

    pub fn register_series(&mut self, name: impl Into<String>, interface: impl Into<String>) {
        self.series.insert(name.into(), interface.into());
    }

    /// Registered series types in registration order.
    pub fn series(&self) -> impl Iterator<Item = (&str, &str)> {
        self.series
            .iter()
            .map(|(name, interface)| (name.as_str(), interface.as_str()))
    }

    /// Record a diagnostic and log it.
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        warn!(?kind, "{message}");
        self.warnings.push(Warning { message, kind });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsd::Declaration;

    #[test]
    fn unique_ids_are_sequential() {
        let mut session = GenerationSession::default();
        assert_eq!(session.next_unique_id(), 1);
        assert_eq!(session.next_unique_id(), 2);
    }

    #[test]
    fn registers_by_full_name_once() {
        let mut session = GenerationSession::default();
        let forest = &mut session.forest;
        let namespace = forest.insert(Declaration::namespace("Highcharts"));
        let class = forest.insert(Declaration::class("Chart"));
        forest.add_children(namespace, &[class]).unwrap();

        session.register_tree(namespace);
        session.register(class);
        assert_eq!(session.declarations_named("Highcharts.Chart"), &[class]);
        assert!(session.declarations_named("Highcharts.Point").is_empty());
    }

    #[test]
    fn detects_declarations_in_other_modules() {
        let mut session = GenerationSession::default();
        let forest = &mut session.forest;
        let main = forest.insert(Declaration::module("highcharts"));
        let other = forest.insert(Declaration::module("modules/exporting"));
        let namespace = forest.insert(Declaration::namespace("Highcharts"));
        let class = forest.insert(Declaration::class("Chart"));
        forest.add_children(main, &[namespace]).unwrap();
        forest.add_children(namespace, &[class]).unwrap();
        session.register_tree(main);

        assert!(session.is_declared_elsewhere("Highcharts.Chart", other));
        assert!(!session.is_declared_elsewhere("Highcharts.Chart", main));
    }

    #[test]
    fn warnings_are_collected() {
        let mut session = GenerationSession::default();
        session.warn(WarningKind::Unsupported, "unknown doclet kind `mixin`");
        assert_eq!(session.warnings().len(), 1);
        assert_eq!(session.take_warnings()[0].kind, WarningKind::Unsupported);
        assert!(session.warnings().is_empty());
    }
}
