//! Option-tree generator.
//!
//! Mirrors the chart configuration object as flat interfaces below the root
//! namespace: `plotOptions.series.marker` becomes
//! `Highcharts.PlotSeriesMarkerOptions`, referenced from the
//! `marker` property of `Highcharts.PlotSeriesOptions`. Series types get
//! dedicated interfaces that are collected in a registry so that
//! `Options.series` can accept any of them.

use indexmap::IndexSet;
use tracing::debug;

use super::{attach_or_merge, MainModule};
use crate::config::{LinkKind, TypeMapper};
use crate::doclet::OptionNode;
use crate::error::{GenerateError, Result};
use crate::session::{GenerationSession, WarningKind};
use crate::tsd::text::{capitalize, is_string_literal};
use crate::tsd::{Declaration, DeclarationId, DeclarationKind};

const SERIES_GUIDANCE: &str = "Configuration options for the series are given in three levels:\n\n\
1. Options for all series in a chart are defined in the plotOptions.series object.\n\
2. Options for all `{name}` series are defined in plotOptions.{name}.\n\
3. Options for one single series are given in the series instance array.";

pub struct OptionsGenerator<'a> {
    session: &'a mut GenerationSession,
    mapper: &'a dyn TypeMapper,
    namespace: DeclarationId,
    namespace_name: String,
}

impl<'a> OptionsGenerator<'a> {
    pub fn new(
        session: &'a mut GenerationSession,
        mapper: &'a dyn TypeMapper,
        main: MainModule,
    ) -> Self {
        let namespace_name = session.forest.full_name(main.namespace);
        Self {
            session,
            mapper,
            namespace: main.namespace,
            namespace_name,
        }
    }

    /// Generate all option interfaces and the series registry.
    pub fn generate(&mut self, root: &OptionNode) -> Result<()> {
        self.generate_interface(root, "")?;
        self.finish_series()?;
        debug!(
            series = self.session.series().count(),
            "generated option interfaces"
        );
        Ok(())
    }

    fn generate_interface(&mut self, node: &OptionNode, path: &str) -> Result<DeclarationId> {
        let mut declaration = Declaration::interface(interface_name(path))
            .with_description(node.doclet.description.clone().unwrap_or_default());
        declaration.unique_id = self.session.next_unique_id();
        let interface = attach_or_merge(self.session, self.namespace, declaration)?;

        for (name, child) in &node.children {
            let child_path = join_path(path, name);
            if path == "series" && series_base(child).is_some() {
                self.generate_series_type(name, child, &child_path)?;
            } else {
                self.generate_property(interface, name, child, &child_path)?;
            }
        }
        Ok(interface)
    }

    fn generate_property(
        &mut self,
        interface: DeclarationId,
        name: &str,
        node: &OptionNode,
        path: &str,
    ) -> Result<Option<DeclarationId>> {
        let doclet = &node.doclet;
        if doclet.is_private() {
            debug!(option = path, "skipped private option");
            return Ok(None);
        }

        let mut types: Vec<String> = doclet
            .type_names()
            .iter()
            .map(|ty| self.mapper.map_type(ty))
            .filter(|ty| !ty.is_empty())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        if !node.children.is_empty() {
            let child_interface = self.generate_interface(node, path)?;
            let full_name = self.session.forest.full_name(child_interface);
            let placeholder = types.iter().position(|ty| ty == "any");
            match placeholder {
                Some(index) => types[index] = full_name,
                None if !types.contains(&full_name) => types.push(full_name),
                None => {}
            }
        } else if types.iter().all(|ty| ty == "string") {
            let literals = doclet.literal_values();
            if literals.len() > 1 {
                types = literals;
            }
        }
        let types = self.promote_literal_union(name, types)?;

        let mut property = Declaration::property(name)
            .with_types(types)
            .with_description(doclet.description.clone().unwrap_or_default())
            .optional(path != "series.type");
        property.default_value = doclet.default_text().map(|value| self.mapper.map_value(&value));
        property.see = doclet.see.clone();
        if let Some(link) = self.mapper.see_link(path, LinkKind::Option) {
            property.see.push(link);
        }
        property.unique_id = self.session.next_unique_id();
        attach_or_merge(self.session, interface, property).map(Some)
    }

    /// Replace a pure string-literal union by a named alias below the root
    /// namespace, shared by every property with the same name.
    fn promote_literal_union(&mut self, property: &str, types: Vec<String>) -> Result<Vec<String>> {
        if types.len() < 2 || !types.iter().all(|ty| is_string_literal(ty)) {
            return Ok(types);
        }
        let alias_name = format!("Options{}Value", identifier(&capitalize(property)));
        let full_name = format!("{}.{alias_name}", self.namespace_name);

        let existing = self
            .session
            .forest
            .find_child(self.namespace, &alias_name, |kind| kind == DeclarationKind::Type);
        match existing {
            Some(alias) => {
                let current = self.session.forest.get(alias).types.clone();
                let same = current.len() == types.len() && types.iter().all(|ty| current.contains(ty));
                if !same {
                    self.session.warn(
                        WarningKind::Conflict,
                        format!(
                            "type alias `{full_name}` already holds {}; merged with {}",
                            current.join("|"),
                            types.join("|")
                        ),
                    );
                    let merged = &mut self.session.forest.get_mut(alias).types;
                    for ty in types {
                        if !merged.contains(&ty) {
                            merged.push(ty);
                        }
                    }
                }
            }
            None => {
                let mut alias = Declaration::type_alias(&alias_name).with_types(types);
                alias.unique_id = self.session.next_unique_id();
                attach_or_merge(self.session, self.namespace, alias)?;
            }
        }
        Ok(vec![full_name])
    }

    fn generate_series_type(&mut self, name: &str, node: &OptionNode, path: &str) -> Result<()> {
        if node.doclet.is_private() {
            debug!(option = path, "skipped private series type");
            return Ok(());
        }
        let namespace = &self.namespace_name;
        let base = series_base(node).map(interface_name).unwrap_or_default();
        let mut description = node.doclet.description.clone().unwrap_or_default();
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str(&format!(
            "In TypeScript the `type` option must always be set.\n\n{}",
            SERIES_GUIDANCE.replace("{name}", name)
        ));

        let mut declaration = Declaration::interface(interface_name(path))
            .with_types([
                format!("{namespace}.{base}"),
                format!("{namespace}.SeriesOptions"),
            ])
            .with_description(description);
        declaration.unique_id = self.session.next_unique_id();
        let interface = attach_or_merge(self.session, self.namespace, declaration)?;

        for (child_name, child) in &node.children {
            if child_name != "type" {
                self.generate_property(interface, child_name, child, &join_path(path, child_name))?;
            }
        }

        let literal = serde_json::to_string(name).unwrap_or_else(|_| format!("\"{name}\""));
        self.set_property(interface, "type", vec![literal], false, "The series type.")?;
        for excluded in &node.doclet.excludes {
            self.set_property(
                interface,
                excluded,
                vec!["undefined".to_string()],
                true,
                "Not available for this series type.",
            )?;
        }

        let full_name = self.session.forest.full_name(interface);
        self.session.register_series(name, full_name);
        Ok(())
    }

    /// Force a property to the given types, creating it when missing.
    fn set_property(
        &mut self,
        interface: DeclarationId,
        name: &str,
        types: Vec<String>,
        optional: bool,
        description: &str,
    ) -> Result<DeclarationId> {
        let forest = &mut self.session.forest;
        if let Some(existing) = forest.find_child(interface, name, |kind| kind == DeclarationKind::Property) {
            let property = forest.get_mut(existing);
            property.types = types;
            property.is_optional = optional;
            return Ok(existing);
        }
        let mut property = Declaration::property(name)
            .with_types(types)
            .with_description(description)
            .optional(optional);
        property.unique_id = self.session.next_unique_id();
        attach_or_merge(self.session, interface, property)
    }

    /// Build `SeriesOptionsRegistry` and `SeriesOptionsType` and point
    /// `Options.series` at them.
    fn finish_series(&mut self) -> Result<()> {
        let namespace = self.namespace_name.clone();
        attach_or_merge(self.session, self.namespace, Declaration::interface("SeriesOptions"))?;

        let registry = attach_or_merge(
            self.session,
            self.namespace,
            Declaration::interface("SeriesOptionsRegistry")
                .with_description("The registry of all available series options."),
        )?;
        let series: Vec<(String, String)> = self
            .session
            .series()
            .map(|(name, interface)| (name.to_string(), interface.to_string()))
            .collect();
        for (name, interface) in series {
            let key = interface.rsplit('.').next().unwrap_or(&interface).to_string();
            let property = Declaration::property(key)
                .with_types([interface.clone()])
                .with_description(format!("Options for `{name}` series."));
            attach_or_merge(self.session, registry, property)?;
        }

        attach_or_merge(
            self.session,
            self.namespace,
            Declaration::type_alias("SeriesOptionsType")
                .with_types([format!(
                    "{namespace}.SeriesOptionsRegistry[keyof {namespace}.SeriesOptionsRegistry]"
                )])
                .with_description("Any of the registered series options."),
        )?;

        let forest = &mut self.session.forest;
        let options = forest
            .find_child(self.namespace, "Options", |kind| kind == DeclarationKind::Interface)
            .ok_or_else(|| GenerateError::missing(format!("{namespace}.Options"), "root options interface"))?;
        let series = forest
            .find_child(options, "series", |kind| kind == DeclarationKind::Property)
            .ok_or_else(|| GenerateError::missing(format!("{namespace}.Options.series"), "series option"))?;
        forest.get_mut(series).types = vec![format!("Array<{namespace}.SeriesOptionsType>")];
        Ok(())
    }
}

/// Generate the option interfaces of `root` into the main namespace.
pub fn generate_options(
    session: &mut GenerationSession,
    mapper: &dyn TypeMapper,
    main: MainModule,
    root: &OptionNode,
) -> Result<()> {
    OptionsGenerator::new(session, mapper, main).generate(root)
}

/// Interface name of an option path: `plotOptions.series` becomes
/// `PlotSeriesOptions`, the root becomes `Options`.
pub fn interface_name(path: &str) -> String {
    let mut name: String = path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let segment = identifier(&capitalize(segment));
            segment
                .strip_suffix("Options")
                .map(str::to_string)
                .unwrap_or(segment)
        })
        .collect();
    name.push_str("Options");
    name
}

/// The `plotOptions.*` path a series type inherits from.
fn series_base(node: &OptionNode) -> Option<&str> {
    node.doclet
        .resolved_extends
        .iter()
        .map(String::as_str)
        .find(|target| target.starts_with("plotOptions."))
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn identifier(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GeneratorConfig};
    use crate::doclet::options::{prepare, ParseOptions};
    use crate::generator::create_main_module;
    use serde_json::json;

    fn options_tree(value: serde_json::Value) -> OptionNode {
        let mut root: OptionNode = serde_json::from_value(value).unwrap();
        prepare(&mut root, &ParseOptions::default()).unwrap();
        root
    }

    fn chart_tree() -> OptionNode {
        options_tree(json!({
            "children": {
                "chart": { "children": {
                    "width": { "doclet": { "defaultvalue": 600, "description": "Chart width." } },
                    "secret": { "doclet": { "access": "private" } }
                } },
                "plotOptions": { "children": {
                    "line": { "children": {
                        "lineWidth": { "doclet": { "type": { "names": ["number"] } } }
                    } }
                } },
                "series": {
                    "doclet": { "type": { "names": ["Array.<*>"] } },
                    "children": {
                        "data": { "doclet": { "type": { "names": ["Array.<number>"] } } },
                        "line": {
                            "doclet": {
                                "extends": "plotOptions.line",
                                "excludes": ["dataParser"],
                                "description": "A line series."
                            },
                            "children": { "type": { "doclet": { "type": { "names": ["string"] } } } }
                        }
                    }
                }
            }
        }))
    }

    fn generate(root: &OptionNode) -> (GenerationSession, MainModule) {
        let mut session = GenerationSession::default();
        let main = create_main_module(&mut session, &GeneratorConfig::default()).unwrap();
        generate_options(&mut session, &Config::default(), main, root).unwrap();
        (session, main)
    }

    fn child(session: &GenerationSession, parent: DeclarationId, name: &str) -> DeclarationId {
        session
            .forest
            .get_children_named(parent, name)
            .first()
            .copied()
            .unwrap_or_else(|| panic!("missing `{name}`"))
    }

    #[test]
    fn names_interfaces_after_paths() {
        assert_eq!(interface_name(""), "Options");
        assert_eq!(interface_name("plotOptions.series.marker"), "PlotSeriesMarkerOptions");
        assert_eq!(interface_name("series"), "SeriesOptions");
        assert_eq!(interface_name("xAxis.plotBands"), "XAxisPlotBandsOptions");
    }

    #[test]
    fn builds_nested_interfaces() {
        let (session, main) = generate(&chart_tree());
        let forest = &session.forest;
        let options = child(&session, main.namespace, "Options");
        let chart = child(&session, options, "chart");
        assert_eq!(forest.get(chart).types, vec!["Highcharts.ChartOptions"]);
        assert!(forest.get(chart).is_optional);

        let chart_options = child(&session, main.namespace, "ChartOptions");
        assert_eq!(forest.child_names(chart_options), vec!["width"]);
        let width = child(&session, chart_options, "width");
        assert_eq!(forest.get(width).types, vec!["number"]);
        assert_eq!(forest.get(width).default_value.as_deref(), Some("600"));
        assert_eq!(session.declarations_named("Highcharts.ChartOptions.width"), &[width]);
    }

    #[test]
    fn builds_series_registry() {
        let (session, main) = generate(&chart_tree());
        let forest = &session.forest;

        let line = child(&session, main.namespace, "SeriesLineOptions");
        assert_eq!(
            forest.get(line).types,
            vec!["Highcharts.PlotLineOptions", "Highcharts.SeriesOptions"]
        );
        let discriminant = child(&session, line, "type");
        assert_eq!(forest.get(discriminant).types, vec!["\"line\""]);
        assert!(!forest.get(discriminant).is_optional);
        let excluded = child(&session, line, "dataParser");
        assert_eq!(forest.get(excluded).types, vec!["undefined"]);
        assert_eq!(forest.get_children_named(line, "lineWidth").len(), 1);
        assert!(forest.get(line).description.contains("must always be set"));

        let series_options = child(&session, main.namespace, "SeriesOptions");
        assert_eq!(forest.child_names(series_options), vec!["data"]);

        let registry = child(&session, main.namespace, "SeriesOptionsRegistry");
        let entry = child(&session, registry, "SeriesLineOptions");
        assert_eq!(forest.get(entry).types, vec!["Highcharts.SeriesLineOptions"]);
        assert!(!forest.get(entry).is_optional);

        let alias = child(&session, main.namespace, "SeriesOptionsType");
        assert_eq!(
            forest.render(alias, "", true),
            "type SeriesOptionsType = SeriesOptionsRegistry[keyof SeriesOptionsRegistry];"
        );

        let options = child(&session, main.namespace, "Options");
        let series = child(&session, options, "series");
        assert_eq!(forest.get(series).types, vec!["Array<Highcharts.SeriesOptionsType>"]);
        assert_eq!(session.series().collect::<Vec<_>>(), vec![("line", "Highcharts.SeriesLineOptions")]);
    }

    #[test]
    fn generating_twice_merges_into_the_same_declarations() {
        let root = chart_tree();
        let (mut session, main) = generate(&root);
        let names_before = session.forest.child_names(main.namespace);
        let options = child(&session, main.namespace, "Options");
        let chart = child(&session, options, "chart");
        let types_before = session.forest.get(chart).types.clone();

        generate_options(&mut session, &Config::default(), main, &root).unwrap();
        assert_eq!(session.forest.child_names(main.namespace), names_before);
        assert_eq!(session.forest.get_children_named(options, "chart"), vec![chart]);
        assert_eq!(session.forest.get(chart).types, types_before);
        assert!(session.warnings().is_empty());
    }

    #[test]
    fn promotes_literal_unions_to_shared_aliases() {
        let root = options_tree(json!({
            "children": {
                "title": { "children": {
                    "align": { "doclet": { "type": { "names": ["'left'", "'center'", "'right'"] } } }
                } },
                "subtitle": { "children": {
                    "align": { "doclet": { "type": { "names": ["\"left\"", "\"center\"", "\"right\""] } } }
                } },
                "legend": { "children": {
                    "align": { "doclet": {
                        "type": { "names": ["string"] },
                        "values": "[\"left\", \"justify\"]"
                    } }
                } },
                "series": {}
            }
        }));
        let (session, main) = generate(&root);
        let forest = &session.forest;

        let aliases = forest.get_children_named(main.namespace, "OptionsAlignValue");
        assert_eq!(aliases.len(), 1);
        assert_eq!(
            forest.get(aliases[0]).types,
            vec!["\"left\"", "\"center\"", "\"right\"", "\"justify\""]
        );
        for interface in ["TitleOptions", "SubtitleOptions", "LegendOptions"] {
            let align = child(&session, child(&session, main.namespace, interface), "align");
            assert_eq!(forest.get(align).types, vec!["Highcharts.OptionsAlignValue"]);
        }
        assert_eq!(session.warnings().len(), 1);
        assert_eq!(session.warnings()[0].kind, WarningKind::Conflict);
    }

    #[test]
    fn private_series_types_are_skipped() {
        let root = options_tree(json!({
            "children": {
                "plotOptions": { "children": {
                    "line": { "children": {
                        "lineWidth": { "doclet": { "type": { "names": ["number"] } } }
                    } }
                } },
                "series": { "children": {
                    "line": { "doclet": { "extends": "plotOptions.line" } },
                    "secretline": { "doclet": { "extends": "plotOptions.line", "access": "private" } }
                } }
            }
        }));
        let (session, main) = generate(&root);
        let forest = &session.forest;

        assert!(forest.get_children_named(main.namespace, "SeriesSecretlineOptions").is_empty());
        let series: Vec<&str> = session.series().map(|(name, _)| name).collect();
        assert_eq!(series, vec!["line"]);
        let registry = child(&session, main.namespace, "SeriesOptionsRegistry");
        assert_eq!(forest.child_names(registry), vec!["SeriesLineOptions"]);
    }

    #[test]
    fn missing_series_option_is_fatal() {
        let root = options_tree(json!({ "children": { "chart": {} } }));
        let mut session = GenerationSession::default();
        let main = create_main_module(&mut session, &GeneratorConfig::default()).unwrap();
        let err = generate_options(&mut session, &Config::default(), main, &root).unwrap_err();
        assert!(matches!(err, GenerateError::MissingReference { ref name, .. } if name == "Highcharts.Options.series"));
    }
}
