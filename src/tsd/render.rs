//! TypeScript source rendering for the declaration forest.

use super::text::{self, TypeRenderOptions, INDENT};
use super::{Declaration, DeclarationId, Forest, ModuleInfo, Variant};

impl Forest {
    /// Render a declaration and everything below it.
    ///
    /// `indent` is prepended to every emitted line of this declaration;
    /// children are indented one level deeper. File modules return an empty
    /// string when they hold nothing to write.
    pub fn render(&self, id: DeclarationId, indent: &str, without_doclet: bool) -> String {
        let declaration = self.get(id);
        if let Variant::Module(info) = &declaration.variant {
            return self.render_module(id, info, indent, without_doclet);
        }
        if let Variant::Parameter { .. } = declaration.variant {
            return self.render_parameter(id, true);
        }

        let doclet = if without_doclet {
            String::new()
        } else {
            self.render_doclet(id, indent)
        };
        format!("{doclet}{}", self.render_statement(id, indent, without_doclet))
    }

    fn render_module(
        &self,
        id: DeclarationId,
        info: &ModuleInfo,
        indent: &str,
        without_doclet: bool,
    ) -> String {
        let children: Vec<String> = self
            .get_children(id)
            .into_iter()
            .map(|child| self.render(child, indent, without_doclet))
            .collect();
        if children.is_empty() && info.imports.is_empty() && info.exports.is_empty() {
            return String::new();
        }

        let mut sections = Vec::new();
        if !info.copyright.trim().is_empty() {
            sections.push(copyright_banner(&info.copyright));
        }
        if !info.imports.is_empty() {
            sections.push(info.imports.join("\n"));
        }
        if !children.is_empty() {
            sections.push(children.join("\n"));
        }
        if !info.exports.is_empty() {
            sections.push(info.exports.join("\n"));
        }
        format!("{}\n", sections.join("\n\n"))
    }

    fn render_statement(&self, id: DeclarationId, indent: &str, without_doclet: bool) -> String {
        let declaration = self.get(id);
        let scope = self.scope_prefix(id);
        let name = &declaration.name;
        let max = self.max_line_length();

        let header = match &declaration.variant {
            Variant::ExternalModule { path } => format!("{indent}{scope}module \"{path}\""),
            Variant::Global => format!("{indent}{scope}global"),
            Variant::Namespace => format!("{indent}{scope}namespace {name}"),
            Variant::Interface => {
                let mut header = format!("{indent}{scope}interface {name}");
                if !declaration.types.is_empty() {
                    header.push_str(" extends ");
                    header.push_str(&self.render_each_type(id, &declaration.types).join(", "));
                }
                header
            }
            Variant::Class => {
                let mut header = format!("{indent}{scope}class {name}");
                let types = self.render_each_type(id, &declaration.types);
                if let Some((base, interfaces)) = types.split_first() {
                    header.push_str(" extends ");
                    header.push_str(base);
                    if !interfaces.is_empty() {
                        header.push_str(" implements ");
                        header.push_str(&interfaces.join(", "));
                    }
                }
                header
            }
            _ => {
                let line = format!("{indent}{scope}{}", self.render_signature(id));
                return text::break_long_lines(&line, max);
            }
        };

        let header = text::break_long_lines(&header, max);
        format!("{header} {}", self.render_body(id, indent, without_doclet))
    }

    /// Statement text of leaf declarations, without indentation or scope.
    fn render_signature(&self, id: DeclarationId) -> String {
        let declaration = self.get(id);
        let in_namespace = self
            .parent(id)
            .map_or(true, |parent| self.kind(parent).is_namespace_like());

        match &declaration.variant {
            Variant::Type => format!(
                "type {} = {};",
                declaration.name,
                self.render_type_list(id, &declaration.types, false, false, "any")
            ),
            Variant::FunctionType => format!(
                "type {} = ({}) => {};",
                declaration.name,
                self.render_parameters(id),
                self.render_type_list(id, &declaration.types, false, false, "void")
            ),
            Variant::Constructor => format!("constructor({});", self.render_parameters(id)),
            Variant::Function => {
                let keyword = if in_namespace && !declaration.name.is_empty() {
                    "function "
                } else {
                    ""
                };
                let name = if declaration.name.is_empty() {
                    String::new()
                } else {
                    text::quote_name(&declaration.name)
                };
                format!(
                    "{keyword}{name}({}): {};",
                    self.render_parameters(id),
                    self.render_type_list(id, &declaration.types, false, false, "void")
                )
            }
            Variant::Property | Variant::Event => {
                if in_namespace {
                    let keyword = if declaration.is_read_only { "const" } else { "let" };
                    format!(
                        "{keyword} {}: {};",
                        declaration.name,
                        self.render_type_list(id, &declaration.types, true, false, "any")
                    )
                } else {
                    format!(
                        "{}{}{}: {};",
                        if declaration.is_read_only { "readonly " } else { "" },
                        text::quote_name(&declaration.name),
                        if declaration.is_optional { "?" } else { "" },
                        self.render_type_list(
                            id,
                            &declaration.types,
                            true,
                            declaration.is_optional,
                            "any"
                        )
                    )
                }
            }
            Variant::Parameter { .. } => self.render_parameter(id, true),
            Variant::Module(_)
            | Variant::ExternalModule { .. }
            | Variant::Global
            | Variant::Namespace
            | Variant::Interface
            | Variant::Class => String::new(),
        }
    }

    fn render_body(&self, id: DeclarationId, indent: &str, without_doclet: bool) -> String {
        let inner = format!("{indent}{INDENT}");
        let children: Vec<String> = self
            .get_children(id)
            .into_iter()
            .map(|child| self.render(child, &inner, without_doclet))
            .collect();
        if children.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n{indent}}}", children.join("\n"))
        }
    }

    /// Keyword prefix that depends on where the declaration sits.
    fn scope_prefix(&self, id: DeclarationId) -> &'static str {
        let declaration = self.get(id);
        let Some(parent) = self.parent(id) else {
            return match declaration.variant {
                Variant::Module(_) | Variant::Parameter { .. } => "",
                _ => "declare ",
            };
        };
        match self.get(parent).variant {
            Variant::Module(_) => match declaration.variant {
                Variant::ExternalModule { .. } | Variant::Global => "declare ",
                _ => "export ",
            },
            Variant::Class if !matches!(declaration.variant, Variant::Parameter { .. }) => {
                match (declaration.is_private, declaration.is_static) {
                    (true, true) => "private static ",
                    (true, false) => "private ",
                    (false, true) => "static ",
                    (false, false) => "",
                }
            }
            _ => "",
        }
    }

    fn render_parameters(&self, owner: DeclarationId) -> String {
        let parameters = self.parameters(owner);
        parameters
            .iter()
            .enumerate()
            .map(|(index, &parameter)| {
                let tail_optional = parameters[index + 1..].iter().all(|&next| {
                    let next = self.get(next);
                    next.is_optional || is_variadic(next)
                });
                self.render_parameter(parameter, tail_optional)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// An optional parameter followed by a required one renders required,
    /// with `undefined` added to its type.
    fn render_parameter(&self, id: DeclarationId, tail_optional: bool) -> String {
        let declaration = self.get(id);
        let name = &declaration.name;

        if is_variadic(declaration) {
            let inner = self.render_type_list(id, &declaration.types, false, false, "any");
            let ty = if inner.starts_with("Array<") {
                inner
            } else {
                format!("Array<{inner}>")
            };
            return format!("...{name}: {ty}");
        }

        let optional = declaration.is_optional && tail_optional;
        let mut types = declaration.types.clone();
        if declaration.is_optional && !optional && !types.iter().any(|ty| ty == "undefined") {
            if types.is_empty() {
                types.push("any".to_string());
            }
            types.push("undefined".to_string());
        }
        format!(
            "{name}{}: {}",
            if optional { "?" } else { "" },
            self.render_type_list(id, &types, true, optional, "any")
        )
    }

    fn type_options(
        &self,
        id: DeclarationId,
        parenthesize: bool,
        drop_undefined: bool,
    ) -> TypeRenderOptions<'_> {
        TypeRenderOptions {
            root_namespace: self.root_namespace(id).map(|namespace| self.name(namespace)),
            parenthesize,
            drop_undefined,
        }
    }

    fn render_type_list(
        &self,
        id: DeclarationId,
        types: &[String],
        parenthesize: bool,
        drop_undefined: bool,
        fallback: &str,
    ) -> String {
        let rendered = text::render_types(types, self.type_options(id, parenthesize, drop_undefined));
        if rendered.is_empty() {
            fallback.to_string()
        } else {
            rendered
        }
    }

    /// Render each type on its own, for `extends` and `implements` lists.
    fn render_each_type(&self, id: DeclarationId, types: &[String]) -> Vec<String> {
        let options = self.type_options(id, false, false);
        types
            .iter()
            .map(|ty| text::render_types(std::slice::from_ref(ty), options))
            .filter(|ty| !ty.is_empty())
            .collect()
    }

    fn render_doclet(&self, id: DeclarationId, indent: &str) -> String {
        let declaration = self.get(id);
        let width = self.max_line_length().saturating_sub(indent.len() + 3);
        let mut sections: Vec<Vec<String>> = Vec::new();

        if !declaration.description.trim().is_empty() {
            sections.push(text::wrap_text(&declaration.description, width));
        }
        if let Some(default) = &declaration.default_value {
            sections.push(vec![format!("@default {default}")]);
        }
        for &parameter in self.parameters(id) {
            let parameter = self.get(parameter);
            if parameter.description.trim().is_empty() {
                continue;
            }
            let mut lines = vec![format!("@param {}", parameter.name)];
            lines.extend(
                text::wrap_text(&parameter.description, width.saturating_sub(7))
                    .into_iter()
                    .map(|line| {
                        if line.is_empty() {
                            line
                        } else {
                            format!("       {line}")
                        }
                    }),
            );
            sections.push(lines);
        }
        if !declaration.see.is_empty() {
            sections.push(declaration.see.iter().map(|url| format!("@see {url}")).collect());
        }
        if sections.is_empty() {
            return String::new();
        }

        let mut out = format!("{indent}/**\n");
        for (index, section) in sections.iter().enumerate() {
            if index > 0 {
                out.push_str(&format!("{indent} *\n"));
            }
            for line in section {
                if line.is_empty() {
                    out.push_str(&format!("{indent} *\n"));
                } else {
                    out.push_str(&format!("{indent} * {line}\n"));
                }
            }
        }
        out.push_str(&format!("{indent} */\n"));
        out
    }
}

fn is_variadic(declaration: &Declaration) -> bool {
    matches!(declaration.variant, Variant::Parameter { variadic: true })
}

fn copyright_banner(copyright: &str) -> String {
    let mut banner = String::from("/*!*\n *\n");
    for line in copyright.trim().lines() {
        if line.trim().is_empty() {
            banner.push_str(" *\n");
        } else {
            banner.push_str(&format!(" *  {}\n", line.trim_end()));
        }
    }
    banner.push_str(" *\n *!*/");
    banner
}

#[cfg(test)]
mod tests {
    use crate::tsd::{Declaration, DeclarationId, Forest, ModuleInfo, Variant};

    fn main_module(forest: &mut Forest) -> (DeclarationId, DeclarationId) {
        let module = forest.insert(Declaration::new(
            "highcharts",
            Variant::Module(ModuleInfo {
                path: "highcharts".to_string(),
                imports: vec!["import * as globals from \"./globals\";".to_string()],
                exports: vec!["export default Highcharts;".to_string()],
                copyright: String::new(),
            }),
        ));
        let namespace = forest.insert(Declaration::namespace("Highcharts"));
        forest.add_children(module, &[namespace]).unwrap();
        (module, namespace)
    }

    #[test]
    fn renders_main_module_with_nested_interface() {
        let mut forest = Forest::new();
        let (module, namespace) = main_module(&mut forest);
        let interface = forest.insert(Declaration::interface("Options"));
        let property = forest.insert(
            Declaration::property("chart")
                .with_types(["Highcharts.ChartOptions"])
                .with_description("Chart options.")
                .optional(true),
        );
        forest.add_children(namespace, &[interface]).unwrap();
        forest.add_children(interface, &[property]).unwrap();

        let expected = "\
import * as globals from \"./globals\";

export namespace Highcharts {
    interface Options {
        /**
         * Chart options.
         */
        chart?: ChartOptions;
    }
}

export default Highcharts;
";
        assert_eq!(forest.render(module, "", false), expected);
    }

    #[test]
    fn empty_module_renders_nothing() {
        let mut forest = Forest::new();
        let module = forest.insert(Declaration::module("modules/empty"));
        forest.get_mut(module).description = "ignored".to_string();
        assert_eq!(forest.render(module, "", false), "");
    }

    #[test]
    fn optional_parameter_before_required_renders_with_undefined() {
        let mut forest = Forest::new();
        let class = forest.insert(Declaration::class("Chart"));
        let function = forest.insert(Declaration::function("setSize"));
        let width = forest.insert(Declaration::parameter("width").with_types(["number"]).optional(true));
        let height = forest.insert(Declaration::parameter("height").with_types(["number"]));
        let animation = forest.insert(
            Declaration::parameter("animation")
                .with_types(["boolean"])
                .optional(true),
        );
        forest.add_children(class, &[function]).unwrap();
        forest
            .add_parameters(function, &[width, height, animation])
            .unwrap();

        assert_eq!(
            forest.render(function, "", true),
            "setSize(width: (number|undefined), height: number, animation?: boolean): void;"
        );
    }

    #[test]
    fn class_members_get_access_prefixes() {
        let mut forest = Forest::new();
        let class = forest.insert(Declaration::class("Chart").with_types(["Highcharts.Base"]));
        let property = forest.insert(Declaration::property("count").with_types(["number"]));
        forest.get_mut(property).is_private = true;
        forest.get_mut(property).is_static = true;
        let constructor = forest.insert(Declaration::constructor());
        forest.add_children(class, &[property, constructor]).unwrap();

        assert_eq!(
            forest.render(class, "", true),
            "declare class Chart extends Highcharts.Base {\n    private static count: number;\n    constructor();\n}"
        );
    }

    #[test]
    fn renders_external_module_wrapper() {
        let mut forest = Forest::new();
        let module = forest.insert(Declaration::module("modules/exporting"));
        let wrapper = forest.insert(Declaration::external_module("../highcharts"));
        let namespace = forest.insert(Declaration::namespace("Highcharts"));
        let interface = forest.insert(Declaration::interface("Chart"));
        let method = forest.insert(Declaration::function("exportChart"));
        forest.add_children(module, &[wrapper]).unwrap();
        forest.add_children(wrapper, &[namespace]).unwrap();
        forest.add_children(namespace, &[interface]).unwrap();
        forest.add_children(interface, &[method]).unwrap();

        let expected = "\
declare module \"../highcharts\" {
    namespace Highcharts {
        interface Chart {
            exportChart(): void;
        }
    }
}
";
        assert_eq!(forest.render(module, "", false), expected);
    }

    #[test]
    fn renders_type_aliases() {
        let mut forest = Forest::new();
        let namespace = forest.insert(Declaration::namespace("Highcharts"));
        let alias = forest.insert(
            Declaration::type_alias("AlignValue").with_types(["\"right\"", "\"center\"", "\"left\""]),
        );
        let callback = forest.insert(
            Declaration::function_type("FormatterCallbackFunction").with_types(["string"]),
        );
        let value = forest.insert(Declaration::parameter("value").with_types(["number"]));
        forest.add_children(namespace, &[alias, callback]).unwrap();
        forest.add_parameters(callback, &[value]).unwrap();

        assert_eq!(
            forest.render(alias, "", true),
            "type AlignValue = \"center\"|\"left\"|\"right\";"
        );
        assert_eq!(
            forest.render(callback, "", true),
            "type FormatterCallbackFunction = (value: number) => string;"
        );
    }

    #[test]
    fn renders_doc_block_with_parameters() {
        let mut forest = Forest::new();
        let namespace = forest.insert(Declaration::namespace("Highcharts"));
        let function = forest.insert(
            Declaration::function("chart")
                .with_types(["Highcharts.Chart"])
                .with_description("Factory function."),
        );
        let options = forest.insert(
            Declaration::parameter("options")
                .with_types(["Highcharts.Options"])
                .with_description("The chart options."),
        );
        forest.add_children(namespace, &[function]).unwrap();
        forest.add_parameters(function, &[options]).unwrap();

        let expected = "\
/**
 * Factory function.
 *
 * @param options
 *        The chart options.
 */
function chart(options: Options): Chart;";
        assert_eq!(forest.render(function, "", false), expected);
    }

    #[test]
    fn copyright_banner_leads_module() {
        let mut forest = Forest::new();
        let (module, _) = main_module(&mut forest);
        if let Variant::Module(info) = &mut forest.get_mut(module).variant {
            info.copyright = "Copyright (c) Highsoft AS. All rights reserved.".to_string();
        }
        let rendered = forest.render(module, "", false);
        assert!(rendered.starts_with(
            "/*!*\n *\n *  Copyright (c) Highsoft AS. All rights reserved.\n *\n *!*/\n\nimport"
        ));
        assert!(rendered.contains("export namespace Highcharts {}"));
    }
}
