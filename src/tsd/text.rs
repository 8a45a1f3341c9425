//! Text helpers for TypeScript type strings and emitted source lines.
//!
//! Type expressions are never parsed. Everything here works on the raw
//! strings with a tokenizer that only knows about string literals and dotted
//! identifiers, which is enough to rewrite names without touching literals.

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

/// One indentation level of emitted source.
pub const INDENT: &str = "    ";

/// Matches a string literal or a dotted identifier.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*"#)
        .unwrap()
});

/// Words that can show up in type strings but never name a declaration.
const TYPE_KEYWORDS: &[&str] = &[
    "any",
    "bigint",
    "boolean",
    "false",
    "infer",
    "keyof",
    "never",
    "null",
    "number",
    "object",
    "readonly",
    "string",
    "symbol",
    "this",
    "true",
    "typeof",
    "undefined",
    "unknown",
    "void",
];

/// Options for [`render_types`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeRenderOptions<'a> {
    /// Root namespace whose `Name.` prefix is dropped from type names.
    pub root_namespace: Option<&'a str>,
    /// Wrap unions of more than one member in parentheses.
    pub parenthesize: bool,
    /// Drop `undefined` because optionality is already expressed.
    pub drop_undefined: bool,
}

/// Extract every identifier-like name mentioned in the given type strings.
///
/// String literals and TypeScript keywords are skipped. Order of first
/// appearance is preserved and duplicates are removed.
pub fn extract_type_names<S: AsRef<str>>(types: &[S]) -> Vec<String> {
    let mut names = IndexSet::new();
    for ty in types {
        for token in TOKEN_RE.find_iter(ty.as_ref()) {
            let token = token.as_str();
            if token.starts_with('"') || token.starts_with('\'') {
                continue;
            }
            if TYPE_KEYWORDS.contains(&token) {
                continue;
            }
            names.insert(token.to_string());
        }
    }
    names.into_iter().collect()
}

/// Remove the `root.` prefix from every dotted name inside `ty`.
///
/// `Highcharts.Foo` becomes `Foo` inside the `Highcharts` namespace, while
/// string literals and names that merely start with the same characters
/// (`HighchartsX.Foo`) stay untouched.
pub fn strip_root_namespace(ty: &str, root: &str) -> String {
    let prefix = format!("{root}.");
    let mut out = String::with_capacity(ty.len());
    let mut last = 0;
    for token in TOKEN_RE.find_iter(ty) {
        out.push_str(&ty[last..token.start()]);
        let text = token.as_str();
        match text.strip_prefix(&prefix) {
            Some(rest) if !text.starts_with('"') && !text.starts_with('\'') => out.push_str(rest),
            _ => out.push_str(text),
        }
        last = token.end();
    }
    out.push_str(&ty[last..]);
    out
}

fn type_rank(ty: &str) -> u8 {
    match ty {
        "any" => 6,
        "undefined" => 5,
        "null" => 4,
        _ if ty.starts_with('"') || ty.starts_with('\'') => 3,
        _ if ty.starts_with(|c: char| c.is_ascii_digit() || c == '-') => 3,
        _ if ty.contains('<') || ty.contains("=>") || ty.starts_with('(') => 2,
        _ if ty.starts_with(|c: char| c.is_ascii_lowercase()) => 0,
        _ => 1,
    }
}

/// Sort type strings by kind precedence, then case-insensitively.
///
/// Primitives come first, then class names, generics, literals, `null`,
/// `undefined` and finally `any`.
pub fn sort_types<S: AsRef<str>>(types: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = types.iter().map(|t| t.as_ref().to_string()).collect();
    sorted.sort_by(|a, b| {
        type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
            .then_with(|| a.cmp(b))
    });
    sorted
}

/// Render a list of type strings as one TypeScript type expression.
///
/// Returns an empty string for an empty list so callers can pick their own
/// fallback (`any`, `void`).
pub fn render_types<S: AsRef<str>>(types: &[S], options: TypeRenderOptions<'_>) -> String {
    let mut unique: IndexSet<String> = types
        .iter()
        .map(|ty| {
            let ty = ty.as_ref().trim();
            match options.root_namespace {
                Some(root) => strip_root_namespace(ty, root),
                None => ty.to_string(),
            }
        })
        .filter(|ty| !ty.is_empty())
        .collect();

    if options.drop_undefined && unique.len() > 1 {
        unique.shift_remove("undefined");
    }

    let sorted = sort_types(&unique.into_iter().collect::<Vec<_>>());
    let union = sorted.len() > 1;
    let parts: Vec<String> = sorted
        .into_iter()
        .map(|ty| {
            if union && ty.contains("=>") && !is_wrapped(&ty) {
                format!("({ty})")
            } else {
                ty
            }
        })
        .collect();

    let joined = parts.join("|");
    if union && options.parenthesize {
        format!("({joined})")
    } else {
        joined
    }
}

/// Whether the whole expression sits inside one pair of parentheses.
fn is_wrapped(ty: &str) -> bool {
    if !ty.starts_with('(') || !ty.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (offset, ch) in ty.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return offset == ty.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Break rendered statements that exceed `max_length` columns.
///
/// A long line is split after the last `, ` or `|` that sits before the
/// limit and outside of string literals; the continuation is indented one
/// level deeper. Comment lines are left alone.
pub fn break_long_lines(text: &str, max_length: usize) -> String {
    let mut out = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with("/*") || trimmed.starts_with('*') || trimmed.starts_with("//") {
            out.push(line.to_string());
            continue;
        }
        let indent = &line[..line.len() - trimmed.len()];
        let continuation = format!("{indent}{INDENT}");
        let mut rest = line.to_string();
        let mut first = true;
        loop {
            let floor = if first { indent.len() } else { continuation.len() };
            if rest.chars().count() <= max_length {
                out.push(rest);
                break;
            }
            match find_break(&rest, max_length, floor) {
                Some(at) => {
                    out.push(rest[..at].trim_end().to_string());
                    rest = format!("{continuation}{}", rest[at..].trim_start());
                    first = false;
                }
                None => {
                    out.push(rest);
                    break;
                }
            }
        }
    }
    out.join("\n")
}

/// Byte offset right after the last breakable separator before `limit`.
fn find_break(line: &str, limit: usize, floor: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut best = None;
    for (column, (offset, ch)) in line.char_indices().enumerate() {
        if column >= limit {
            break;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '|' => best = Some(offset + 1),
            ',' if line[offset + 1..].starts_with(' ') => best = Some(offset + 1),
            _ => {}
        }
    }
    best.filter(|at| *at > floor)
}

/// Word-wrap documentation text to `width` columns.
///
/// Paragraphs are separated by blank lines; list items (`- `, `* `, `1. `)
/// always start on their own line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(10);
    let mut lines = Vec::new();
    let normalized = text.replace("\r\n", "\n").replace("*/", "*\\/");

    for (index, paragraph) in normalized.split("\n\n").enumerate() {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if index > 0 && !lines.is_empty() {
            lines.push(String::new());
        }

        let mut blocks: Vec<String> = Vec::new();
        for raw in paragraph.split('\n') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match blocks.last_mut() {
                Some(block) if !is_list_item(raw) => {
                    block.push(' ');
                    block.push_str(raw);
                }
                _ => blocks.push(raw.to_string()),
            }
        }

        for block in blocks {
            let mut current = String::new();
            for word in block.split_whitespace() {
                if !current.is_empty() && current.len() + 1 + word.len() > width {
                    lines.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            }
            if !current.is_empty() {
                lines.push(current);
            }
        }
    }
    lines
}

fn is_list_item(line: &str) -> bool {
    if line.starts_with("- ") || line.starts_with("* ") {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with(". ")
}

/// Check whether `name` can be emitted without quotes.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quote a member name when it is not a plain identifier.
pub fn quote_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        serde_json::to_string(name).unwrap_or_else(|_| format!("\"{name}\""))
    }
}

/// Uppercase the first character.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether a type string is a string literal type.
pub fn is_string_literal(ty: &str) -> bool {
    let ty = ty.trim();
    ty.len() >= 2
        && ((ty.starts_with('"') && ty.ends_with('"'))
            || (ty.starts_with('\'') && ty.ends_with('\'')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_dotted_names_without_literals_or_keywords() {
        let names = extract_type_names(&[
            "Array<Highcharts.Point>",
            "\"Highcharts.NotAType\"|string",
            "Highcharts.Dictionary<number>|undefined",
        ]);
        assert_eq!(
            names,
            vec!["Array", "Highcharts.Point", "Highcharts.Dictionary"]
        );
    }

    #[test]
    fn strips_root_namespace_only_on_exact_segment() {
        assert_eq!(
            strip_root_namespace("Array<Highcharts.Point>|HighchartsX.Foo", "Highcharts"),
            "Array<Point>|HighchartsX.Foo"
        );
        assert_eq!(
            strip_root_namespace("\"Highcharts.Point\"", "Highcharts"),
            "\"Highcharts.Point\""
        );
    }

    #[test]
    fn sorts_types_by_precedence() {
        let sorted = sort_types(&[
            "any",
            "undefined",
            "null",
            "\"x\"",
            "Array<number>",
            "Highcharts.Chart",
            "string",
            "boolean",
        ]);
        assert_eq!(
            sorted,
            vec![
                "boolean",
                "string",
                "Highcharts.Chart",
                "Array<number>",
                "\"x\"",
                "null",
                "undefined",
                "any"
            ]
        );
    }

    #[test]
    fn renders_union_with_optional_parentheses() {
        let types = ["any", "null", "string"];
        assert_eq!(render_types(&types, TypeRenderOptions::default()), "string|null|any");
        let options = TypeRenderOptions {
            parenthesize: true,
            ..Default::default()
        };
        assert_eq!(render_types(&types, options), "(string|null|any)");
        assert_eq!(render_types(&["string"], options), "string");
    }

    #[test]
    fn drops_undefined_only_from_unions() {
        let options = TypeRenderOptions {
            drop_undefined: true,
            ..Default::default()
        };
        assert_eq!(render_types(&["undefined", "number"], options), "number");
        assert_eq!(render_types(&["undefined"], options), "undefined");
    }

    #[test]
    fn wraps_function_types_in_unions() {
        let rendered = render_types(&["() => void", "string"], TypeRenderOptions::default());
        assert_eq!(rendered, "string|(() => void)");
    }

    #[test]
    fn breaks_long_lines_at_last_separator() {
        let line = "    foo(first: string, second: number, third: boolean): void;";
        let broken = break_long_lines(line, 40);
        assert_eq!(
            broken,
            "    foo(first: string, second: number,\n        third: boolean): void;"
        );
        assert_eq!(broken.replace("\n        ", " "), line);
    }

    #[test]
    fn never_breaks_inside_string_literals() {
        let line = "type A = \"a|b|c|d|e|f|g|h|i|j|k|l|m|n|o|p|q\";";
        assert_eq!(break_long_lines(line, 20), line);
    }

    #[test]
    fn leaves_comment_lines_alone() {
        let line = "     * a, very, long, comment, line, that, would, otherwise, break";
        assert_eq!(break_long_lines(line, 20), line);
    }

    #[test]
    fn wraps_paragraphs_and_list_items() {
        let lines = wrap_text("one two three four\nfive\n\n- item one\n- item two", 12);
        assert_eq!(
            lines,
            vec!["one two", "three four", "five", "", "- item one", "- item two"]
        );
    }

    #[test]
    fn quotes_non_identifiers() {
        assert_eq!(quote_name("align"), "align");
        assert_eq!(quote_name("data-label"), "\"data-label\"");
        assert_eq!(quote_name("3d"), "\"3d\"");
    }
}
