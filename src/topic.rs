//! Topic builder: turns one parsed block into one pre-merge topic.

use crate::error::Diagnostic;
use crate::model::*;
use crate::parser::tags::{paragraphs, KNOWN_TAGS};
use std::collections::HashSet;

/// Facts the builder needs beyond the block itself.
#[derive(Debug, Default, Clone)]
pub struct BuildContext {
    /// Package name used for `"_PACKAGE"` blocks without `@name`.
    pub package: Option<String>,
    /// Generics and functions declared somewhere in the input set.
    pub local_callables: HashSet<String>,
}

/// Result of building one block.
#[derive(Debug, Default)]
pub struct BuiltBlock {
    pub topic: Option<Topic>,
    /// `@include` directives: (unit that must come first, line).
    pub includes: Vec<(String, usize)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build a topic from one block.
pub fn build(raw: &RawBlock, parsed: &ParsedBlock, ctx: &BuildContext) -> BuiltBlock {
    let mut out = BuiltBlock::default();
    let pos_at = |line: usize| SourcePos::new(raw.unit.clone(), line);

    for tag in &parsed.tags {
        if !KNOWN_TAGS.contains(&tag.name.as_str()) {
            out.diagnostics
                .push(Diagnostic::validation(pos_at(tag.line), format!("unknown tag `@{}`", tag.name)));
        }
    }

    if !braces_balanced(&parsed.preamble) {
        out.diagnostics
            .push(Diagnostic::validation(raw.pos(), "unbalanced braces in the description text"));
    }
    for tag in parsed.tags.iter().filter(|t| t.name != "examples") {
        if !braces_balanced(&tag.content) {
            out.diagnostics
                .push(Diagnostic::validation(pos_at(tag.line), format!("unbalanced braces in `@{}`", tag.name)));
        }
    }

    for tag in parsed.all("include") {
        for unit in tag.content.split_whitespace() {
            out.includes.push((unit.to_string(), tag.line));
        }
    }

    let mut declaration = raw.declaration.clone();
    let mut s3 = false;

    if let Some(tag) = parsed.last("method") {
        let words: Vec<&str> = tag.content.split_whitespace().collect();
        if words.len() == 2 {
            declaration.kind = DeclKind::Method;
            declaration.name = Some(words[0].to_string());
            declaration.dispatch = vec![words[1].to_string()];
            s3 = true;
        } else {
            out.diagnostics.push(Diagnostic::validation(
                pos_at(tag.line),
                "`@method` needs exactly a generic and a class",
            ));
        }
    }

    // Name binding: @name wins over the declared name.
    if let Some(tag) = parsed.last("name") {
        match tag.content.split_whitespace().next() {
            Some(name) if declaration.kind != DeclKind::Method => {
                declaration.name = Some(name.to_string())
            }
            Some(_) => {}
            None => out
                .diagnostics
                .push(Diagnostic::validation(pos_at(tag.line), "`@name` is empty")),
        }
    }
    if declaration.name.is_none() && declaration.kind == DeclKind::Sentinel(SentinelKind::Package) {
        declaration.name = ctx.package.clone();
    }
    if declaration.name.is_none() {
        // `#' @include x.R` over `NULL` only carries collation directives.
        let directives_only =
            parsed.preamble.trim().is_empty() && parsed.tags.iter().all(|t| t.name == "include");
        if !directives_only {
            out.diagnostics.push(Diagnostic::validation(
                raw.pos(),
                "block documents no named declaration; add `@name`",
            ));
        }
        return out;
    }

    let inferred = infer_doc_type(&declaration);
    let doc_type = match parsed.last("docType") {
        Some(tag) => match tag.content.parse::<DocType>() {
            Ok(dt) => dt,
            Err(msg) => {
                out.diagnostics.push(Diagnostic::validation(pos_at(tag.line), msg));
                inferred
            }
        },
        None => inferred,
    };

    if doc_type == DocType::Method && declaration.dispatch.is_empty() {
        out.diagnostics.push(Diagnostic::validation(
            raw.pos(),
            "method topic needs a dispatch signature (`setMethod` or `@method`)",
        ));
    }

    let export = parsed.has("export");
    if doc_type == DocType::Method && !export {
        if let Some(generic) = declaration.name.as_deref() {
            if !ctx.local_callables.contains(generic) {
                out.diagnostics.push(Diagnostic::warning(
                    raw.pos(),
                    format!(
                        "method for external generic `{generic}` has no `@export`; \
                         its dispatch registration will not be exported"
                    ),
                ));
            }
        }
    }

    let documented = Documented {
        unit: raw.unit.clone(),
        export_names: parsed
            .all("export")
            .flat_map(|t| t.content.split_whitespace().map(str::to_string))
            .collect(),
        declaration,
        s3,
    };

    let default_id = match doc_type {
        DocType::Package => format!("{}-package", documented.declaration.name.as_deref().unwrap_or("")),
        DocType::Class if documented.declaration.kind == DeclKind::Class => {
            format!("{}-class", documented.declaration.name.as_deref().unwrap_or(""))
        }
        _ => documented.display_name().unwrap_or_default(),
    };
    let id = parsed
        .last("rdname")
        .and_then(|t| t.content.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or(default_id);

    let mut topic = Topic::new(id, doc_type, raw.order, raw.pos());
    topic.export = export;
    topic.declarations.push(documented);

    apply_preamble(&mut topic, parsed);
    apply_tags(&mut topic, parsed, &raw.unit, &mut out.diagnostics);

    out.topic = Some(topic);
    out
}

/// Text is Rd markup: `\{`, `\}` and `\\` are literal, other braces must pair.
fn braces_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

fn infer_doc_type(decl: &Declaration) -> DocType {
    match decl.kind {
        DeclKind::Function => DocType::Function,
        DeclKind::Method => DocType::Method,
        DeclKind::Generic => DocType::Generic,
        DeclKind::Class => DocType::Class,
        DeclKind::Data | DeclKind::Sentinel(SentinelKind::Null) => DocType::Data,
        DeclKind::Sentinel(SentinelKind::Package) => DocType::Package,
    }
}

/// Paragraph 1 = title, 2 = description, 3+ = details, each overridden by
/// the matching explicit tag. A missing title falls back to the description.
fn apply_preamble(topic: &mut Topic, parsed: &ParsedBlock) {
    let paras = paragraphs(&parsed.preamble);
    let explicit = |name: &str| {
        parsed
            .last(name)
            .map(|t| t.content.trim())
            .filter(|t| !t.is_empty())
            .map(TextField::explicit)
    };

    topic.title = explicit("title").or_else(|| paras.first().map(TextField::inferred));
    topic.description = explicit("description").or_else(|| paras.get(1).map(TextField::inferred));
    topic.details = explicit("details").or_else(|| {
        (paras.len() > 2).then(|| TextField::inferred(paras[2..].join("\n\n")))
    });

    if topic.title.is_none() {
        if let Some(desc) = &topic.description {
            topic.title = Some(TextField::inferred(desc.text.clone()));
        }
    }
}

fn apply_tags(topic: &mut Topic, parsed: &ParsedBlock, unit: &str, diags: &mut Vec<Diagnostic>) {
    let pos_at = |line: usize| SourcePos::new(unit.to_string(), line);

    for tag in &parsed.tags {
        let content = tag.content.trim();
        match tag.name.as_str() {
            "param" | "slot" | "field" => match split_name(content) {
                Some(param) => {
                    let list = match tag.name.as_str() {
                        "param" => &mut topic.params,
                        "slot" => &mut topic.slots,
                        _ => &mut topic.fields,
                    };
                    if list.iter().any(|p| p.name == param.name) {
                        diags.push(Diagnostic::warning(
                            pos_at(tag.line),
                            format!("`@{} {}` documented twice; keeping the first", tag.name, param.name),
                        ));
                    } else {
                        list.push(param);
                    }
                }
                None => diags.push(Diagnostic::validation(
                    pos_at(tag.line),
                    format!("`@{}` needs a name and a description", tag.name),
                )),
            },
            "return" => push_joined(&mut topic.value, content),
            "section" => match parse_section(content) {
                Some(section) => topic.sections.push(section),
                None => diags.push(Diagnostic::validation(
                    pos_at(tag.line),
                    "`@section` title must end with a colon",
                )),
            },
            "examples" => topic.examples.push(tag.content.clone()),
            "aliases" => extend_unique(&mut topic.aliases, content.split_whitespace()),
            "family" if !content.is_empty() => extend_unique(&mut topic.families, [content]),
            "references" => topic.references.push(content.to_string()),
            "seealso" => topic.seealso.push(content.to_string()),
            "keywords" => extend_unique(&mut topic.keywords, content.split_whitespace()),
            "usage" => topic.usage = Some(TextField::explicit(content)),
            "inheritParams" => extend_unique(&mut topic.inherit_params, content.split_whitespace()),
            "noRd" => topic.no_rd = true,
            "format" => push_joined(&mut topic.format, content),
            "source" => push_joined(&mut topic.source, content),
            _ => {}
        }
    }
}

fn split_name(content: &str) -> Option<Param> {
    let (name, rest) = content.split_once(char::is_whitespace)?;
    let description = rest.trim();
    if name.is_empty() || description.is_empty() {
        return None;
    }
    Some(Param {
        name: name.to_string(),
        description: description.to_string(),
    })
}

fn push_joined(slot: &mut Option<String>, text: &str) {
    if text.is_empty() {
        return;
    }
    match slot {
        Some(existing) => {
            existing.push_str("\n\n");
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

pub(crate) fn extend_unique<'a>(list: &mut Vec<String>, items: impl IntoIterator<Item = &'a str>) {
    for item in items {
        if !list.iter().any(|x| x == item) {
            list.push(item.to_string());
        }
    }
}

/// `Title: body`, where `## Heading` lines in the body open sub-sections.
fn parse_section(content: &str) -> Option<Section> {
    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
    let (title, head) = first.split_once(':')?;
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let body = if rest.is_empty() {
        head.trim().to_string()
    } else {
        format!("{}\n{}", head.trim(), rest)
    };
    Some(nest(title, &body, 2))
}

fn nest(title: &str, text: &str, level: usize) -> Section {
    let marker = format!("{} ", "#".repeat(level));
    let mut body: Vec<&str> = Vec::new();
    let mut subs: Vec<(String, Vec<&str>)> = Vec::new();

    for line in text.lines() {
        if let Some(heading) = line.trim_start().strip_prefix(&marker) {
            subs.push((heading.trim().to_string(), Vec::new()));
        } else if let Some((_, lines)) = subs.last_mut() {
            lines.push(line);
        } else {
            body.push(line);
        }
    }

    Section {
        title: title.to_string(),
        body: body.join("\n").trim().to_string(),
        subsections: subs
            .into_iter()
            .map(|(t, lines)| nest(&t, &lines.join("\n"), level + 1))
            .collect(),
    }
}
