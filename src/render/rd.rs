//! Rd renderer: the canonical declarative output, one document per topic.
//!
//! Field order is fixed; nothing here iterates a hash map.

use crate::model::*;
use crate::render::{usage_lines, Renderer};
use crate::topic::extend_unique;

pub struct RdRenderer;

impl Renderer for RdRenderer {
    fn render(&self, topic: &Topic) -> String {
        let mut out = String::new();

        out.push_str("% Generated by topicgen: do not edit by hand\n");
        let units = topic.source_units();
        if !units.is_empty() {
            out.push_str(&format!("% Please edit documentation in {}\n", units.join(", ")));
        }

        out.push_str(&format!("\\name{{{}}}\n", escape(&topic.id)));
        match topic.doc_type {
            DocType::Function | DocType::Generic => {}
            DocType::Method => out.push_str("\\docType{methods}\n"),
            other => out.push_str(&format!("\\docType{{{other}}}\n")),
        }
        out.push_str(&format!("\\title{{{}}}\n", escape(topic.title_text().trim())));

        if let Some(desc) = text_of(&topic.description) {
            block(&mut out, "description", &escape(desc));
        }

        let usage = usage_lines(topic);
        if !usage.is_empty() {
            block(&mut out, "usage", &escape(&usage.join("\n")));
        }

        if !topic.params.is_empty() {
            let items: Vec<String> = topic
                .params
                .iter()
                .map(|p| format!("\\item{{{}}}{{{}}}", escape(&p.name), escape(&p.description)))
                .collect();
            block(&mut out, "arguments", &items.join("\n\n"));
        }

        if let Some(value) = &topic.value {
            block(&mut out, "value", &escape(value));
        }
        if let Some(details) = text_of(&topic.details) {
            block(&mut out, "details", &escape(details));
        }
        if let Some(format) = &topic.format {
            block(&mut out, "format", &escape(format));
        }
        if let Some(source) = &topic.source {
            block(&mut out, "source", &escape(source));
        }

        describe(&mut out, "Slots", &topic.slots);
        describe(&mut out, "Fields", &topic.fields);
        for section in &topic.sections {
            render_section(&mut out, "section", section);
        }

        if !topic.examples.is_empty() {
            let examples: Vec<&str> = topic.examples.iter().map(|e| e.trim_matches('\n')).collect();
            block(&mut out, "examples", &examples.join("\n\n"));
        }
        if !topic.references.is_empty() {
            block(&mut out, "references", &escape(&topic.references.join("\n\n")));
        }
        if !topic.seealso.is_empty() {
            block(&mut out, "seealso", &escape(&topic.seealso.join("\n\n")));
        }

        for keyword in &topic.keywords {
            out.push_str(&format!("\\keyword{{{}}}\n", escape(keyword)));
        }
        for alias in aliases(topic) {
            out.push_str(&format!("\\alias{{{}}}\n", escape(&alias)));
        }

        out
    }

    fn file_extension(&self) -> &str {
        "Rd"
    }
}

/// Alias lines: the identifier, every declaration's lookup name, then the
/// explicit aliases, de-duplicated in that order. A package's plain name is
/// left out when a symbol holds that key.
pub fn aliases(topic: &Topic) -> Vec<String> {
    let mut out = vec![topic.id.clone()];
    for doc in &topic.declarations {
        let Some(name) = doc.declaration.name.as_deref() else { continue };
        match topic.doc_type {
            DocType::Package => {
                if !topic.shadowed_aliases.iter().any(|s| s == name) {
                    extend_unique(&mut out, [name]);
                }
                extend_unique(&mut out, [format!("package-{name}").as_str()]);
            }
            DocType::Class => extend_unique(&mut out, [format!("{name}-class").as_str()]),
            _ => {
                if let Some(display) = doc.display_name() {
                    extend_unique(&mut out, [display.as_str()]);
                }
            }
        }
    }
    extend_unique(&mut out, topic.aliases.iter().map(String::as_str));
    out
}

fn text_of(field: &Option<TextField>) -> Option<&str> {
    field
        .as_ref()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
}

fn block(out: &mut String, name: &str, body: &str) {
    out.push_str(&format!("\\{name}{{\n{body}\n}}\n"));
}

fn describe(out: &mut String, title: &str, items: &[Param]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\\section{{{title}}}{{\n\\describe{{\n"));
    for item in items {
        out.push_str(&format!(
            "\\item{{\\code{{{}}}}}{{{}}}\n",
            escape(&item.name),
            escape(&item.description)
        ));
    }
    out.push_str("}\n}\n");
}

fn render_section(out: &mut String, command: &str, section: &Section) {
    out.push_str(&format!("\\{}{{{}}}{{\n", command, escape(&section.title)));
    let body = section.body.trim_matches('\n');
    if !body.is_empty() {
        out.push_str(&escape(body));
        out.push('\n');
    }
    for sub in &section.subsections {
        render_section(out, "subsection", sub);
    }
    out.push_str("}\n");
}

/// Text fields are passed through as Rd markup, so only `%` (an Rd comment)
/// is escaped. Brace balance is checked when the topic is built. Examples
/// are never escaped.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = '\0';
    for ch in text.chars() {
        if ch == '%' && prev != '\\' {
            out.push('\\');
        }
        out.push(ch);
        prev = ch;
    }
    out
}
