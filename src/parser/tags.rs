//! Tag parser: splits a block into its preamble and ordered tags.
//!
//! A logical line starting with `@name` opens a tag; everything up to the
//! next tag (or block end) is its content. `@@` is the escape for a literal
//! `@` and never opens a tag.

use crate::error::Diagnostic;
use crate::model::*;
use regex::Regex;
use std::sync::LazyLock;

static RE_TAG_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z][A-Za-z0-9_.]*)(?:\s+(.*))?$").unwrap());

/// Tag names the topic builder understands. Anything else is kept as an
/// opaque tag and reported later.
pub const KNOWN_TAGS: &[&str] = &[
    "title",
    "description",
    "details",
    "param",
    "return",
    "section",
    "examples",
    "export",
    "name",
    "rdname",
    "aliases",
    "family",
    "references",
    "seealso",
    "keywords",
    "docType",
    "usage",
    "include",
    "inheritParams",
    "noRd",
    "method",
    "format",
    "source",
    "slot",
    "field",
];

#[derive(Debug, Default)]
pub struct TagParse {
    pub block: ParsedBlock,
    pub diagnostics: Vec<Diagnostic>,
}

struct OpenTag {
    name: String,
    line: usize,
    lines: Vec<String>,
}

/// Parse the text of one raw block.
pub fn parse_block(raw: &RawBlock) -> TagParse {
    let mut out = TagParse::default();
    let mut preamble: Vec<String> = Vec::new();
    let mut current: Option<OpenTag> = None;

    for (line_no, text) in &raw.lines {
        let logical = text.trim_start();

        if !logical.starts_with("@@") {
            if let Some(caps) = RE_TAG_START.captures(logical) {
                if let Some(done) = current.take() {
                    out.block.tags.push(close(done));
                }
                let first = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                current = Some(OpenTag {
                    name: caps[1].to_string(),
                    line: *line_no,
                    lines: vec![unescape(first)],
                });
                continue;
            }
            if logical.starts_with('@') {
                out.diagnostics.push(Diagnostic::parse(
                    SourcePos::new(raw.unit.clone(), *line_no),
                    "`@` is not followed by a tag name; write `@@` for a literal `@`",
                ));
            }
        }

        let line = unescape(text);
        match current.as_mut() {
            Some(tag) => tag.lines.push(line),
            None => preamble.push(line),
        }
    }

    if let Some(done) = current.take() {
        out.block.tags.push(close(done));
    }
    out.block.preamble = trim_blank_lines(&preamble);
    out
}

fn close(tag: OpenTag) -> Tag {
    Tag {
        name: tag.name,
        content: trim_blank_lines(&tag.lines),
        line: tag.line,
    }
}

fn unescape(text: &str) -> String {
    text.replace("@@", "@")
}

/// Join lines, dropping leading/trailing blank lines and trailing whitespace
/// but keeping indentation and internal blank lines.
fn trim_blank_lines(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e]
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Split text into blank-line separated paragraphs.
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n").trim().to_string());
    }
    out
}
