//! Block extractor: groups marker comments and binds them to declarations.
//!
//! Lines are classified as marker comment, plain comment, blank or code. A
//! run of marker lines is bound to the first code line after it, provided
//! that line starts a declaration the recognizer understands.

use crate::error::Diagnostic;
use crate::model::*;
use regex::Regex;
use std::sync::LazyLock;

/// Upper bound on lines scanned to close one multi-line statement.
const MAX_STATEMENT_LINES: usize = 200;

static RE_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z.][\w.]*|`[^`]+`)\s*(?:<-|<<-|=)\s*function\s*\(").unwrap()
});

static RE_SET_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*setGeneric\s*\(\s*(?:name\s*=\s*)?["']([^"']+)["']"#).unwrap());

static RE_SET_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*setMethod\s*\(\s*(?:f\s*=\s*)?["']([^"']+)["']\s*,\s*(?:signature\s*=\s*)?"#).unwrap()
});

static RE_SET_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:[\w.]+\s*(?:<-|=)\s*)?set(?:Ref)?Class\s*\(\s*(?:Class\s*=\s*)?["']([^"']+)["']"#)
        .unwrap()
});

static RE_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z.][\w.]*)\s*(?:<-|<<-|=)").unwrap());

static RE_NULL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*NULL\s*$").unwrap());

static RE_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*["']_PACKAGE["']\s*$"#).unwrap());

static RE_FUNCTION_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfunction\s*\(").unwrap());

static RE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']([^"']*)["']"#).unwrap());

/// Recognizes the declaration (if any) starting at a code line.
///
/// This is the seam where host-language knowledge enters the pipeline.
pub trait DeclarationRecognizer: Sync {
    fn recognize(&self, lines: &[&str], idx: usize) -> Option<Declaration>;
}

/// Recognizer for R sources: functions, S4 generics/methods/classes,
/// plain assignments and the `NULL` / `"_PACKAGE"` sentinels.
#[derive(Debug, Default, Clone, Copy)]
pub struct RDialect;

impl DeclarationRecognizer for RDialect {
    fn recognize(&self, lines: &[&str], idx: usize) -> Option<Declaration> {
        let line = lines[idx];
        let line_no = idx + 1;

        if RE_NULL.is_match(line) {
            return Some(Declaration::new(DeclKind::Sentinel(SentinelKind::Null), None, line_no));
        }
        if RE_PACKAGE.is_match(line) {
            return Some(Declaration::new(DeclKind::Sentinel(SentinelKind::Package), None, line_no));
        }

        let stmt = statement_text(lines, idx);

        if let Some(caps) = RE_SET_GENERIC.captures(&stmt) {
            let mut decl = Declaration::new(DeclKind::Generic, Some(caps[1].to_string()), line_no);
            decl.formals = function_formals(&stmt);
            return Some(decl);
        }

        if let Some(caps) = RE_SET_METHOD.captures(&stmt) {
            let mut decl = Declaration::new(DeclKind::Method, Some(caps[1].to_string()), line_no);
            let rest = &stmt[caps.get(0).map_or(0, |m| m.end())..];
            decl.dispatch = method_signature(rest);
            decl.formals = function_formals(rest);
            return Some(decl);
        }

        if let Some(caps) = RE_SET_CLASS.captures(&stmt) {
            return Some(Declaration::new(DeclKind::Class, Some(caps[1].to_string()), line_no));
        }

        if let Some(caps) = RE_FUNCTION.captures(&stmt) {
            let name = caps[1].trim_matches('`').to_string();
            let mut decl = Declaration::new(DeclKind::Function, Some(name), line_no);
            decl.formals = function_formals(&stmt);
            return Some(decl);
        }

        if let Some(caps) = RE_ASSIGN.captures(line) {
            return Some(Declaration::new(DeclKind::Data, Some(caps[1].to_string()), line_no));
        }

        None
    }
}

/// Blocks and diagnostics from one unit.
#[derive(Debug, Default)]
pub struct Extraction {
    pub blocks: Vec<RawBlock>,
    pub diagnostics: Vec<Diagnostic>,
}

enum LineClass<'a> {
    Marker(&'a str),
    Comment,
    Blank,
    Code,
}

fn classify<'a>(line: &'a str, marker: &str) -> LineClass<'a> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(marker) {
        return LineClass::Marker(rest.strip_prefix(' ').unwrap_or(rest));
    }
    if trimmed.starts_with('#') {
        LineClass::Comment
    } else if trimmed.trim_end().is_empty() {
        LineClass::Blank
    } else {
        LineClass::Code
    }
}

/// Scan one unit top to bottom and collect its blocks in source order.
pub fn extract(
    unit: &SourceUnit,
    ordinal: usize,
    marker: &str,
    recognizer: &dyn DeclarationRecognizer,
) -> Extraction {
    let lines: Vec<&str> = unit.text.lines().collect();
    let mut out = Extraction::default();
    let mut run: Vec<(usize, String)> = Vec::new();
    // A blank or plain comment was seen after the current run.
    let mut run_closed = false;

    for (idx, line) in lines.iter().enumerate() {
        match classify(line, marker) {
            LineClass::Marker(text) => {
                if run_closed && !run.is_empty() {
                    out.diagnostics.push(unbound(unit, &run));
                    run.clear();
                }
                run_closed = false;
                run.push((idx + 1, text.trim_end().to_string()));
            }
            LineClass::Comment | LineClass::Blank => {
                if !run.is_empty() {
                    run_closed = true;
                }
            }
            LineClass::Code => {
                if run.is_empty() {
                    continue;
                }
                match recognizer.recognize(&lines, idx) {
                    Some(declaration) => {
                        let first_line = run[0].0;
                        out.blocks.push(RawBlock {
                            unit: unit.id.clone(),
                            order: SourceOrder {
                                unit: ordinal,
                                line: first_line,
                            },
                            lines: std::mem::take(&mut run),
                            declaration,
                        });
                    }
                    None => {
                        out.diagnostics.push(unbound(unit, &run));
                        run.clear();
                    }
                }
                run_closed = false;
            }
        }
    }

    if !run.is_empty() {
        out.diagnostics.push(unbound(unit, &run));
    }

    out
}

/// Names of every function and generic declared in the unit, documented
/// or not.
pub fn declared_callables(unit: &SourceUnit, marker: &str, recognizer: &dyn DeclarationRecognizer) -> Vec<String> {
    let lines: Vec<&str> = unit.text.lines().collect();
    (0..lines.len())
        .filter(|&idx| matches!(classify(lines[idx], marker), LineClass::Code))
        .filter_map(|idx| recognizer.recognize(&lines, idx))
        .filter(|decl| matches!(decl.kind, DeclKind::Function | DeclKind::Generic))
        .filter_map(|decl| decl.name)
        .collect()
}

fn unbound(unit: &SourceUnit, run: &[(usize, String)]) -> Diagnostic {
    Diagnostic::warning(
        SourcePos::new(unit.id.clone(), run[0].0),
        "documentation block is not followed by a declaration; discarded",
    )
}

/// Join lines from `idx` until parentheses balance.
fn statement_text(lines: &[&str], idx: usize) -> String {
    let mut text = String::new();
    let mut depth = 0i32;
    for line in lines.iter().skip(idx).take(MAX_STATEMENT_LINES) {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(line);
        depth += paren_delta(line);
        if depth <= 0 {
            break;
        }
    }
    text
}

fn paren_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    for ch in line.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '#') => break,
            (None, '(') => delta += 1,
            (None, ')') => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Contents of the balanced parentheses opening at byte `open`.
fn balanced(text: &str, open: usize) -> Option<&str> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, ch) in text[open..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn function_formals(stmt: &str) -> Option<String> {
    let m = RE_FUNCTION_KEYWORD.find(stmt)?;
    let open = m.end() - 1;
    let inner = balanced(stmt, open)?;
    Some(normalize_ws(inner))
}

fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dispatch types from the argument following the generic name:
/// `signature("A", y = "B")`, `c("A", "B")` or `"A"`.
fn method_signature(rest: &str) -> Vec<String> {
    let rest = rest.trim_start();
    for prefix in ["signature", "c"] {
        if let Some(after) = rest.strip_prefix(prefix) {
            let after_trim = after.trim_start();
            if after_trim.starts_with('(') {
                let open = rest.len() - after_trim.len();
                if let Some(inner) = balanced(rest, open) {
                    return split_top_level(inner)
                        .into_iter()
                        .filter_map(|part| RE_QUOTED.captures(part).map(|c| c[1].to_string()))
                        .collect();
                }
            }
        }
    }
    RE_QUOTED
        .captures(rest)
        .filter(|c| c.get(0).is_some_and(|m| m.start() == 0))
        .map(|c| vec![c[1].to_string()])
        .unwrap_or_default()
}
