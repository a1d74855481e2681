//! Renderer module: trait-based format dispatch.
//!
//! Rendering is a pure function of one finalized topic. No validation
//! happens here.

pub mod json;
pub mod rd;

use crate::error::{Error, Result};
use crate::model::{DeclKind, DocType, Topic};

/// Trait for rendering a Topic into a specific output format.
pub trait Renderer: Sync {
    fn render(&self, topic: &Topic) -> String;
    fn file_extension(&self) -> &str;
}

/// Create a renderer for the given format name.
pub fn create_renderer(format: &str) -> Result<Box<dyn Renderer>> {
    match format {
        "rd" => Ok(Box::new(rd::RdRenderer)),
        "json" => Ok(Box::new(json::JsonRenderer)),
        other => Err(Error::UnknownFormat(other.to_string())),
    }
}

/// Usage lines: the explicit `@usage` text, or one line per declaration.
pub fn usage_lines(topic: &Topic) -> Vec<String> {
    if let Some(usage) = &topic.usage {
        return usage.text.lines().map(str::to_string).collect();
    }

    let mut lines: Vec<String> = Vec::new();
    for doc in &topic.declarations {
        let decl = &doc.declaration;
        let Some(name) = decl.name.as_deref() else { continue };
        let formals = decl.formals.as_deref().unwrap_or("");
        let line = match (topic.doc_type, decl.kind) {
            (DocType::Class | DocType::Package, _) => continue,
            (DocType::Data, _) => name.to_string(),
            (_, DeclKind::Method) if doc.s3 => {
                format!("\\method{{{}}}{{{}}}({})", name, decl.dispatch.join(","), formals)
            }
            (_, DeclKind::Method) => {
                format!("\\S4method{{{}}}{{{}}}({})", name, decl.dispatch.join(","), formals)
            }
            (_, DeclKind::Function | DeclKind::Generic) => format!("{name}({formals})"),
            _ => continue,
        };
        if !lines.contains(&line) {
            lines.push(line);
        }
    }
    lines
}
