//! Export list: directly callable symbols and dispatch registrations.

use crate::model::{DeclKind, DocType, Topic};
use std::collections::BTreeSet;
use std::fmt;

/// One export directive. Method registrations are kept apart from plain
/// symbols.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportEntry {
    Symbol(String),
    S3Method { generic: String, class: String },
    S4Methods(String),
    Class(String),
}

impl fmt::Display for ExportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportEntry::Symbol(name) => write!(f, "export({})", quote(name)),
            ExportEntry::S3Method { generic, class } => {
                write!(f, "S3method({},{})", quote(generic), quote(class))
            }
            ExportEntry::S4Methods(generic) => write!(f, "exportMethods({})", quote(generic)),
            ExportEntry::Class(name) => write!(f, "exportClasses({})", quote(name)),
        }
    }
}

/// Non-syntactic names are backquoted.
fn quote(name: &str) -> String {
    let syntactic = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if syntactic {
        name.to_string()
    } else {
        format!("`{name}`")
    }
}

/// Directives for every exported topic, de-duplicated.
pub fn export_list(topics: &[Topic]) -> BTreeSet<ExportEntry> {
    let mut entries = BTreeSet::new();
    for topic in topics.iter().filter(|t| t.export) {
        for doc in &topic.declarations {
            if !doc.export_names.is_empty() {
                entries.extend(doc.export_names.iter().cloned().map(ExportEntry::Symbol));
                continue;
            }
            let decl = &doc.declaration;
            let Some(name) = decl.name.clone() else { continue };
            let entry = match (topic.doc_type, decl.kind) {
                (DocType::Package, _) => continue,
                (_, DeclKind::Method) if doc.s3 => ExportEntry::S3Method {
                    generic: name,
                    class: decl.dispatch.join("."),
                },
                (_, DeclKind::Method) => ExportEntry::S4Methods(name),
                (DocType::Class, _) | (_, DeclKind::Class) => ExportEntry::Class(name),
                _ => ExportEntry::Symbol(name),
            };
            entries.insert(entry);
        }
    }
    entries
}

/// `NAMESPACE` file text: header plus sorted directives.
pub fn namespace_file(entries: &BTreeSet<ExportEntry>) -> String {
    let mut lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
    lines.sort();
    let mut out = String::from("# Generated by topicgen: do not edit by hand\n\n");
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn exported(doc_type: DocType, kind: DeclKind, name: &str, dispatch: &[&str], s3: bool) -> Topic {
        let mut t = Topic::new(name, doc_type, SourceOrder::default(), SourcePos::new("u.R", 1));
        let mut decl = Declaration::new(kind, Some(name.into()), 1);
        decl.dispatch = dispatch.iter().map(|s| s.to_string()).collect();
        t.declarations.push(Documented {
            unit: "u.R".into(),
            declaration: decl,
            s3,
            export_names: Vec::new(),
        });
        t.export = true;
        t
    }

    #[test]
    fn entries_by_kind() {
        let topics = vec![
            exported(DocType::Function, DeclKind::Function, "arrange", &[], false),
            exported(DocType::Method, DeclKind::Method, "print", &["tbl"], true),
            exported(DocType::Method, DeclKind::Method, "area", &["Circle"], false),
            exported(DocType::Class, DeclKind::Class, "Circle", &[], false),
            exported(DocType::Package, DeclKind::Sentinel(SentinelKind::Package), "tidy", &[], false),
        ];
        let text = namespace_file(&export_list(&topics));
        assert_eq!(
            text,
            "# Generated by topicgen: do not edit by hand\n\n\
             S3method(print,tbl)\n\
             export(arrange)\n\
             exportClasses(Circle)\n\
             exportMethods(area)\n"
        );
    }

    #[test]
    fn unexported_topics_are_skipped() {
        let mut t = exported(DocType::Function, DeclKind::Function, "helper", &[], false);
        t.export = false;
        assert!(export_list(&[t]).is_empty());
    }

    #[test]
    fn explicit_export_names_replace_declared_name() {
        let mut t = exported(DocType::Function, DeclKind::Function, "f", &[], false);
        t.declarations[0].export_names = vec!["g".into(), "h".into()];
        let list: Vec<String> = export_list(&[t]).iter().map(ToString::to_string).collect();
        assert_eq!(list, vec!["export(g)", "export(h)"]);
    }

    #[test]
    fn duplicates_collapse_and_operators_are_quoted() {
        let a = exported(DocType::Function, DeclKind::Function, "%>%", &[], false);
        let b = a.clone();
        let list = export_list(&[a, b]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().to_string(), "export(`%>%`)");
    }
}
