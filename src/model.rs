//! Data model for extracted blocks and documentation topics, independent of output format.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A source unit handed to the pipeline: identifier plus full text.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: String,
    pub text: String,
}

impl SourceUnit {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Unit + 1-based line, attached to every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePos {
    pub unit: String,
    pub line: usize,
}

impl SourcePos {
    pub fn new(unit: impl Into<String>, line: usize) -> Self {
        Self {
            unit: unit.into(),
            line,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.unit, self.line)
    }
}

/// Position of a block in the whole input: (unit ordinal, line).
///
/// Merging always folds in this order, so the result does not depend on the
/// order topics arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SourceOrder {
    pub unit: usize,
    pub line: usize,
}

/// Statement that stands in for a declaration when documenting data or packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentinelKind {
    /// `NULL`
    Null,
    /// `"_PACKAGE"`
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Function,
    Method,
    Generic,
    Class,
    Data,
    Sentinel(SentinelKind),
}

/// The declaration a block documents, as recognized in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub kind: DeclKind,
    /// Declared name; for methods the generic's name. `None` for sentinels.
    pub name: Option<String>,
    /// Formal argument list without the surrounding parentheses.
    pub formals: Option<String>,
    /// Dispatch type list for methods, in declaration order.
    pub dispatch: Vec<String>,
    pub line: usize,
}

impl Declaration {
    pub fn new(kind: DeclKind, name: Option<String>, line: usize) -> Self {
        Self {
            kind,
            name,
            formals: None,
            dispatch: Vec::new(),
            line,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, DeclKind::Sentinel(_))
    }

    /// Names of the formal arguments, `...` included.
    pub fn formal_names(&self) -> Vec<String> {
        let Some(formals) = self.formals.as_deref() else {
            return Vec::new();
        };
        split_top_level(formals)
            .into_iter()
            .filter_map(|arg| {
                let name = arg.split('=').next().unwrap_or("").trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }
}

/// Split on commas that are not nested inside brackets or quotes.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// A run of marker-comment lines bound to the declaration it precedes.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub unit: String,
    pub order: SourceOrder,
    /// (line number, text with marker and one space stripped)
    pub lines: Vec<(usize, String)>,
    pub declaration: Declaration,
}

impl RawBlock {
    pub fn pos(&self) -> SourcePos {
        SourcePos::new(self.unit.clone(), self.order.line)
    }
}

/// A named, delimited content span inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub content: String,
    pub line: usize,
}

/// Output of the tag parser for one block.
#[derive(Debug, Clone, Default)]
pub struct ParsedBlock {
    pub preamble: String,
    pub tags: Vec<Tag>,
}

impl ParsedBlock {
    pub fn first(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn last(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().rev().find(|t| t.name == name)
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Function,
    Method,
    Generic,
    Class,
    Data,
    Package,
}

impl DocType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Function => "function",
            DocType::Method => "method",
            DocType::Generic => "generic",
            DocType::Class => "class",
            DocType::Data => "data",
            DocType::Package => "package",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "function" => Ok(DocType::Function),
            "method" | "methods" => Ok(DocType::Method),
            "generic" => Ok(DocType::Generic),
            "class" => Ok(DocType::Class),
            "data" => Ok(DocType::Data),
            "package" => Ok(DocType::Package),
            other => Err(format!("unknown doc type `{other}`")),
        }
    }
}

/// A title/description/details value and whether a tag set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextField {
    pub text: String,
    pub explicit: bool,
}

impl TextField {
    pub fn inferred(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explicit: false,
        }
    }

    pub fn explicit(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explicit: true,
        }
    }
}

/// `@param`, `@slot` and `@field` entries. `name` may list several
/// comma-separated names documented together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub description: String,
}

impl Param {
    pub fn covers(&self, formal: &str) -> bool {
        self.name.split(',').any(|n| n.trim() == formal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: String,
    pub subsections: Vec<Section>,
}

/// A declaration documented by a topic, with the unit it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Documented {
    pub unit: String,
    pub declaration: Declaration,
    /// `@method generic class` marks an S3-style method.
    pub s3: bool,
    /// `@export name` values given for this declaration.
    pub export_names: Vec<String>,
}

impl Documented {
    /// Name the declaration is known by; methods get `generic,A,B-method`.
    pub fn display_name(&self) -> Option<String> {
        let name = self.declaration.name.as_deref()?;
        if self.declaration.kind == DeclKind::Method && !self.s3 {
            return Some(format!("{},{}-method", name, self.declaration.dispatch.join(",")));
        }
        if self.s3 {
            return Some(format!("{}.{}", name, self.declaration.dispatch.join(".")));
        }
        Some(name.to_string())
    }
}

/// One logical documentation unit, possibly covering several declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    /// Grouping identifier; also the rendered name.
    pub id: String,
    #[serde(skip)]
    pub order: SourceOrder,
    #[serde(skip)]
    pub pos: SourcePos,
    pub title: Option<TextField>,
    pub description: Option<TextField>,
    pub details: Option<TextField>,
    pub usage: Option<TextField>,
    pub value: Option<String>,
    pub params: Vec<Param>,
    pub sections: Vec<Section>,
    pub doc_type: DocType,
    pub export: bool,
    pub aliases: Vec<String>,
    pub families: Vec<String>,
    pub references: Vec<String>,
    pub seealso: Vec<String>,
    pub keywords: Vec<String>,
    pub examples: Vec<String>,
    pub format: Option<String>,
    pub source: Option<String>,
    pub slots: Vec<Param>,
    pub fields: Vec<Param>,
    pub inherit_params: Vec<String>,
    pub no_rd: bool,
    pub declarations: Vec<Documented>,
    /// Package names whose plain key went to a same-named symbol.
    #[serde(skip)]
    pub shadowed_aliases: Vec<String>,
}

impl Topic {
    pub fn new(id: impl Into<String>, doc_type: DocType, order: SourceOrder, pos: SourcePos) -> Self {
        Self {
            id: id.into(),
            order,
            pos,
            title: None,
            description: None,
            details: None,
            usage: None,
            value: None,
            params: Vec::new(),
            sections: Vec::new(),
            doc_type,
            export: false,
            aliases: Vec::new(),
            families: Vec::new(),
            references: Vec::new(),
            seealso: Vec::new(),
            keywords: Vec::new(),
            examples: Vec::new(),
            format: None,
            source: None,
            slots: Vec::new(),
            fields: Vec::new(),
            inherit_params: Vec::new(),
            no_rd: false,
            declarations: Vec::new(),
            shadowed_aliases: Vec::new(),
        }
    }

    pub fn title_text(&self) -> &str {
        self.title.as_ref().map(|f| f.text.as_str()).unwrap_or("")
    }

    /// Units this topic draws from, in first-seen order.
    pub fn source_units(&self) -> Vec<&str> {
        let mut units: Vec<&str> = Vec::new();
        for d in &self.declarations {
            if !units.contains(&d.unit.as_str()) {
                units.push(&d.unit);
            }
        }
        units
    }
}
