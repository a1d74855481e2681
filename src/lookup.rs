//! Lookup resolver: query protocol over an alias index.
//!
//! Queries come in three shapes:
//!
//! - `name`: plain-name namespace
//! - `package?name`, `class?name`: qualified namespaces
//! - `generic(type, ...)`: combination namespace, most specific match wins
//!
//! Stores are immutable once built; a source change means a new store
//! swapped in wholesale.

use crate::error::{Error, LookupError, Result};
use crate::index::{parse_combination, AliasIndex, Namespace};
use crate::model::Topic;
use crate::render::Renderer;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Alias table file name inside an output directory.
pub const ALIAS_TABLE: &str = "aliases.tsv";
/// Rendered documents directory inside an output directory.
pub const MAN_DIR: &str = "man";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Plain(String),
    Qualified { namespace: Namespace, name: String },
    Combination { generic: String, types: Vec<String> },
}

impl Query {
    pub fn parse(text: &str) -> std::result::Result<Self, LookupError> {
        let text = text.trim();
        if let Some((ns, name)) = text.split_once('?') {
            let name = name.trim().to_string();
            return match ns.trim() {
                "" => Ok(Query::Plain(name)),
                "package" => Ok(Query::Qualified {
                    namespace: Namespace::Package,
                    name,
                }),
                "class" => Ok(Query::Qualified {
                    namespace: Namespace::Class,
                    name,
                }),
                _ => Err(LookupError::NotFound {
                    query: text.to_string(),
                }),
            };
        }
        if text.ends_with(')') {
            if let Some((generic, types)) = parse_combination(text) {
                return Ok(Query::Combination { generic, types });
            }
        }
        Ok(Query::Plain(text.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Topics built in this invocation.
    Source,
    /// Topics reloaded from a previous build's output.
    Compiled,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Source => "source",
            Scope::Compiled => "compiled",
        })
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "source" => Ok(Scope::Source),
            "compiled" => Ok(Scope::Compiled),
            other => Err(format!("unknown scope `{other}` (use source or compiled)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTopic {
    pub id: String,
    pub text: String,
}

/// An alias index plus the rendered document for every topic it names.
#[derive(Debug, Default)]
pub struct TopicStore {
    index: AliasIndex,
    documents: BTreeMap<String, String>,
}

impl TopicStore {
    pub fn new(index: AliasIndex, documents: BTreeMap<String, String>) -> Self {
        Self { index, documents }
    }

    /// Render every renderable topic of a finished build.
    pub fn from_topics(index: AliasIndex, topics: &[Topic], renderer: &dyn Renderer) -> Self {
        let documents = topics
            .iter()
            .filter(|t| crate::pipeline::is_renderable(t))
            .map(|t| (t.id.clone(), renderer.render(t)))
            .collect();
        Self { index, documents }
    }

    /// Reload `aliases.tsv` and `man/*.Rd` from a build output directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| Error::Io { path, source }
        };

        let table = dir.join(ALIAS_TABLE);
        let text = fs::read_to_string(&table).map_err(io_err(&table))?;
        let index = AliasIndex::from_tsv(&text)?;

        let man = dir.join(MAN_DIR);
        let mut documents = BTreeMap::new();
        if man.is_dir() {
            for entry in fs::read_dir(&man).map_err(io_err(&man))?.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("Rd") {
                    continue;
                }
                let Some(id) = path.file_stem().and_then(|s| s.to_str()) else { continue };
                let text = fs::read_to_string(&path).map_err(io_err(&path))?;
                documents.insert(id.to_string(), text);
            }
        }
        tracing::debug!(aliases = index.len(), documents = documents.len(), "loaded compiled topics");
        Ok(Self { index, documents })
    }

    pub fn index(&self) -> &AliasIndex {
        &self.index
    }

    /// Resolve a query to a topic identifier.
    pub fn resolve(&self, query: &Query, text: &str) -> std::result::Result<String, LookupError> {
        let not_found = || LookupError::NotFound {
            query: text.to_string(),
        };
        match query {
            Query::Plain(name) => self.index.get(Namespace::Plain, name).map(str::to_string).ok_or_else(not_found),
            Query::Qualified { namespace, name } => {
                self.index.get(*namespace, name).map(str::to_string).ok_or_else(not_found)
            }
            Query::Combination { generic, types } => self.resolve_combination(generic, types, text),
        }
    }

    fn resolve_combination(
        &self,
        generic: &str,
        types: &[String],
        text: &str,
    ) -> std::result::Result<String, LookupError> {
        let mut best: Option<usize> = None;
        let mut candidates: Vec<(Vec<String>, String)> = Vec::new();

        for (signature, topic) in self.index.combinations(generic) {
            if signature == types {
                return Ok(topic.to_string());
            }
            let Some(score) = prefix_score(&signature, types) else { continue };
            match best {
                Some(b) if score < b => continue,
                Some(b) if score == b => {}
                _ => {
                    best = Some(score);
                    candidates.clear();
                }
            }
            candidates.push((signature, topic.to_string()));
        }

        match candidates.len() {
            0 => Err(LookupError::NotFound {
                query: text.to_string(),
            }),
            1 => Ok(candidates.remove(0).1),
            _ => Err(LookupError::Ambiguous {
                query: text.to_string(),
                candidates: candidates
                    .into_iter()
                    .map(|(sig, _)| crate::index::combination_key(generic, &sig))
                    .collect(),
            }),
        }
    }

    /// Resolve and fetch the rendered document.
    pub fn lookup(&self, text: &str) -> std::result::Result<RenderedTopic, LookupError> {
        let query = Query::parse(text)?;
        let id = self.resolve(&query, text)?;
        match self.documents.get(&id) {
            Some(doc) => Ok(RenderedTopic { id, text: doc.clone() }),
            None => Err(LookupError::NotRendered {
                query: text.to_string(),
                topic: id,
            }),
        }
    }
}

/// Length of the shared prefix when one type list is a prefix of the other.
/// A partial match needs at least one matched type.
fn prefix_score(signature: &[String], query: &[String]) -> Option<usize> {
    let n = signature.len().min(query.len());
    (n > 0 && signature[..n] == query[..n]).then_some(n)
}

/// Scoped entry point; each scope holds a shared, read-only store.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    source: Option<Arc<TopicStore>>,
    compiled: Option<Arc<TopicStore>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a store for `scope`, replacing any previous one.
    pub fn set(&mut self, scope: Scope, store: Arc<TopicStore>) {
        match scope {
            Scope::Source => self.source = Some(store),
            Scope::Compiled => self.compiled = Some(store),
        }
    }

    pub fn store(&self, scope: Scope) -> Option<&Arc<TopicStore>> {
        match scope {
            Scope::Source => self.source.as_ref(),
            Scope::Compiled => self.compiled.as_ref(),
        }
    }

    pub fn lookup(&self, query: &str, scope: Scope) -> std::result::Result<RenderedTopic, LookupError> {
        let store = self.store(scope).ok_or_else(|| LookupError::ScopeUnavailable {
            scope: scope.to_string(),
        })?;
        store.lookup(query)
    }
}
