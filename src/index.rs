//! Alias indexer: every lookup key that leads to a topic.
//!
//! The index is a pure function of the finalized topic set. It is built once
//! and never mutated afterwards; a source change means a new index.

use crate::error::{Error, Result};
use crate::model::{DeclKind, DocType, Topic};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Query-kind namespaces. Keys only need to be unique within one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Plain,
    Package,
    Class,
    Combination,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Plain => "plain",
            Namespace::Package => "package",
            Namespace::Class => "class",
            Namespace::Combination => "combination",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Namespace::Plain),
            "package" => Ok(Namespace::Package),
            "class" => Ok(Namespace::Class),
            "combination" => Ok(Namespace::Combination),
            other => Err(format!("unknown namespace `{other}`")),
        }
    }
}

/// What to do when a package topic's synthesized plain `<name>` key is
/// already taken by a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AliasPolicy {
    /// The symbol keeps the key; the package stays reachable via `package?name`.
    #[default]
    PreferSymbol,
    /// Always add the key; a clash is a collision error.
    Strict,
}

impl FromStr for AliasPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefer-symbol" => Ok(AliasPolicy::PreferSymbol),
            "strict" => Ok(AliasPolicy::Strict),
            other => Err(format!("unknown alias policy `{other}` (use prefer-symbol or strict)")),
        }
    }
}

/// Format a combination key: `generic(type1,type2)`.
pub fn combination_key(generic: &str, types: &[String]) -> String {
    format!("{}({})", generic, types.join(","))
}

/// Split `generic(type1, type2)` into its parts.
pub fn parse_combination(key: &str) -> Option<(String, Vec<String>)> {
    let open = key.find('(')?;
    let inner = key[open + 1..].strip_suffix(')')?;
    let generic = key[..open].trim();
    if generic.is_empty() {
        return None;
    }
    let types = inner
        .split(',')
        .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Some((generic.to_string(), types))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasIndex {
    entries: BTreeMap<(Namespace, String), String>,
}

impl AliasIndex {
    /// Compute every key for every topic. Any key claimed by two topics in
    /// the same namespace fails the whole build.
    pub fn build(topics: &[Topic], policy: AliasPolicy) -> Result<Self> {
        let mut index = AliasIndex::default();

        for topic in topics {
            index.insert(Namespace::Plain, &topic.id, &topic.id)?;
            for alias in &topic.aliases {
                index.insert(Namespace::Plain, alias, &topic.id)?;
            }

            for doc in &topic.declarations {
                let decl = &doc.declaration;
                let Some(name) = decl.name.as_deref() else { continue };
                if decl.kind == DeclKind::Method && !decl.dispatch.is_empty() {
                    let key = combination_key(name, &decl.dispatch);
                    index.insert(Namespace::Combination, &key, &topic.id)?;
                }
                match topic.doc_type {
                    DocType::Package => {
                        index.insert(Namespace::Plain, &format!("package-{name}"), &topic.id)?;
                        index.insert(Namespace::Package, name, &topic.id)?;
                    }
                    DocType::Class => {
                        index.insert(Namespace::Plain, &format!("{name}-class"), &topic.id)?;
                        index.insert(Namespace::Class, name, &topic.id)?;
                    }
                    _ => {
                        if let Some(display) = doc.display_name() {
                            index.insert(Namespace::Plain, &display, &topic.id)?;
                        }
                    }
                }
            }
        }

        // Synthesized plain package keys go last so symbols claim first.
        for topic in topics.iter().filter(|t| t.doc_type == DocType::Package) {
            for doc in &topic.declarations {
                let Some(name) = doc.declaration.name.as_deref() else { continue };
                let taken = index.get(Namespace::Plain, name).is_some();
                match policy {
                    AliasPolicy::PreferSymbol if taken => {
                        tracing::debug!(name, "package alias shadowed by symbol");
                    }
                    _ => index.insert(Namespace::Plain, name, &topic.id)?,
                }
            }
        }

        Ok(index)
    }

    fn insert(&mut self, ns: Namespace, key: &str, topic: &str) -> Result<()> {
        match self.entries.get(&(ns, key.to_string())) {
            Some(existing) if existing == topic => Ok(()),
            Some(existing) => Err(Error::Collision {
                namespace: ns,
                key: key.to_string(),
                first: existing.clone(),
                second: topic.to_string(),
            }),
            None => {
                self.entries.insert((ns, key.to_string()), topic.to_string());
                Ok(())
            }
        }
    }

    /// Declared names of `topic` whose plain key belongs to another topic.
    pub fn shadowed(&self, topic: &Topic) -> Vec<String> {
        topic
            .declarations
            .iter()
            .filter_map(|d| d.declaration.name.clone())
            .filter(|name| self.get(Namespace::Plain, name) != Some(topic.id.as_str()))
            .collect()
    }

    pub fn get(&self, ns: Namespace, key: &str) -> Option<&str> {
        self.entries.get(&(ns, key.to_string())).map(String::as_str)
    }

    /// All combination entries for one generic: (type list, topic).
    pub fn combinations<'a>(&'a self, generic: &'a str) -> impl Iterator<Item = (Vec<String>, &'a str)> + 'a {
        self.entries
            .iter()
            .filter(|((ns, _), _)| *ns == Namespace::Combination)
            .filter_map(move |((_, key), topic)| {
                let (g, types) = parse_combination(key)?;
                (g == generic).then_some((types, topic.as_str()))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Namespace, &str, &str)> {
        self.entries
            .iter()
            .map(|((ns, key), topic)| (*ns, key.as_str(), topic.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `namespace<TAB>key<TAB>topic` rows, sorted.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for (ns, key, topic) in self.iter() {
            out.push_str(&format!("{ns}\t{key}\t{topic}\n"));
        }
        out
    }

    /// Reload a table written by [`AliasIndex::to_tsv`].
    pub fn from_tsv(text: &str) -> Result<Self> {
        let mut index = AliasIndex::default();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || Error::AliasTable {
                line: i + 1,
                text: line.to_string(),
            };
            let mut parts = line.splitn(3, '\t');
            let (Some(ns), Some(key), Some(topic)) = (parts.next(), parts.next(), parts.next()) else {
                return Err(malformed());
            };
            let ns: Namespace = ns.parse().map_err(|_| malformed())?;
            index.insert(ns, key, topic)?;
        }
        Ok(index)
    }
}
