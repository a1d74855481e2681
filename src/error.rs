//! Error taxonomy.
//!
//! [`Diagnostic`] covers problems attributable to one place in one unit; they
//! are collected and the run keeps going. [`Error`] covers global failures
//! that abort the run. [`LookupError`] is returned to query callers.

use crate::index::Namespace;
use crate::model::{DocType, SourcePos};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("{pos}: parse error: {message}")]
    Parse { pos: SourcePos, message: String },

    #[error("{pos}: {message}")]
    Validation { pos: SourcePos, message: String },

    #[error("{pos}: warning: {message}")]
    Warning { pos: SourcePos, message: String },
}

impl Diagnostic {
    pub fn parse(pos: SourcePos, message: impl Into<String>) -> Self {
        Diagnostic::Parse {
            pos,
            message: message.into(),
        }
    }

    pub fn validation(pos: SourcePos, message: impl Into<String>) -> Self {
        Diagnostic::Validation {
            pos,
            message: message.into(),
        }
    }

    pub fn warning(pos: SourcePos, message: impl Into<String>) -> Self {
        Diagnostic::Warning {
            pos,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Diagnostic::Warning { .. })
    }

    pub fn pos(&self) -> &SourcePos {
        match self {
            Diagnostic::Parse { pos, .. }
            | Diagnostic::Validation { pos, .. }
            | Diagnostic::Warning { pos, .. } => pos,
        }
    }
}

/// Failures that leave no meaningful partial output.
#[derive(Debug, Error)]
pub enum Error {
    #[error("topic `{id}` mixes doc types: `{first}` at {first_pos} and `{second}` at {second_pos}")]
    DocTypeConflict {
        id: String,
        first: DocType,
        first_pos: SourcePos,
        second: DocType,
        second_pos: SourcePos,
    },

    #[error("alias `{key}` in the {namespace} namespace is claimed by both `{first}` and `{second}`")]
    Collision {
        namespace: Namespace,
        key: String,
        first: String,
        second: String,
    },

    #[error("collation cycle: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("malformed alias table line {line}: {text}")]
    AliasTable { line: usize, text: String },

    #[error("unknown format: {0}. Use rd or json")]
    UnknownFormat(String),

    #[error("invalid config {path}")]
    Config {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no topic matches `{query}`")]
    NotFound { query: String },

    #[error("`{query}` is ambiguous: {}", candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("topic `{topic}` matched `{query}` but has no rendered document")]
    NotRendered { query: String, topic: String },

    #[error("the {scope} scope is not loaded")]
    ScopeUnavailable { scope: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_carries_position() {
        let d = Diagnostic::validation(SourcePos::new("R/a.R", 4), "unknown tag `@foo`");
        assert_eq!(d.to_string(), "R/a.R:4: unknown tag `@foo`");
        assert!(d.is_error());
    }

    #[test]
    fn warnings_are_not_errors() {
        let d = Diagnostic::warning(SourcePos::new("R/a.R", 1), "unbound block");
        assert!(!d.is_error());
        assert_eq!(d.to_string(), "R/a.R:1: warning: unbound block");
    }

    #[test]
    fn cycle_lists_chain() {
        let e = Error::Cycle {
            chain: vec!["a.R".into(), "b.R".into(), "a.R".into()],
        };
        assert_eq!(e.to_string(), "collation cycle: a.R -> b.R -> a.R");
    }
}
