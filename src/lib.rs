//! topicgen: documentation topics from annotated R sources.
//!
//! The pipeline runs in stages:
//!
//! - **parser**: marker-comment blocks bound to declarations, split into tags
//! - **topic**: one pre-merge topic per block
//! - **merge**: topics sharing a grouping identifier folded together
//! - **index**: every lookup key, collisions rejected
//! - **collate**: unit order from `@include` directives
//! - **render** / **artifacts**: Rd documents, `NAMESPACE`, `COLLATE`, alias table
//! - **lookup**: plain, qualified and combination queries over an index

pub mod artifacts;
pub mod collate;
pub mod config;
pub mod error;
pub mod exports;
pub mod index;
pub mod lookup;
pub mod merge;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod topic;

pub use error::{Diagnostic, Error, LookupError, Result};
pub use index::{AliasIndex, AliasPolicy, Namespace};
pub use lookup::{Query, RenderedTopic, Resolver, Scope, TopicStore};
pub use model::{SourceUnit, Topic};
pub use pipeline::{run, Generation, Options};
