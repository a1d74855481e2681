//! Generation pipeline: per-unit work in parallel, then the global barrier
//! stages (merge, index, collation, exports) on one thread.

use crate::collate::{collate, CollationEdge};
use crate::error::{Diagnostic, Result};
use crate::exports::{export_list, ExportEntry};
use crate::index::{AliasIndex, AliasPolicy};
use crate::merge;
use crate::model::{DocType, SourcePos, SourceUnit, Topic};
use crate::parser::extract::{declared_callables, DeclarationRecognizer, RDialect};
use crate::parser::{parse_unit, UnitBlocks};
use crate::topic::{self, BuildContext};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Default documentation comment marker.
pub const DEFAULT_MARKER: &str = "#'";

#[derive(Debug, Clone)]
pub struct Options {
    pub marker: String,
    /// Name for `"_PACKAGE"` blocks that carry no `@name`.
    pub package: Option<String>,
    pub alias_policy: AliasPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            package: None,
            alias_policy: AliasPolicy::default(),
        }
    }
}

/// Everything one run produces.
#[derive(Debug)]
pub struct Generation {
    /// Finalized topics, in order of first appearance.
    pub topics: Vec<Topic>,
    pub index: AliasIndex,
    /// Unit identifiers in collation order.
    pub collation: Vec<String>,
    pub exports: BTreeSet<ExportEntry>,
    /// Per-unit parse/validation errors and warnings, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Topics that get a rendered document.
    pub fn renderable(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter().filter(|t| is_renderable(t))
    }
}

/// `@noRd` topics and topics without a title are indexed but not rendered.
pub fn is_renderable(topic: &Topic) -> bool {
    !topic.no_rd && !topic.title_text().trim().is_empty()
}

/// Run the pipeline with the R recognizer.
pub fn run(units: &[SourceUnit], opts: &Options) -> Result<Generation> {
    run_with(units, opts, &RDialect)
}

/// Run the pipeline over `units`, given in source order.
///
/// Fatal errors (doc-type conflict, alias collision, collation cycle) abort
/// with `Err`; everything else is collected into `diagnostics`.
pub fn run_with(units: &[SourceUnit], opts: &Options, recognizer: &dyn DeclarationRecognizer) -> Result<Generation> {
    let per_unit: Vec<(UnitBlocks, Vec<String>)> = units
        .par_iter()
        .enumerate()
        .map(|(ordinal, unit)| {
            (
                parse_unit(unit, ordinal, &opts.marker, recognizer),
                declared_callables(unit, &opts.marker, recognizer),
            )
        })
        .collect();

    let ctx = BuildContext {
        package: opts.package.clone(),
        local_callables: per_unit.iter().flat_map(|(_, c)| c.iter().cloned()).collect(),
    };

    let built: Vec<Vec<(String, topic::BuiltBlock)>> = per_unit
        .par_iter()
        .map(|(blocks, _)| {
            blocks
                .blocks
                .iter()
                .map(|(raw, parsed)| (raw.unit.clone(), topic::build(raw, parsed, &ctx)))
                .collect()
        })
        .collect();

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut pre_merge: Vec<Topic> = Vec::new();
    let mut includes: Vec<(String, String, usize)> = Vec::new();
    for ((blocks, _), unit_built) in per_unit.into_iter().zip(built) {
        diagnostics.extend(blocks.diagnostics);
        for (unit, block) in unit_built {
            diagnostics.extend(block.diagnostics);
            includes.extend(block.includes.into_iter().map(|(dep, line)| (unit.clone(), dep, line)));
            pre_merge.extend(block.topic);
        }
    }
    tracing::debug!(units = units.len(), blocks = pre_merge.len(), "per-unit stage done");

    let mut topics = merge::merge(pre_merge)?;
    diagnostics.extend(merge::finalize(&mut topics));
    tracing::debug!(topics = topics.len(), "merged");

    let index = AliasIndex::build(&topics, opts.alias_policy)?;
    for topic in topics.iter_mut().filter(|t| t.doc_type == DocType::Package) {
        topic.shadowed_aliases = index.shadowed(topic);
    }
    tracing::debug!(keys = index.len(), "alias index built");

    let unit_ids: Vec<String> = units.iter().map(|u| u.id.clone()).collect();
    let mut edges = Vec::new();
    for (unit, dep, line) in includes {
        let pos = SourcePos::new(unit.clone(), line);
        match resolve_unit(&dep, &unit_ids) {
            Some(before) => edges.push(CollationEdge {
                before: before.to_string(),
                after: unit,
                pos,
            }),
            None => diagnostics.push(Diagnostic::warning(pos, format!("`@include {dep}`: no such unit"))),
        }
    }
    let collation = collate(&unit_ids, &edges)?;
    tracing::debug!(edges = edges.len(), "collation order computed");

    let exports = export_list(&topics);
    diagnostics.sort_by(|a, b| {
        let (pa, pb) = (a.pos(), b.pos());
        let ua = unit_ids.iter().position(|u| *u == pa.unit);
        let ub = unit_ids.iter().position(|u| *u == pb.unit);
        (ua, pa.line).cmp(&(ub, pb.line))
    });

    Ok(Generation {
        topics,
        index,
        collation,
        exports,
        diagnostics,
    })
}

/// Match an `@include` name against unit identifiers: exact, or by file name.
fn resolve_unit<'a>(name: &str, units: &'a [String]) -> Option<&'a str> {
    if let Some(exact) = units.iter().find(|u| *u == name) {
        return Some(exact);
    }
    let mut by_file = units
        .iter()
        .filter(|u| u.rsplit(|c| c == '/' || c == '\\').next() == Some(name));
    match (by_file.next(), by_file.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}
