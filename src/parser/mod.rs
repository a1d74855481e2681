//! Parser module: block extraction and tag parsing per source unit.

pub mod extract;
pub mod tags;

use crate::error::Diagnostic;
use crate::model::{ParsedBlock, RawBlock, SourceUnit};
use extract::DeclarationRecognizer;

/// File extensions recognized as source units.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["R", "r"];

/// Every block of one unit with its parsed tags.
#[derive(Debug, Default)]
pub struct UnitBlocks {
    pub blocks: Vec<(RawBlock, ParsedBlock)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract and tag-parse one unit. Pure function of the unit's text.
pub fn parse_unit(
    unit: &SourceUnit,
    ordinal: usize,
    marker: &str,
    recognizer: &dyn DeclarationRecognizer,
) -> UnitBlocks {
    let extraction = extract::extract(unit, ordinal, marker, recognizer);
    let mut out = UnitBlocks {
        blocks: Vec::with_capacity(extraction.blocks.len()),
        diagnostics: extraction.diagnostics,
    };
    for raw in extraction.blocks {
        let parsed = tags::parse_block(&raw);
        out.diagnostics.extend(parsed.diagnostics);
        out.blocks.push((raw, parsed.block));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::RDialect;

    #[test]
    fn parse_unit_collects_blocks_and_diagnostics() {
        let unit = SourceUnit::new(
            "R/a.R",
            "#' Orphan\nx()\n#' Title\n#' @ bad\n#' @export\nf <- function() 1\n",
        );
        let parsed = parse_unit(&unit, 0, "#'", &RDialect);
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].1.tags[0].name, "export");
        // one unbound warning, one parse error
        assert_eq!(parsed.diagnostics.len(), 2);
        assert_eq!(parsed.diagnostics.iter().filter(|d| d.is_error()).count(), 1);
    }
}
