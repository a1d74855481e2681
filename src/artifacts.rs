//! Writing a generation to disk.
//!
//! Layout of an output directory:
//!
//! - `man/<id>.<ext>`: one rendered document per renderable topic
//! - `NAMESPACE`: export directives
//! - `COLLATE`: unit identifiers in collation order
//! - `aliases.tsv`: the alias index, reloadable for compiled lookups

use crate::error::{Error, Result};
use crate::exports::namespace_file;
use crate::lookup::{ALIAS_TABLE, MAN_DIR};
use crate::pipeline::Generation;
use crate::render::Renderer;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const NAMESPACE_FILE: &str = "NAMESPACE";
pub const COLLATE_FILE: &str = "COLLATE";

/// First line of every generated document; files carrying it are ours to
/// replace or remove.
const GENERATED_HEADER: &str = "Generated by topicgen: do not edit by hand";

#[derive(Debug, Default)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write(path: PathBuf, text: &str, summary: &mut WriteSummary) -> Result<()> {
    fs::write(&path, text).map_err(io_error(&path))?;
    summary.written.push(path);
    Ok(())
}

/// Write every artifact of `gen` under `dir`. Generated documents left over
/// from an earlier run are removed; hand-written ones are left alone.
pub fn write_all(gen: &Generation, dir: &Path, renderer: &dyn Renderer) -> Result<WriteSummary> {
    let man = dir.join(MAN_DIR);
    fs::create_dir_all(&man).map_err(io_error(&man))?;

    let mut summary = WriteSummary::default();
    let ext = renderer.file_extension();
    let mut current: HashSet<PathBuf> = HashSet::new();

    for topic in gen.renderable() {
        let path = man.join(format!("{}.{}", file_name(&topic.id), ext));
        current.insert(path.clone());
        write(path, &renderer.render(topic), &mut summary)?;
    }

    for entry in fs::read_dir(&man).map_err(io_error(&man))?.flatten() {
        let path = entry.path();
        if current.contains(&path) || path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let generated = fs::read_to_string(&path)
            .map(|text| text.lines().next().is_some_and(|l| l.contains(GENERATED_HEADER)))
            .unwrap_or(false);
        if generated {
            fs::remove_file(&path).map_err(io_error(&path))?;
            tracing::debug!(path = %path.display(), "removed stale document");
            summary.removed.push(path);
        }
    }

    write(dir.join(NAMESPACE_FILE), &namespace_file(&gen.exports), &mut summary)?;

    let mut collate = gen.collation.join("\n");
    collate.push('\n');
    write(dir.join(COLLATE_FILE), &collate, &mut summary)?;

    write(dir.join(ALIAS_TABLE), &gen.index.to_tsv(), &mut summary)?;

    Ok(summary)
}

/// Topic identifiers may contain characters file systems reject.
fn file_name(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::TopicStore;
    use crate::model::SourceUnit;
    use crate::pipeline::{run, Options};
    use crate::render::rd::RdRenderer;
    use tempfile::TempDir;

    fn generation() -> Generation {
        let units = [SourceUnit::new(
            "R/a.R",
            "#' Area of a shape\n#' @export\narea <- function(shape) 0\n\n#' Internal\n#' @noRd\nhelper <- function() 1\n",
        )];
        run(&units, &Options::default()).unwrap()
    }

    #[test]
    fn writes_every_artifact() {
        let dir = TempDir::new().unwrap();
        let summary = write_all(&generation(), dir.path(), &RdRenderer).unwrap();
        assert_eq!(summary.written.len(), 4);
        assert!(dir.path().join("man/area.Rd").is_file());
        assert!(!dir.path().join("man/helper.Rd").exists());
        let ns = fs::read_to_string(dir.path().join(NAMESPACE_FILE)).unwrap();
        assert!(ns.contains("export(area)\n"));
        assert_eq!(fs::read_to_string(dir.path().join(COLLATE_FILE)).unwrap(), "R/a.R\n");
    }

    #[test]
    fn stale_generated_documents_are_removed() {
        let dir = TempDir::new().unwrap();
        let man = dir.path().join(MAN_DIR);
        fs::create_dir_all(&man).unwrap();
        fs::write(man.join("old.Rd"), "% Generated by topicgen: do not edit by hand\n").unwrap();
        fs::write(man.join("manual.Rd"), "\\name{manual}\n").unwrap();

        let summary = write_all(&generation(), dir.path(), &RdRenderer).unwrap();
        assert_eq!(summary.removed, vec![man.join("old.Rd")]);
        assert!(man.join("manual.Rd").is_file());
    }

    #[test]
    fn output_reloads_as_compiled_scope() {
        let dir = TempDir::new().unwrap();
        write_all(&generation(), dir.path(), &RdRenderer).unwrap();
        let store = TopicStore::load(dir.path()).unwrap();
        assert!(store.lookup("area").unwrap().text.contains("\\title{Area of a shape}"));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_name("a/b:c"), "a_b_c");
        assert_eq!(file_name("area,numeric-method"), "area,numeric-method");
    }
}
