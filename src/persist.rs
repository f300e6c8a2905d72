// 💾 Whole-document load and save
//
// A load is:
//   1. structural pass (DocumentReader)
//   2. registry collection over every Linkable in the tree
//   3. resolution pass (finalize_pointers on every pending owner)
//   4. optional link repair
//
// Only step 1 can fail. Everything else lands in the LoadReport.

use crate::config::WriterConfig;
use crate::error::{LoadReport, ReadError, WriteError};
use crate::linkable::ensure_bidirectional_links;
use crate::reader::DocumentReader;
use crate::resolve::{resolve_references, IdRegistry, ResolutionSummary};
use crate::serializable::Serializable;
use crate::writer::DocumentWriter;
use std::path::Path;
use tracing::info;

/// A fully resolved object and what went wrong along the way.
#[derive(Debug)]
pub struct Loaded<T> {
    pub object: T,
    pub report: LoadReport,
    pub resolution: ResolutionSummary,
    /// Reverse link edges added by the repair step
    pub repaired_links: usize,
}

pub fn load_str<T: Serializable + Default>(
    input: &str,
    root_tag: &str,
    reader: &mut DocumentReader<'_>,
) -> Result<Loaded<T>, ReadError> {
    let parsed = reader.read::<T>(input, root_tag)?;
    let mut object = parsed.object;
    let mut report = parsed.report;

    let registry = IdRegistry::collect(&mut object, &mut report);
    let resolution = resolve_references(&mut object, &parsed.pending, &registry, &mut report);
    let repaired_links = if reader.config().repair_links {
        ensure_bidirectional_links(&mut object)
    } else {
        0
    };

    info!(
        root = root_tag,
        bytes = input.len(),
        entities = registry.len(),
        finalized = resolution.finalized,
        issues = report.len(),
        "document loaded"
    );
    Ok(Loaded {
        object,
        report,
        resolution,
        repaired_links,
    })
}

pub fn load_file<T: Serializable + Default>(
    path: impl AsRef<Path>,
    root_tag: &str,
    reader: &mut DocumentReader<'_>,
) -> Result<Loaded<T>, ReadError> {
    let input = std::fs::read_to_string(path)?;
    load_str(&input, root_tag, reader)
}

pub fn save_string(
    object: &mut dyn Serializable,
    root_tag: &str,
    config: &WriterConfig,
) -> Result<String, WriteError> {
    let text = DocumentWriter::new(config.clone()).write_to_string(object, root_tag)?;
    info!(root = root_tag, bytes = text.len(), "document written");
    Ok(text)
}

pub fn save_file(
    path: impl AsRef<Path>,
    object: &mut dyn Serializable,
    root_tag: &str,
    config: &WriterConfig,
) -> Result<(), WriteError> {
    let path = path.as_ref();
    DocumentWriter::new(config.clone()).write_file(path, object, root_tag)?;
    info!(root = root_tag, path = %path.display(), "document saved");
    Ok(())
}
