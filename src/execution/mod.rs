//! Execution-version builder: splices the counter-signed signature pages
//! back into the clean original and removes permission restrictions the
//! signing service left on the returned file.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::formats::{pdf, write_atomic};

/// The fixed stage sequence of one execution-version build. Every stage
/// may fail; a failure ends the run with a single error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    LoadOriginal,
    LoadSigned,
    UnlockRestrictions,
    DetermineInsertionPoint,
    Splice,
    Save,
    Done,
}

impl ExecutionStage {
    /// Progress percentage reported when the stage begins.
    pub fn percent(self) -> u8 {
        match self {
            ExecutionStage::LoadOriginal => 10,
            ExecutionStage::LoadSigned => 20,
            ExecutionStage::UnlockRestrictions => 40,
            ExecutionStage::DetermineInsertionPoint => 50,
            ExecutionStage::Splice => 70,
            ExecutionStage::Save => 95,
            ExecutionStage::Done => 100,
        }
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStage::LoadOriginal => write!(f, "Loading original document..."),
            ExecutionStage::LoadSigned => write!(f, "Loading signed document..."),
            ExecutionStage::UnlockRestrictions => write!(f, "Unlocking signed document..."),
            ExecutionStage::DetermineInsertionPoint => {
                write!(f, "Determining insertion point...")
            }
            ExecutionStage::Splice => write!(f, "Inserting signed pages..."),
            ExecutionStage::Save => write!(f, "Saving execution version..."),
            ExecutionStage::Done => write!(f, "Execution version created successfully!"),
        }
    }
}

/// Where the signed block lands in the original's page sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    /// The signed pages follow this many leading original pages.
    AfterPage(u32),
    Append,
}

impl InsertionPoint {
    /// Clamps a requested 0-based "after page N" value against the
    /// original's page count. Out-of-range requests append rather
    /// than fail.
    pub fn resolve(insert_after: i64, original_pages: usize) -> Self {
        if insert_after < 0 || insert_after >= original_pages as i64 {
            InsertionPoint::Append
        } else {
            InsertionPoint::AfterPage(insert_after as u32)
        }
    }

    fn leading_pages(self, original_pages: usize) -> u32 {
        match self {
            InsertionPoint::AfterPage(n) => n,
            InsertionPoint::Append => original_pages as u32,
        }
    }
}

/// Inputs for one execution-version build.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub original: PathBuf,
    pub signed: PathBuf,
    /// 0-based "insert after page N"; negative means append.
    pub insert_after: i64,
    /// Destination directory. Defaults to the original's directory.
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub output_path: PathBuf,
    pub output_filename: String,
    pub original_pages: usize,
    pub signed_pages: usize,
    pub total_pages: usize,
}

/// Runs the full stage sequence and writes the spliced document. Page
/// content is copied, never re-rendered, so the output page count is
/// always the sum of both inputs.
#[instrument(skip_all, fields(original = %request.original.display()))]
pub fn build_execution_version(
    request: &ExecutionRequest,
    sink: &dyn EventSink,
) -> Result<ExecutionOutcome> {
    let stage =
        |s: ExecutionStage| sink.emit(crate::events::Event::progress(s.percent(), s.to_string()));

    stage(ExecutionStage::LoadOriginal);
    let original = pdf::load(&request.original)?;
    let original_pages = pdf::page_count(&original);

    stage(ExecutionStage::LoadSigned);
    let mut signed = pdf::load(&request.signed)?;

    stage(ExecutionStage::UnlockRestrictions);
    if pdf::unlock_restrictions(&mut signed)? {
        debug!("removed permission restrictions from signed document");
    }
    let signed_pages = pdf::page_count(&signed);

    stage(ExecutionStage::DetermineInsertionPoint);
    let point = InsertionPoint::resolve(request.insert_after, original_pages);
    let leading = point.leading_pages(original_pages);
    info!(?point, original_pages, signed_pages, "splicing");

    stage(ExecutionStage::Splice);
    let mut pulls = Vec::new();
    if leading > 0 {
        pulls.push(pdf::PagePull {
            document: &original,
            pages: (1..=leading).collect(),
        });
    }
    pulls.push(pdf::PagePull {
        document: &signed,
        pages: (1..=signed_pages as u32).collect(),
    });
    if (leading as usize) < original_pages {
        pulls.push(pdf::PagePull {
            document: &original,
            pages: (leading + 1..=original_pages as u32).collect(),
        });
    }
    let mut result = pdf::assemble_pages(&pulls)?;

    let total_pages = pdf::page_count(&result);
    if total_pages != original_pages + signed_pages {
        return Err(Error::Internal(format!(
            "spliced page count {total_pages} != {original_pages} + {signed_pages}"
        )));
    }

    stage(ExecutionStage::Save);
    let output_filename = derive_output_filename(&request.original);
    let output_dir = match &request.output_dir {
        Some(dir) => dir.clone(),
        None => request
            .original
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let output_path = output_dir.join(&output_filename);
    let mut bytes = Vec::new();
    result.save_to(&mut bytes)?;
    write_atomic(&output_path, &bytes)?;

    stage(ExecutionStage::Done);
    Ok(ExecutionOutcome {
        output_path,
        output_filename,
        original_pages,
        signed_pages,
        total_pages,
    })
}

const DRAFT_SUFFIXES: [&str; 4] = ["_Clean", "_Without_Sigs", "_Unsigned", "_Draft"];

/// Output name: the original's basename with trailing working-draft
/// suffixes removed and `" (Execution Version)"` appended.
pub fn derive_output_filename(original: &Path) -> String {
    let mut stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    for suffix in DRAFT_SUFFIXES {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            stem = stripped.to_string();
        }
    }
    format!("{stem} (Execution Version).pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_point_clamps_out_of_range_to_append() {
        assert_eq!(InsertionPoint::resolve(-1, 10), InsertionPoint::Append);
        assert_eq!(InsertionPoint::resolve(10, 10), InsertionPoint::Append);
        assert_eq!(InsertionPoint::resolve(250, 10), InsertionPoint::Append);
        assert_eq!(InsertionPoint::resolve(0, 10), InsertionPoint::AfterPage(0));
        assert_eq!(InsertionPoint::resolve(9, 10), InsertionPoint::AfterPage(9));
    }

    #[test]
    fn filename_strips_draft_suffixes() {
        let name = |s: &str| derive_output_filename(Path::new(s));
        assert_eq!(
            name("Credit_Agreement_Clean.pdf"),
            "Credit_Agreement (Execution Version).pdf"
        );
        assert_eq!(
            name("Guaranty_Without_Sigs.pdf"),
            "Guaranty (Execution Version).pdf"
        );
        assert_eq!(name("Plain.pdf"), "Plain (Execution Version).pdf");
    }

    #[test]
    fn stage_percentages_are_monotonic() {
        let stages = [
            ExecutionStage::LoadOriginal,
            ExecutionStage::LoadSigned,
            ExecutionStage::UnlockRestrictions,
            ExecutionStage::DetermineInsertionPoint,
            ExecutionStage::Splice,
            ExecutionStage::Save,
            ExecutionStage::Done,
        ];
        assert!(stages.windows(2).all(|w| w[0].percent() < w[1].percent()));
    }
}
