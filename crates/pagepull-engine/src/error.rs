use std::path::PathBuf;

use thiserror::Error;

/// Fatal segmentation failures.
///
/// Everything else the engine hits is recoverable and handled in place:
/// a bad page becomes an error-marker snippet, a failed batch becomes a
/// logged coverage gap, a failed output file becomes a report entry.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// The source PDF could not be opened or parsed at all.
    #[error("cannot read source PDF {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Every batch was classified (or gapped) and the stitched list is
    /// still empty, so there is nothing to present or assemble.
    #[error("no documents identified across {batches} batch(es)")]
    NoDocumentsIdentified { batches: usize },
}
