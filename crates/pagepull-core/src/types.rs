//! Core data model for segmentation.
//!
//! Pages are ephemeral: produced once by the sampler, consumed by the
//! stitcher, then discardable. `DocumentCandidate` is the per-batch
//! classifier output; `Document` is the same shape but finalized (it may
//! have been extended in place across several batches). The stitched
//! document list is the artifact that survives until assembly.

use serde::{Deserialize, Serialize};

/// Snippets are truncated to this many characters before being handed
/// to the classifier.
pub const SNIPPET_MAX_CHARS: usize = 500;

/// Pages whose direct text extraction yields fewer non-whitespace
/// characters than this are considered scanned and eligible for OCR.
pub const MIN_DIRECT_TEXT_CHARS: usize = 50;

/// Number of pages classified per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Upper bound on concurrent page-sampling workers.
pub const MAX_SAMPLER_WORKERS: usize = 16;

/// How the text for a page snippet was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Embedded text extracted directly from the PDF content stream.
    Direct,
    /// Optical recognition of the rendered header region.
    Optical,
    /// Extraction failed; the snippet is an explicit error marker.
    Error,
}

/// A sampled page: a bounded snippet of representative text plus the
/// method that produced it. Indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page index within the source PDF.
    pub index: u32,
    /// Normalized snippet, prefixed `"Page <index>: "`.
    pub snippet: String,
    /// How the snippet text was obtained.
    pub method: ExtractionMethod,
}

/// One sub-document claim returned by a single classifier call.
///
/// Ids are strings because the classifier is free to return non-numeric
/// ids; only numeric ids participate in `next_id` computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCandidate {
    pub id: String,
    pub title: String,
    pub date: String,
    /// 1-based first page, inclusive.
    pub start: u32,
    /// 1-based last page, inclusive.
    pub end: u32,
}

/// A finalized entry in the stitched document list.
///
/// Same shape as [`DocumentCandidate`], but its `end` may have been
/// extended across one or more batch boundaries. Once merged into the
/// list a document is never split back into two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub date: String,
    pub start: u32,
    pub end: u32,
}

impl From<DocumentCandidate> for Document {
    fn from(c: DocumentCandidate) -> Self {
        Self {
            id: c.id,
            title: c.title,
            date: c.date,
            start: c.start,
            end: c.end,
        }
    }
}

impl Document {
    /// Clamp the page range into `[1, total_pages]`.
    ///
    /// Classifier output is untrusted; every candidate is clamped before
    /// it becomes (or extends) a finalized document.
    pub fn clamp_to(&mut self, total_pages: u32) {
        self.start = self.start.clamp(1, total_pages.max(1));
        self.end = self.end.clamp(1, total_pages.max(1));
        if self.end < self.start {
            self.end = self.start;
        }
    }

    /// Render the page range for the index table: `"3 - 7"`, or just
    /// `"3"` for a single-page document.
    #[must_use]
    pub fn page_range_label(&self) -> String {
        if self.start == self.end {
            self.start.to_string()
        } else {
            format!("{} - {}", self.start, self.end)
        }
    }

    /// Number of pages covered, inclusive.
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// The `{id, title}` of the last finalized document, handed to the next
/// batch's classifier call so it can confirm (or deny) a continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationHint {
    pub id: String,
    pub title: String,
}

impl ContinuationHint {
    /// Hint derived from the last entry of a stitched list, if any.
    #[must_use]
    pub fn from_last(docs: &[Document]) -> Option<Self> {
        docs.last().map(|d| Self {
            id: d.id.clone(),
            title: d.title.clone(),
        })
    }
}

/// Next fresh id for the classifier: `max(numeric ids seen) + 1`.
///
/// Non-numeric ids are ignored; with no numeric ids seen the sequence
/// starts at 1.
#[must_use]
pub fn next_id(docs: &[Document]) -> u32 {
    docs.iter()
        .filter_map(|d| d.id.trim().parse::<u32>().ok())
        .max()
        .map_or(1, |m| m + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, start: u32, end: u32) -> Document {
        Document {
            id: id.to_string(),
            title: format!("Doc {id}"),
            date: String::new(),
            start,
            end,
        }
    }

    #[test]
    fn next_id_starts_at_one() {
        assert_eq!(next_id(&[]), 1);
    }

    #[test]
    fn next_id_ignores_non_numeric() {
        let docs = vec![doc("2", 1, 3), doc("A", 4, 5), doc("7", 6, 9)];
        assert_eq!(next_id(&docs), 8);
    }

    #[test]
    fn next_id_all_non_numeric() {
        let docs = vec![doc("A", 1, 3), doc("B", 4, 5)];
        assert_eq!(next_id(&docs), 1);
    }

    #[test]
    fn clamp_bounds_range() {
        let mut d = doc("1", 0, 400);
        d.clamp_to(250);
        assert_eq!((d.start, d.end), (1, 250));
    }

    #[test]
    fn clamp_inverted_range_collapses_to_start() {
        let mut d = doc("1", 9, 3);
        d.clamp_to(10);
        assert_eq!((d.start, d.end), (9, 9));
    }

    #[test]
    fn page_range_label_formats() {
        assert_eq!(doc("1", 3, 7).page_range_label(), "3 - 7");
        assert_eq!(doc("1", 4, 4).page_range_label(), "4");
    }

    #[test]
    fn page_count_is_inclusive() {
        assert_eq!(doc("1", 1, 5).page_count(), 5);
        assert_eq!(doc("1", 6, 6).page_count(), 1);
    }

    #[test]
    fn continuation_hint_from_last() {
        assert_eq!(ContinuationHint::from_last(&[]), None);
        let docs = vec![doc("1", 1, 3), doc("2", 4, 9)];
        let hint = ContinuationHint::from_last(&docs).unwrap();
        assert_eq!(hint.id, "2");
        assert_eq!(hint.title, "Doc 2");
    }
}
