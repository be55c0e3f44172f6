//! Sequential batch classification and cross-batch stitching.
//!
//! Batches must run in order: each call carries the id and title of the
//! document still open at the end of the previous batch, and the merge
//! step below relies on that ordering to extend documents across batch
//! boundaries instead of duplicating them.

use pagepull_core::{next_id, ContinuationHint, Document, DocumentCandidate, Page, DEFAULT_BATCH_SIZE};
use pagepull_classify::BoundaryClassifier;
use tracing::{debug, info, warn};

use crate::error::SegmentError;
use crate::pipeline::StopFlag;

pub struct BoundaryStitcher {
    batch_size: usize,
}

impl Default for BoundaryStitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryStitcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Classify `pages` batch by batch and stitch the results into one
    /// ordered document list.
    ///
    /// A batch whose primary call fails is retried once against
    /// `fallback`; if that also fails the batch becomes a logged
    /// coverage gap and stitching continues. An empty final list is
    /// fatal.
    pub async fn stitch(
        &self,
        pages: &[Page],
        primary: &dyn BoundaryClassifier,
        fallback: Option<&dyn BoundaryClassifier>,
        stop: &StopFlag,
    ) -> Result<Vec<Document>, SegmentError> {
        let total_pages = pages.last().map_or(0, |p| p.index);
        let mut docs: Vec<Document> = Vec::new();
        let mut batches = 0usize;

        for chunk in pages.chunks(self.batch_size) {
            if stop.is_set() {
                info!(batches, "stitching cancelled");
                break;
            }
            batches += 1;

            let start_page = chunk[0].index;
            let end_page = chunk[chunk.len() - 1].index;
            let snippets: Vec<String> = chunk.iter().map(|p| p.snippet.clone()).collect();
            let hint = ContinuationHint::from_last(&docs);
            let fresh_id = next_id(&docs);

            debug!(batch = batches, start_page, end_page, "classifying batch");

            let candidates = match primary
                .classify(&snippets, start_page, fresh_id, hint.as_ref())
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(batch = batches, error = %e, "primary classifier failed, retrying");
                    let retried = match fallback {
                        Some(f) => f.classify(&snippets, start_page, fresh_id, hint.as_ref()).await,
                        None => Err(e),
                    };
                    match retried {
                        Ok(c) => c,
                        Err(e) => {
                            warn!(
                                batch = batches,
                                start_page,
                                end_page,
                                error = %e,
                                "batch classification failed, pages left uncovered"
                            );
                            continue;
                        }
                    }
                }
            };

            if candidates.is_empty() {
                warn!(
                    batch = batches,
                    start_page, end_page, "batch yielded no candidates, pages left uncovered"
                );
                continue;
            }

            merge_batch(&mut docs, candidates, total_pages);
        }

        if docs.is_empty() {
            return Err(SegmentError::NoDocumentsIdentified { batches });
        }
        info!(documents = docs.len(), batches, "stitching complete");
        Ok(docs)
    }
}

/// Fold one batch's candidates into the stitched list.
///
/// The first candidate extends the list's last document when their ids
/// match (the continuation the hint asked about). Everything else is
/// appended; a candidate that starts inside the previous document wins
/// the contested pages and the previous document is trimmed back.
fn merge_batch(docs: &mut Vec<Document>, candidates: Vec<DocumentCandidate>, total_pages: u32) {
    for (i, candidate) in candidates.into_iter().enumerate() {
        let mut doc: Document = candidate.into();
        doc.clamp_to(total_pages);

        if i == 0 {
            if let Some(last) = docs.last_mut() {
                if last.id == doc.id {
                    if doc.end > last.end {
                        debug!(id = %last.id, end = doc.end, "extending continued document");
                        last.end = doc.end;
                    }
                    continue;
                }
            }
        }

        if let Some(last) = docs.last_mut() {
            if doc.start <= last.end {
                if doc.start > last.start {
                    warn!(
                        prev = %last.id,
                        next = %doc.id,
                        page = doc.start,
                        "overlapping ranges, trimming previous document"
                    );
                    last.end = doc.start - 1;
                } else {
                    warn!(
                        prev = %last.id,
                        next = %doc.id,
                        "candidate starts at or before previous document, keeping both"
                    );
                }
            }
        }

        docs.push(doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, title: &str, start: u32, end: u32) -> DocumentCandidate {
        DocumentCandidate {
            id: id.to_string(),
            title: title.to_string(),
            date: "2024-01-01".to_string(),
            start,
            end,
        }
    }

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
    fn first_candidate_with_matching_id_extends() {
        let mut docs = vec![doc("5", 90, 100)];
        merge_batch(
            &mut docs,
            vec![cand("5", "Exhibit E", 101, 120), cand("6", "Exhibit F", 121, 130)],
            250,
        );
        assert_eq!(docs.len(), 2);
        assert_eq!((docs[0].start, docs[0].end), (90, 120));
        assert_eq!(docs[1].id, "6");
    }

    #[test]
    fn matching_id_never_shrinks() {
        let mut docs = vec![doc("5", 90, 100)];
        merge_batch(&mut docs, vec![cand("5", "Exhibit E", 95, 98)], 250);
        assert_eq!((docs[0].start, docs[0].end), (90, 100));
    }

    #[test]
    fn non_first_candidates_never_extend() {
        let mut docs = vec![doc("5", 90, 100)];
        merge_batch(
            &mut docs,
            vec![cand("6", "Next", 101, 110), cand("5", "Echo", 111, 115)],
            250,
        );
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn overlap_trims_previous_document() {
        let mut docs = vec![doc("1", 1, 12)];
        merge_batch(&mut docs, vec![cand("2", "Answer", 10, 20)], 250);
        assert_eq!((docs[0].start, docs[0].end), (1, 9));
        assert_eq!((docs[1].start, docs[1].end), (10, 20));
    }

    #[test]
    fn candidate_ranges_are_clamped() {
        let mut docs = Vec::new();
        merge_batch(&mut docs, vec![cand("1", "Wild", 0, 900)], 250);
        assert_eq!((docs[0].start, docs[0].end), (1, 250));
    }
}
