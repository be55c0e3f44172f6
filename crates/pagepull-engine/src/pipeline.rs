//! Pipeline orchestration and the document map handoff.
//!
//! Segmentation runs Sampling then Stitching, then parks in
//! AwaitingSelection; assembly is a separate step driven by the user's
//! selection and always ends in Done, even when individual outputs
//! fail. Failed is reserved for the two fatal cases: an unreadable
//! source and an empty stitched list.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use pagepull_classify::BoundaryClassifier;
use pagepull_core::{Document, Page};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assembler::{AssemblyReport, DocumentAssembler, OutputFile};
use crate::error::SegmentError;
use crate::ocr::OcrHandle;
use crate::sampler::{PageSampler, PageTextSource, PdfTextSource};
use crate::stitcher::BoundaryStitcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Sampling,
    Stitching,
    AwaitingSelection,
    Assembling,
    Done,
    Failed,
}

/// Cooperative cancellation flag, checked between pages and between
/// batches. Cancellation keeps whatever partial results exist.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Serialized result of a segmentation run, consumed later by the
/// split and merge commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMap {
    pub source: PathBuf,
    pub total_pages: u32,
    pub documents: Vec<Document>,
}

impl DocumentMap {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("cannot serialize document map")?;
        std::fs::write(path, json)
            .with_context(|| format!("cannot write document map {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read document map {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("malformed document map {}", path.display()))
    }
}

/// Everything segmentation produces before a selection is made.
#[derive(Debug)]
pub struct SegmentOutcome {
    pub pages: Vec<Page>,
    pub documents: Vec<Document>,
    pub total_pages: u32,
}

pub struct SegmentPipeline {
    sampler: Arc<PageSampler>,
    stitcher: BoundaryStitcher,
    state: PipelineState,
}

impl SegmentPipeline {
    #[must_use]
    pub fn new(sampler: PageSampler, stitcher: BoundaryStitcher) -> Self {
        Self {
            sampler: Arc::new(sampler),
            stitcher,
            state: PipelineState::Sampling,
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Sample and stitch `path`, ending in AwaitingSelection.
    pub async fn run(
        &mut self,
        path: &Path,
        primary: &dyn BoundaryClassifier,
        fallback: Option<&dyn BoundaryClassifier>,
        ocr: Option<OcrHandle>,
        stop: &StopFlag,
    ) -> Result<SegmentOutcome, SegmentError> {
        self.state = PipelineState::Sampling;
        let source = match PdfTextSource::load(path) {
            Ok(s) => s,
            Err(e) => {
                self.state = PipelineState::Failed;
                return Err(e);
            }
        };
        let total_pages = source.page_count();

        let sampler = Arc::clone(&self.sampler);
        let stop_sample = stop.clone();
        let sample_task = tokio::task::spawn_blocking(move || {
            sampler.sample(&source, ocr.as_ref(), &stop_sample)
        });
        let pages = match sample_task.await {
            Ok(pages) => pages,
            Err(e) => {
                self.state = PipelineState::Failed;
                return Err(SegmentError::SourceUnreadable {
                    path: path.to_path_buf(),
                    reason: format!("sampling task failed: {e}"),
                });
            }
        };

        self.state = PipelineState::Stitching;
        let documents = match self.stitcher.stitch(&pages, primary, fallback, stop).await {
            Ok(docs) => docs,
            Err(e) => {
                self.state = PipelineState::Failed;
                return Err(e);
            }
        };

        self.state = PipelineState::AwaitingSelection;
        info!(documents = documents.len(), total_pages, "awaiting selection");
        Ok(SegmentOutcome {
            pages,
            documents,
            total_pages,
        })
    }

    /// Split the selected documents. Per-item failures land in the
    /// report; the pipeline still ends Done.
    pub fn assemble_split(
        &mut self,
        assembler: &DocumentAssembler,
        docs: &[Document],
        out_dir: &Path,
    ) -> Result<AssemblyReport> {
        self.state = PipelineState::Assembling;
        let report = assembler.split(docs, out_dir);
        self.state = PipelineState::Done;
        report
    }

    /// Merge the selected documents into one output.
    pub fn assemble_merge(
        &mut self,
        assembler: &DocumentAssembler,
        docs: &[Document],
        title: &str,
        out_dir: &Path,
    ) -> Result<OutputFile> {
        self.state = PipelineState::Assembling;
        let result = assembler.merge(docs, title, out_dir);
        self.state = PipelineState::Done;
        result
    }
}
