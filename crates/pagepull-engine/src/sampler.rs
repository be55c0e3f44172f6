//! Bounded-parallel page sampling.
//!
//! Every page of the source PDF is reduced to one short snippet of
//! header-ish text. Direct extraction from the content stream is the
//! normal path; pages that come back nearly empty are assumed scanned
//! and retried through the optical worker. A page that fails both ways
//! still produces a snippet, an explicit error marker, so page indices
//! stay dense for the classifier.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use lopdf::Document as PdfDocument;
use pagepull_core::{ExtractionMethod, Page, MAX_SAMPLER_WORKERS, MIN_DIRECT_TEXT_CHARS, SNIPPET_MAX_CHARS};
use tracing::{debug, info, warn};

use crate::error::SegmentError;
use crate::ocr::OcrHandle;
use crate::pipeline::StopFlag;

/// Snippet placed on pages whose extraction failed outright.
pub const ERROR_MARKER: &str = "[Error processing page]";

/// Raw characters taken from the top of a page before normalization.
const RAW_HEAD_CHARS: usize = 1000;

/// Pages between progress log lines.
const PROGRESS_EVERY: usize = 50;

/// Per-page text supplier. Implementations must tolerate concurrent
/// calls from sampler workers.
pub trait PageTextSource: Send + Sync {
    fn page_count(&self) -> u32;
    /// Text of one page, 1-based.
    fn page_text(&self, page: u32) -> Result<String>;
}

/// Direct extraction from the PDF content stream.
pub struct PdfTextSource {
    doc: PdfDocument,
    pages: u32,
}

impl PdfTextSource {
    pub fn load(path: &Path) -> Result<Self, SegmentError> {
        let doc = PdfDocument::load(path).map_err(|e| SegmentError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let pages = doc.get_pages().len() as u32;
        debug!(path = %path.display(), pages, "loaded source PDF");
        Ok(Self { doc, pages })
    }
}

impl PageTextSource for PdfTextSource {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let text = self
            .doc
            .extract_text(&[page])
            .with_context(|| format!("text extraction failed for page {page}"))?;
        Ok(text)
    }
}

/// Fans pages out over a fixed worker pool and collects snippets back
/// in page order.
pub struct PageSampler {
    pool: rayon::ThreadPool,
}

impl PageSampler {
    pub fn new() -> Result<Self> {
        Self::with_workers(default_workers())
    }

    pub fn with_workers(workers: usize) -> Result<Self> {
        let workers = workers.clamp(1, MAX_SAMPLER_WORKERS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sampler-{i}"))
            .build()
            .context("failed to build sampling thread pool")?;
        Ok(Self { pool })
    }

    /// Sample every page of `source`. On cancellation the pages already
    /// dispatched finish and are returned; the rest are skipped.
    pub fn sample(
        &self,
        source: &dyn PageTextSource,
        ocr: Option<&OcrHandle>,
        stop: &StopFlag,
    ) -> Vec<Page> {
        let total = source.page_count();
        info!(total, "sampling pages");

        let (tx, rx) = crossbeam_channel::unbounded::<Page>();
        let completed = AtomicUsize::new(0);

        self.pool.scope(|s| {
            for index in 1..=total {
                if stop.is_set() {
                    info!(dispatched = index - 1, total, "sampling cancelled");
                    break;
                }
                let tx = tx.clone();
                let completed = &completed;
                s.spawn(move |_| {
                    let page = sample_page(source, ocr, index);
                    let _ = tx.send(page);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % PROGRESS_EVERY == 0 {
                        info!(sampled = done, total, "sampling progress");
                    }
                });
            }
        });
        drop(tx);

        let by_index: BTreeMap<u32, Page> = rx.iter().map(|p| (p.index, p)).collect();
        by_index.into_values().collect()
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map_or(4, NonZeroUsize::get)
        .min(MAX_SAMPLER_WORKERS)
}

fn sample_page(source: &dyn PageTextSource, ocr: Option<&OcrHandle>, index: u32) -> Page {
    let text = match panic::catch_unwind(AssertUnwindSafe(|| source.page_text(index))) {
        Ok(Ok(t)) => t,
        Ok(Err(e)) => {
            warn!(page = index, error = %format!("{e:#}"), "page extraction failed");
            return error_page(index);
        }
        Err(_) => {
            warn!(page = index, "page extraction panicked");
            return error_page(index);
        }
    };

    let mut text = text;
    let mut method = ExtractionMethod::Direct;

    if non_ws_len(&text) < MIN_DIRECT_TEXT_CHARS {
        if let Some(ocr) = ocr {
            match ocr.recognize(index) {
                // Keep the optical text only when it actually says more.
                Ok(optical) if non_ws_len(&optical) > non_ws_len(&text) => {
                    text = optical;
                    method = ExtractionMethod::Optical;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(page = index, error = %format!("{e:#}"), "optical fallback failed");
                }
            }
        }
    }

    Page {
        index,
        snippet: normalize_snippet(index, &text),
        method,
    }
}

fn error_page(index: u32) -> Page {
    Page {
        index,
        snippet: format!("Page {index}: {ERROR_MARKER}"),
        method: ExtractionMethod::Error,
    }
}

fn non_ws_len(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// Collapse whitespace in the head of the page and cap the result,
/// prefixing the 1-based page index the classifier keys on.
fn normalize_snippet(index: u32, text: &str) -> String {
    let head: String = text.chars().take(RAW_HEAD_CHARS).collect();
    let mut flat = head.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > SNIPPET_MAX_CHARS {
        flat = flat.chars().take(SNIPPET_MAX_CHARS).collect();
    }
    format!("Page {index}: {flat}")
}
