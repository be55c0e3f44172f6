//! Segmentation engine: page sampling, boundary stitching and output
//! assembly for large bundle PDFs.
//!
//! The flow is linear. [`sampler::PageSampler`] reduces every page to a
//! short snippet, [`stitcher::BoundaryStitcher`] turns snippet batches
//! into a stitched document list via a [`pagepull_classify::BoundaryClassifier`],
//! and [`assembler::DocumentAssembler`] writes the selected documents
//! back out as PDFs. [`pipeline::SegmentPipeline`] strings these
//! together and tracks the state machine.

pub mod assembler;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod sampler;
pub mod stitcher;

pub use assembler::{build_index, AssemblyReport, DocumentAssembler, ItemFailure, OutputFile};
pub use error::SegmentError;
pub use ocr::{HeaderRenderer, OcrHandle, OpticalExtractor, PdfiumHeaderRenderer};
pub use pipeline::{DocumentMap, PipelineState, SegmentOutcome, SegmentPipeline, StopFlag};
pub use sampler::{PageSampler, PageTextSource, PdfTextSource, ERROR_MARKER};
pub use stitcher::BoundaryStitcher;
