//! Shared types for the pagepull document segmentation engine.
//!
//! A "bundle" PDF contains many logical sub-documents back to back
//! (exhibits, discovery responses, reports). This crate defines the
//! vocabulary the rest of the workspace speaks:
//!
//! - [`Page`] — one sampled page snippet, produced by the sampler
//! - [`DocumentCandidate`] — one classifier claim for one batch
//! - [`Document`] — a finalized entry in the stitched document list
//! - [`ContinuationHint`] — the single piece of state threaded between
//!   batch classifier calls
//!
//! plus the tolerant parser for the classifier's line-oriented
//! `id|title|date|start|end` response format ([`protocol`]) and the
//! output-filename rules ([`naming`]).

pub mod naming;
pub mod protocol;
pub mod types;

pub use types::{
    next_id, ContinuationHint, Document, DocumentCandidate, ExtractionMethod, Page,
    DEFAULT_BATCH_SIZE, MAX_SAMPLER_WORKERS, MIN_DIRECT_TEXT_CHARS, SNIPPET_MAX_CHARS,
};
