//! Bundle PDF segmentation CLI
//!
//! Splits large bundle PDFs into logical documents: sample every page,
//! classify batches of headers, then split or merge by selection.

mod selection;
mod tesseract;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagepull_classify::gemini::GeminiClassifier;
use pagepull_core::{Document, DEFAULT_BATCH_SIZE};
use pagepull_engine::{
    build_index, BoundaryStitcher, DocumentAssembler, DocumentMap, OcrHandle, PageSampler,
    PdfiumHeaderRenderer, SegmentPipeline, StopFlag,
};
use tracing::{info, warn};

use crate::tesseract::TesseractExtractor;

#[derive(Parser)]
#[command(name = "pagepull")]
#[command(about = "Split bundle PDFs into their logical documents")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sample a bundle PDF, classify its documents and write the map and index
    Segment {
        /// Path to the bundle PDF
        pdf: PathBuf,

        /// Pages per classification batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Sampling worker threads (default: available cores, capped)
        #[arg(long)]
        max_workers: Option<usize>,

        /// Output path for the document map (default: <stem>.docmap.json next to the PDF)
        #[arg(long)]
        map_out: Option<PathBuf>,

        /// Output path for the Markdown index (default: Index_<stem>.md next to the PDF)
        #[arg(long)]
        index_out: Option<PathBuf>,

        /// Skip the optical fallback even when tesseract is available
        #[arg(long)]
        no_ocr: bool,
    },

    /// Write one PDF per selected document
    Split {
        /// Path to the bundle PDF
        pdf: PathBuf,

        /// Document map written by `segment`
        map: PathBuf,

        /// Document ids: "3", "1,4", "2-5" or "all"
        selection: String,
    },

    /// Combine the selected documents into one PDF, in selection order
    Merge {
        /// Path to the bundle PDF
        pdf: PathBuf,

        /// Document map written by `segment`
        map: PathBuf,

        /// Document ids: "3", "1,4", "2-5" or "all"
        selection: String,

        /// Output title (default: Merged_Documents_<first>-<last>)
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    "pagepull=info"
                        .parse()
                        .expect("directive is compile-time constant"),
                )
                .add_directive(
                    "pagepull_engine=info"
                        .parse()
                        .expect("directive is compile-time constant"),
                )
                .add_directive(
                    "pagepull_classify=info"
                        .parse()
                        .expect("directive is compile-time constant"),
                ),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Segment {
            pdf,
            batch_size,
            max_workers,
            map_out,
            index_out,
            no_ocr,
        } => segment(&pdf, batch_size, max_workers, map_out, index_out, no_ocr).await,
        Command::Split {
            pdf,
            map,
            selection,
        } => split(&pdf, &map, &selection),
        Command::Merge {
            pdf,
            map,
            selection,
            title,
        } => merge(&pdf, &map, &selection, title),
    }
}

async fn segment(
    pdf: &Path,
    batch_size: usize,
    max_workers: Option<usize>,
    map_out: Option<PathBuf>,
    index_out: Option<PathBuf>,
    no_ocr: bool,
) -> Result<()> {
    let api_key =
        std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable is not set")?;
    let primary = GeminiClassifier::primary(api_key.clone());
    let fallback = GeminiClassifier::fallback(api_key);

    let ocr = if no_ocr {
        None
    } else {
        match TesseractExtractor::detect() {
            Some(extractor) => {
                let pdf_path = pdf.to_path_buf();
                Some(OcrHandle::spawn(
                    move || Ok(Box::new(PdfiumHeaderRenderer::new(&pdf_path)?) as _),
                    Box::new(extractor),
                ))
            }
            None => {
                info!("tesseract not found on PATH, optical fallback disabled");
                None
            }
        }
    };

    let sampler = match max_workers {
        Some(n) => PageSampler::with_workers(n)?,
        None => PageSampler::new()?,
    };
    let mut pipeline = SegmentPipeline::new(sampler, BoundaryStitcher::with_batch_size(batch_size));

    let stop = StopFlag::new();
    let stop_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current work");
            stop_signal.set();
        }
    });

    let outcome = pipeline
        .run(pdf, &primary, Some(&fallback), ocr, &stop)
        .await?;

    let stem = file_stem(pdf);
    let parent = pdf.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let map_path = map_out.unwrap_or_else(|| parent.join(format!("{stem}.docmap.json")));
    let index_path = index_out.unwrap_or_else(|| parent.join(format!("Index_{stem}.md")));

    let map = DocumentMap {
        source: pdf.to_path_buf(),
        total_pages: outcome.total_pages,
        documents: outcome.documents.clone(),
    };
    map.save(&map_path)?;

    let source_name = pdf
        .file_name()
        .map_or_else(|| stem.clone(), |n| n.to_string_lossy().into_owned());
    let index = build_index(&source_name, &outcome.documents);
    std::fs::write(&index_path, &index)
        .with_context(|| format!("cannot write index {}", index_path.display()))?;

    info!(
        documents = outcome.documents.len(),
        map = %map_path.display(),
        index = %index_path.display(),
        "segmentation complete"
    );
    println!("{index}");
    println!(
        "Next: pagepull split \"{}\" \"{}\" all",
        pdf.display(),
        map_path.display()
    );
    Ok(())
}

fn split(pdf: &Path, map_path: &Path, selection: &str) -> Result<()> {
    let map = DocumentMap::load(map_path)?;
    let assembler = DocumentAssembler::open(pdf)?;
    let selected = selection::parse_selection(selection, &map.documents);
    if selected.is_empty() {
        warn!(selection, "selection matches no documents, nothing to do");
        return Ok(());
    }

    let out_dir = assembler.output_dir();
    let report = assembler.split(&selected, &out_dir)?;
    for failure in &report.failures {
        warn!(id = %failure.id, title = %failure.title, reason = %failure.reason, "document skipped");
    }
    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        dir = %out_dir.display(),
        "split complete"
    );
    for file in &report.written {
        println!("{}", file.path.display());
    }
    Ok(())
}

fn merge(pdf: &Path, map_path: &Path, selection: &str, title: Option<String>) -> Result<()> {
    let map = DocumentMap::load(map_path)?;
    let assembler = DocumentAssembler::open(pdf)?;
    let selected = selection::parse_selection(selection, &map.documents);
    if selected.is_empty() {
        warn!(selection, "selection matches no documents, nothing to do");
        return Ok(());
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| default_merge_title(&selected));

    match assembler.merge(&selected, &title, &assembler.output_dir()) {
        Ok(out) => {
            info!(path = %out.path.display(), pages = out.pages, "merge complete");
            println!("{}", out.path.display());
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "merge failed");
        }
    }
    Ok(())
}

fn default_merge_title(docs: &[Document]) -> String {
    let first = docs[0].id.trim();
    let last = docs[docs.len() - 1].id.trim();
    format!("Merged_Documents_{first}-{last}")
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document {
            id: id.to_string(),
            title: format!("Doc {id}"),
            date: String::new(),
            start: 1,
            end: 2,
        }
    }

    #[test]
    fn default_merge_title_spans_selection() {
        let docs = vec![doc("2"), doc("5"), doc("7")];
        assert_eq!(default_merge_title(&docs), "Merged_Documents_2-7");
        assert_eq!(default_merge_title(&[doc("3")]), "Merged_Documents_3-3");
    }

    #[test]
    fn file_stem_falls_back() {
        assert_eq!(file_stem(Path::new("/tmp/Bundle.pdf")), "Bundle");
        assert_eq!(file_stem(Path::new("/")), "document");
    }
}
