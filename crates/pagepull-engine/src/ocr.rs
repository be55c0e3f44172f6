//! Optical fallback for pages with little or no embedded text.
//!
//! Rendering happens through pdfium, whose bindings are not thread
//! safe, so all optical work is funneled onto one dedicated worker
//! thread. Sampler workers talk to it through [`OcrHandle`], which is
//! cheap to share and blocks only the calling worker while its page is
//! being recognized.
//!
//! Only the top quarter of each page is rendered, at double scale.
//! Headers carry the captions, titles and stamps that identify a
//! document; recognizing the full page would cost several times more
//! for text the classifier does not need.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Sender;
use pdfium_render::prelude::*;
use tracing::warn;

/// Scale factor applied when rendering a page for recognition.
const RENDER_SCALE: f32 = 2.0;

/// Fraction of the page height kept, measured from the top.
const HEADER_FRACTION: u32 = 4;

/// Recognizes text in a rendered header image (PNG bytes).
pub trait OpticalExtractor: Send {
    fn extract(&self, png: &[u8]) -> Result<String>;
}

/// Renders the header region of one page to PNG bytes.
pub trait HeaderRenderer {
    fn render_header(&self, page: u32) -> Result<Vec<u8>>;
}

/// Header renderer backed by pdfium.
///
/// The document is reloaded per call rather than held open; renders
/// are rare (sparse pages only) and a held `PdfDocument` would borrow
/// the `Pdfium` instance for the renderer's whole lifetime.
pub struct PdfiumHeaderRenderer {
    pdfium: Pdfium,
    path: PathBuf,
}

impl PdfiumHeaderRenderer {
    pub fn new(path: &Path) -> Result<Self> {
        let pdfium = Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .context("Failed to bind pdfium library")?,
        );
        Ok(Self {
            pdfium,
            path: path.to_path_buf(),
        })
    }
}

impl HeaderRenderer for PdfiumHeaderRenderer {
    fn render_header(&self, page: u32) -> Result<Vec<u8>> {
        let document = self
            .pdfium
            .load_pdf_from_file(&self.path, None)
            .with_context(|| format!("Failed to load PDF: {}", self.path.display()))?;

        let pages = document.pages();
        let page = pages
            .get(page.saturating_sub(1) as u16)
            .with_context(|| format!("page {page} out of range"))?;

        let pixel_width = (page.width().value * RENDER_SCALE) as i32;
        let pixel_height = (page.height().value * RENDER_SCALE) as i32;

        let bitmap = page
            .render_with_config(
                &PdfRenderConfig::new()
                    .set_target_width(pixel_width)
                    .set_target_height(pixel_height),
            )
            .context("Failed to render PDF page")?;

        let image = bitmap.as_image();
        let header_height = (image.height() / HEADER_FRACTION).max(1);
        let header = image.crop_imm(0, 0, image.width(), header_height);

        let mut buf = Vec::new();
        header
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("Failed to encode header image")?;
        Ok(buf)
    }
}

struct OcrJob {
    page: u32,
    reply: Sender<Result<String>>,
}

/// Shared handle to the optical worker thread.
///
/// The renderer is constructed on the worker thread itself via the
/// factory closure, so renderer types never need to cross threads.
pub struct OcrHandle {
    jobs: Sender<OcrJob>,
}

impl OcrHandle {
    pub fn spawn<F>(make_renderer: F, extractor: Box<dyn OpticalExtractor>) -> Self
    where
        F: FnOnce() -> Result<Box<dyn HeaderRenderer>> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded::<OcrJob>();
        thread::spawn(move || {
            let renderer = match make_renderer() {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "optical renderer unavailable");
                    let reason = format!("{e:#}");
                    for job in rx.iter() {
                        let _ = job
                            .reply
                            .send(Err(anyhow!("optical renderer unavailable: {reason}")));
                    }
                    return;
                }
            };
            for job in rx.iter() {
                let result = renderer
                    .render_header(job.page)
                    .and_then(|png| extractor.extract(&png));
                let _ = job.reply.send(result);
            }
        });
        Self { jobs: tx }
    }

    /// Render and recognize the header of one page. Blocks the caller
    /// until the worker gets to this job.
    pub fn recognize(&self, page: u32) -> Result<String> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.jobs
            .send(OcrJob {
                page,
                reply: reply_tx,
            })
            .map_err(|_| anyhow!("optical worker stopped"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("optical worker stopped"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRenderer;

    impl HeaderRenderer for FixedRenderer {
        fn render_header(&self, page: u32) -> Result<Vec<u8>> {
            if page == 0 {
                return Err(anyhow!("no such page"));
            }
            Ok(vec![page as u8])
        }
    }

    struct EchoExtractor;

    impl OpticalExtractor for EchoExtractor {
        fn extract(&self, png: &[u8]) -> Result<String> {
            Ok(format!("recognized {} bytes", png.len()))
        }
    }

    #[test]
    fn recognize_round_trips_through_worker() {
        let handle = OcrHandle::spawn(|| Ok(Box::new(FixedRenderer) as _), Box::new(EchoExtractor));
        assert_eq!(handle.recognize(3).unwrap(), "recognized 1 bytes");
    }

    #[test]
    fn render_failure_reaches_caller() {
        let handle = OcrHandle::spawn(|| Ok(Box::new(FixedRenderer) as _), Box::new(EchoExtractor));
        assert!(handle.recognize(0).is_err());
    }

    #[test]
    fn failed_factory_fails_every_job() {
        let handle = OcrHandle::spawn(|| Err(anyhow!("no pdfium")), Box::new(EchoExtractor));
        let err = handle.recognize(1).unwrap_err();
        assert!(err.to_string().contains("unavailable"));
        assert!(handle.recognize(2).is_err());
    }
}
