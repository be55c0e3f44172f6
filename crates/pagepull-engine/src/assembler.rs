//! Physical assembly: split and merge outputs plus the Markdown index.
//!
//! Split clones the source and deletes the complement of each range,
//! which keeps every split independent; one corrupt range cannot poison
//! its neighbors. Merge rebuilds the page tree instead, because the
//! selection order must survive into the output and deletion can only
//! preserve source order.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lopdf::{Document as PdfDocument, Object, ObjectId};
use pagepull_core::naming::{merged_file_name, pulled_dir_name, split_file_name};
use pagepull_core::Document;
use tracing::{info, warn};

use crate::error::SegmentError;

/// Page attributes a page may inherit from its ancestors in the page
/// tree. They are copied down before the tree is rebuilt.
const INHERITED_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// One successfully written output PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub pages: u32,
}

/// One document that could not be written.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub id: String,
    pub title: String,
    pub reason: String,
}

/// Outcome of a split run. Failures are per item and never abort the
/// remaining items.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub written: Vec<OutputFile>,
    pub failures: Vec<ItemFailure>,
}

pub struct DocumentAssembler {
    source_stem: String,
    source_dir: PathBuf,
    doc: PdfDocument,
    total_pages: u32,
}

impl DocumentAssembler {
    pub fn open(path: &Path) -> Result<Self, SegmentError> {
        let doc = PdfDocument::load(path).map_err(|e| SegmentError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let total_pages = doc.get_pages().len() as u32;
        let source_stem = path
            .file_stem()
            .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned());
        let source_dir = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self {
            source_stem,
            source_dir,
            doc,
            total_pages,
        })
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    #[must_use]
    pub fn source_stem(&self) -> &str {
        &self.source_stem
    }

    /// `PULLED-<stem>` next to the source file.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.source_dir.join(pulled_dir_name(&self.source_stem))
    }

    /// Write one PDF per document. Order of `docs` is preserved in the
    /// report; a failed item is recorded and skipped.
    pub fn split(&self, docs: &[Document], out_dir: &Path) -> Result<AssemblyReport> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;

        let mut report = AssemblyReport::default();
        for doc in docs {
            match self.write_split(doc, out_dir) {
                Ok(file) => {
                    info!(id = %doc.id, path = %file.path.display(), pages = file.pages, "wrote split");
                    report.written.push(file);
                }
                Err(e) => {
                    warn!(id = %doc.id, title = %doc.title, error = %format!("{e:#}"), "split failed");
                    report.failures.push(ItemFailure {
                        id: doc.id.clone(),
                        title: doc.title.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }
        Ok(report)
    }

    fn write_split(&self, doc: &Document, out_dir: &Path) -> Result<OutputFile> {
        let mut range = doc.clone();
        range.clamp_to(self.total_pages);

        let mut out = self.doc.clone();
        let delete: Vec<u32> = (1..=self.total_pages)
            .filter(|p| *p < range.start || *p > range.end)
            .collect();
        if !delete.is_empty() {
            out.delete_pages(&delete);
        }
        let _ = out.prune_objects();

        let path = out_dir.join(split_file_name(&self.source_stem, &doc.id, &doc.title));
        out.save(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(OutputFile {
            path,
            pages: range.page_count(),
        })
    }

    /// Write one PDF containing the selected documents' pages in
    /// selection order, named after `title`.
    pub fn merge(&self, docs: &[Document], title: &str, out_dir: &Path) -> Result<OutputFile> {
        let mut out = self.doc.clone();
        let page_map = out.get_pages();

        let mut ordered: Vec<ObjectId> = Vec::new();
        for doc in docs {
            let mut range = doc.clone();
            range.clamp_to(self.total_pages);
            for p in range.start..=range.end {
                if let Some(&id) = page_map.get(&p) {
                    ordered.push(id);
                }
            }
        }
        if ordered.is_empty() {
            bail!("selection covers no pages");
        }
        let unique: BTreeSet<ObjectId> = ordered.iter().copied().collect();

        let root_pages_id = {
            let catalog = out.catalog().context("source PDF has no catalog")?;
            catalog
                .get(b"Pages")
                .and_then(Object::as_reference)
                .context("source PDF has no page tree")?
        };

        // Inherited attributes must land on the pages themselves before
        // intermediate tree nodes are cut out.
        for &pid in &unique {
            for key in INHERITED_KEYS {
                let present = out.get_dictionary(pid).is_ok_and(|d| d.has(key));
                if present {
                    continue;
                }
                if let Some(value) = inherited_value(&out, pid, key) {
                    if let Ok(dict) = out.get_dictionary_mut(pid) {
                        dict.set(key, value);
                    }
                }
            }
        }

        let kids: Vec<Object> = ordered.iter().map(|&id| Object::Reference(id)).collect();
        let count = kids.len() as i64;
        {
            let pages_dict = out
                .get_dictionary_mut(root_pages_id)
                .context("page tree root is not a dictionary")?;
            pages_dict.set("Kids", kids);
            pages_dict.set("Count", count);
        }
        for &pid in &unique {
            if let Ok(dict) = out.get_dictionary_mut(pid) {
                dict.set("Parent", Object::Reference(root_pages_id));
            }
        }

        let _ = out.prune_objects();
        out.renumber_objects();

        fs::create_dir_all(out_dir)
            .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;
        let path = out_dir.join(merged_file_name(title));
        out.save(&path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), pages = count, "wrote merge");
        Ok(OutputFile {
            path,
            pages: count as u32,
        })
    }
}

fn inherited_value(doc: &PdfDocument, page: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page).ok()?;
    loop {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
}

/// Render the Markdown index listing every stitched document.
#[must_use]
pub fn build_index(source_name: &str, docs: &[Document]) -> String {
    let mut md = format!("# Document Index: {source_name}\n\n");
    md.push_str("| Id | Title | Date | Page Range |\n");
    md.push_str("| --- | --- | --- | --- |\n");
    for doc in docs {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            doc.id,
            doc.title,
            doc.date,
            doc.page_range_label()
        ));
    }
    md
}
