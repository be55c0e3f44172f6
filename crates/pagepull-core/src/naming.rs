//! Output filename rules for split and merged PDFs.

/// Maximum length of a sanitized title used in a filename.
const MAX_TITLE_LEN: usize = 100;

/// Strip a title down to letters, digits, spaces, hyphens and
/// underscores, trimmed to at most 100 characters.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mut safe: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    safe = safe.trim().to_string();
    if safe.len() > MAX_TITLE_LEN {
        let mut cut = MAX_TITLE_LEN;
        while !safe.is_char_boundary(cut) {
            cut -= 1;
        }
        safe.truncate(cut);
        safe = safe.trim_end().to_string();
    }
    safe
}

/// Format a document id for filenames: numeric ids are zero-padded to
/// two digits, anything else is used verbatim.
#[must_use]
pub fn format_doc_id(id: &str) -> String {
    id.trim()
        .parse::<u32>()
        .map_or_else(|_| id.trim().to_string(), |n| format!("{n:02}"))
}

/// Filename for one split document: `<base> - <NN> - <title>.pdf`.
#[must_use]
pub fn split_file_name(source_stem: &str, id: &str, title: &str) -> String {
    format!(
        "{} - {} - {}.pdf",
        source_stem,
        format_doc_id(id),
        sanitize_title(title)
    )
}

/// Filename for a merged document: the sanitized title, with a `.pdf`
/// suffix appended when missing.
#[must_use]
pub fn merged_file_name(title: &str) -> String {
    let safe = sanitize_title(title);
    if safe.to_lowercase().ends_with("pdf") && title.to_lowercase().ends_with(".pdf") {
        // Sanitization strips the dot; restore the extension boundary.
        let trimmed = safe[..safe.len() - 3].trim_end().to_string();
        return format!("{trimmed}.pdf");
    }
    format!("{safe}.pdf")
}

/// Name of the per-source output subdirectory: `PULLED-<base>`.
#[must_use]
pub fn pulled_dir_name(source_stem: &str) -> String {
    format!("PULLED-{source_stem}")
}
