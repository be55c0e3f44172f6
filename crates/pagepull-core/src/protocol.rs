//! Tolerant parser for the classifier's line-oriented response.
//!
//! The boundary classifier replies with one document per line:
//!
//! ```text
//! 1|Plaintiff's Complaint|2023-01-01|1|5
//! 2|Exhibit A|2023-01-02|6|10
//! ```
//!
//! The format is an ad hoc protocol spoken by a language model, so the
//! parser is deliberately forgiving: blank lines, markdown fences,
//! lines with fewer than five pipe-delimited fields, and lines whose
//! page numbers fail to parse are all skipped silently. A single bad
//! line never fails the batch.

use crate::types::DocumentCandidate;

/// Minimum pipe-delimited fields per candidate line: id, title, date,
/// start page, end page.
const MIN_FIELDS: usize = 5;

/// Parse a classifier response into candidates, skipping malformed lines.
#[must_use]
pub fn parse_candidates(response: &str) -> Vec<DocumentCandidate> {
    response
        .lines()
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<DocumentCandidate> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("```") || !line.contains('|') {
        return None;
    }

    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < MIN_FIELDS {
        return None;
    }

    let start: u32 = parts[3].trim().parse().ok()?;
    let end: u32 = parts[4].trim().parse().ok()?;

    Some(DocumentCandidate {
        id: parts[0].trim().to_string(),
        title: parts[1].trim().to_string(),
        date: parts[2].trim().to_string(),
        start,
        end,
    })
}
