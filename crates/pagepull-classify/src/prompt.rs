//! Prompt construction for batched boundary classification.
//!
//! The prompt instructs the model to emit the line protocol parsed by
//! `pagepull_core::protocol` and carries the continuation instruction
//! that lets a document straddle a batch boundary without being
//! duplicated.

use pagepull_core::ContinuationHint;

/// Build the classification prompt for one batch of page snippets.
#[must_use]
pub fn build_prompt(
    snippets: &[String],
    start_page: u32,
    next_id: u32,
    hint: Option<&ContinuationHint>,
) -> String {
    let end_page = start_page + snippets.len().max(1) as u32 - 1;

    let context_instruction = match hint {
        Some(h) => format!(
            "CONTEXT: The previous batch of pages ended with a document titled '{}' (ID: {}). \
             If Page {} appears to be a continuation of this document, start your list with an \
             entry using ID {} and the same title. Otherwise, start with ID {}.",
            h.title, h.id, start_page, h.id, next_id
        ),
        None => format!("Start numbering new documents with ID {next_id}."),
    };

    format!(
        "I am processing a large PDF in batches. This batch contains headers from pages \
         {start_page} to {end_page}.\n\
         Identify distinct legal or administrative documents.\n\
         Format: ID|Title|Date|StartPage|EndPage\n\
         {context_instruction}\n\
         Rules:\n\
         1. Return ONLY the list, one document per line.\n\
         2. Do not use markdown.\n\
         3. If a document continues to the end of this batch, set EndPage to the last page of this batch.\n\
         4. Provide a detailed and descriptive title for each document.\n\
         5. If you identify an Insurance Policy, group all its related parts (Declarations, \
         Endorsements, Conditions, Exclusions, etc.) into a SINGLE document entry. Do not split it.\n\
         Example:\n\
         1|Plaintiff's Complaint|2023-01-01|1|5\n\
         2|Exhibit A|2023-01-02|6|10\n\
         \nHEADERS:\n{}",
        snippets.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippets(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Page {i}: header text")).collect()
    }

    #[test]
    fn prompt_states_page_span() {
        let p = build_prompt(&snippets(100), 101, 6, None);
        assert!(p.contains("pages 101 to 200"));
        assert!(p.contains("Start numbering new documents with ID 6."));
    }

    #[test]
    fn prompt_carries_continuation_hint() {
        let hint = ContinuationHint {
            id: "5".to_string(),
            title: "Exhibit E".to_string(),
        };
        let p = build_prompt(&snippets(50), 101, 6, Some(&hint));
        assert!(p.contains("ended with a document titled 'Exhibit E' (ID: 5)"));
        assert!(p.contains("If Page 101 appears to be a continuation"));
        assert!(p.contains("Otherwise, start with ID 6."));
    }

    #[test]
    fn prompt_includes_headers() {
        let s = snippets(2);
        let p = build_prompt(&s, 1, 1, None);
        assert!(p.ends_with("Page 1: header text\nPage 2: header text"));
    }
}
