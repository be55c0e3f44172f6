//! Parsing of the user's document selection.
//!
//! A selection is `all`, or a comma-separated list of tokens. Numeric
//! tokens and ranges like `2-5` match documents by numeric id, so `03`
//! selects the document with id `3`. Anything else matches ids
//! verbatim. Selection order is preserved and duplicates collapse.

use std::collections::BTreeSet;

use pagepull_core::Document;
use tracing::warn;

pub fn parse_selection(input: &str, docs: &[Document]) -> Vec<Document> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return docs.to_vec();
    }

    let mut selected: Vec<Document> = Vec::new();
    let mut seen: BTreeSet<usize> = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let before = selected.len();
        if let Some((a, b)) = numeric_range(token) {
            for n in a..=b {
                take_matching(docs, &mut selected, &mut seen, |d| numeric_id(d) == Some(n));
            }
        } else if let Ok(n) = token.parse::<u32>() {
            take_matching(docs, &mut selected, &mut seen, |d| numeric_id(d) == Some(n));
        } else {
            take_matching(docs, &mut selected, &mut seen, |d| d.id == token);
        }

        if selected.len() == before {
            warn!(token, "selection token matches no document");
        }
    }

    selected
}

fn numeric_range(token: &str) -> Option<(u32, u32)> {
    let (a, b) = token.split_once('-')?;
    let a: u32 = a.trim().parse().ok()?;
    let b: u32 = b.trim().parse().ok()?;
    (a <= b).then_some((a, b))
}

fn numeric_id(doc: &Document) -> Option<u32> {
    doc.id.trim().parse().ok()
}

fn take_matching(
    docs: &[Document],
    selected: &mut Vec<Document>,
    seen: &mut BTreeSet<usize>,
    pred: impl Fn(&Document) -> bool,
) {
    for (i, doc) in docs.iter().enumerate() {
        if pred(doc) && seen.insert(i) {
            selected.push(doc.clone());
        }
    }
}
