//! Batch stitching scenarios driven by scripted classifiers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use pagepull_classify::{BoundaryClassifier, ClassifyError};
use pagepull_core::{protocol, ContinuationHint, DocumentCandidate, ExtractionMethod, Page};
use pagepull_engine::{BoundaryStitcher, SegmentError, StopFlag};

struct Call {
    start_page: u32,
    next_id: u32,
    hint: Option<ContinuationHint>,
    snippet_count: usize,
}

/// Replays canned protocol responses, one per call; `None` entries (and
/// exhaustion) become errors. Optionally trips a stop flag on its first
/// call to exercise cancellation mid-run.
struct ScriptedClassifier {
    responses: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<Call>>,
    stop_on_first_call: Option<StopFlag>,
}

impl ScriptedClassifier {
    fn new(responses: Vec<Option<&str>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| r.map(String::from)).collect()),
            calls: Mutex::new(Vec::new()),
            stop_on_first_call: None,
        }
    }

    fn stopping(responses: Vec<Option<&str>>, stop: StopFlag) -> Self {
        Self {
            stop_on_first_call: Some(stop),
            ..Self::new(responses)
        }
    }

    fn calls(&self) -> Vec<(u32, u32, Option<String>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.start_page, c.next_id, c.hint.as_ref().map(|h| h.id.clone())))
            .collect()
    }
}

#[async_trait]
impl BoundaryClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        snippets: &[String],
        start_page: u32,
        next_id: u32,
        hint: Option<&ContinuationHint>,
    ) -> Result<Vec<DocumentCandidate>, ClassifyError> {
        self.calls.lock().unwrap().push(Call {
            start_page,
            next_id,
            hint: hint.cloned(),
            snippet_count: snippets.len(),
        });
        if let Some(stop) = &self.stop_on_first_call {
            stop.set();
        }
        let next = self.responses.lock().unwrap().pop_front().flatten();
        match next {
            Some(text) => Ok(protocol::parse_candidates(&text)),
            None => Err(ClassifyError::Parse("scripted failure".into())),
        }
    }
}

fn pages(count: u32) -> Vec<Page> {
    (1..=count)
        .map(|index| Page {
            index,
            snippet: format!("Page {index}: heading text for page {index}"),
            method: ExtractionMethod::Direct,
        })
        .collect()
}

#[tokio::test]
async fn stitches_three_batches_with_continuation() {
    let classifier = ScriptedClassifier::new(vec![
        Some(
            "1|Complaint|2023-01-01|1|40\n\
             2|Summons|2023-01-01|41|60\n\
             3|Exhibit C|2023-01-15|61|75\n\
             4|Exhibit D|2023-01-20|76|89\n\
             5|Exhibit E|2023-02-01|90|100",
        ),
        Some(
            "5|Exhibit E|2023-02-01|101|120\n\
             6|Exhibit F|2023-02-10|121|160\n\
             7|Answer|2023-03-01|161|200",
        ),
        Some(
            "8|Reply Brief|2023-03-15|201|230\n\
             9|Proof of Service|2023-03-20|231|250",
        ),
    ]);

    let docs = BoundaryStitcher::new()
        .stitch(&pages(250), &classifier, None, &StopFlag::new())
        .await
        .unwrap();

    assert_eq!(docs.len(), 9);
    let exhibit_e = docs.iter().find(|d| d.id == "5").unwrap();
    assert_eq!((exhibit_e.start, exhibit_e.end), (90, 120));
    assert_eq!(docs.last().unwrap().id, "9");
    assert_eq!(docs.last().unwrap().end, 250);

    let calls = classifier.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], (1, 1, None));
    assert_eq!(calls[1], (101, 6, Some("5".to_string())));
    assert_eq!(calls[2], (201, 8, Some("7".to_string())));

    let batch_sizes: Vec<usize> = classifier
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.snippet_count)
        .collect();
    assert_eq!(batch_sizes, vec![100, 100, 50]);
}

#[tokio::test]
async fn failed_batch_retries_on_fallback() {
    let primary = ScriptedClassifier::new(vec![None]);
    let fallback = ScriptedClassifier::new(vec![Some("1|Recovered Document|2024-01-01|1|30")]);

    let docs = BoundaryStitcher::new()
        .stitch(&pages(30), &primary, Some(&fallback), &StopFlag::new())
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].title, "Recovered Document");
    assert_eq!(fallback.calls().len(), 1);
}

#[tokio::test]
async fn double_failure_becomes_coverage_gap() {
    let primary = ScriptedClassifier::new(vec![
        Some("1|First|2024-01-01|1|100"),
        None,
        Some("2|Third|2024-01-01|201|250"),
    ]);
    let fallback = ScriptedClassifier::new(vec![None]);

    let docs = BoundaryStitcher::new()
        .stitch(&pages(250), &primary, Some(&fallback), &StopFlag::new())
        .await
        .unwrap();

    // Batch two is simply missing; later batches still stitch on.
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "1");
    assert_eq!(docs[1].id, "2");
    assert_eq!((docs[1].start, docs[1].end), (201, 250));
    // The gap batch still consumed exactly one fallback attempt.
    assert_eq!(fallback.calls().len(), 1);
    // next_id for batch three is derived from what actually stitched.
    assert_eq!(primary.calls()[2].1, 2);
}

#[tokio::test]
async fn all_batches_failing_is_fatal() {
    let primary = ScriptedClassifier::new(vec![None, None, None]);

    let err = BoundaryStitcher::new()
        .stitch(&pages(250), &primary, None, &StopFlag::new())
        .await
        .unwrap_err();

    match err {
        SegmentError::NoDocumentsIdentified { batches } => assert_eq!(batches, 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_classifier_output_counts_as_nothing() {
    let primary = ScriptedClassifier::new(vec![Some("No documents found on these pages.")]);

    let err = BoundaryStitcher::new()
        .stitch(&pages(50), &primary, None, &StopFlag::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SegmentError::NoDocumentsIdentified { batches: 1 }
    ));
}

#[tokio::test]
async fn cancellation_keeps_stitched_prefix() {
    let stop = StopFlag::new();
    let primary = ScriptedClassifier::stopping(
        vec![
            Some("1|First|2024-01-01|1|100"),
            Some("2|Second|2024-01-01|101|200"),
        ],
        stop.clone(),
    );

    let docs = BoundaryStitcher::new()
        .stitch(&pages(250), &primary, None, &stop)
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "1");
    assert_eq!(primary.calls().len(), 1);
}

#[tokio::test]
async fn stitching_is_deterministic() {
    let script = vec![
        Some("1|Complaint|2023-01-01|1|60\n2|Exhibit A|2023-01-05|61|100"),
        Some("2|Exhibit A|2023-01-05|101|130\n3|Exhibit B|2023-01-09|131|200"),
    ];

    let first = BoundaryStitcher::new()
        .stitch(
            &pages(200),
            &ScriptedClassifier::new(script.clone()),
            None,
            &StopFlag::new(),
        )
        .await
        .unwrap();
    let second = BoundaryStitcher::new()
        .stitch(
            &pages(200),
            &ScriptedClassifier::new(script),
            None,
            &StopFlag::new(),
        )
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn small_batches_walk_the_whole_range() {
    let primary = ScriptedClassifier::new(vec![
        Some("1|One|2024-01-01|1|4"),
        Some("1|One|2024-01-01|5|8"),
        Some("2|Two|2024-01-01|9|10"),
    ]);

    let docs = BoundaryStitcher::with_batch_size(4)
        .stitch(&pages(10), &primary, None, &StopFlag::new())
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!((docs[0].start, docs[0].end), (1, 8));
    assert_eq!((docs[1].start, docs[1].end), (9, 10));
    assert_eq!(
        primary.calls(),
        vec![
            (1, 1, None),
            (5, 2, Some("1".to_string())),
            (9, 2, Some("1".to_string())),
        ]
    );
}
