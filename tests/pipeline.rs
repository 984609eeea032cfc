//! Integration tests for the batch pipeline.
//!
//! The whole pipeline runs in process: an in-memory object store
//! ([`MemoryStore`]) plus a scripted recognizer that plants result objects
//! the way Cloud Vision writes them back into the bucket. No network, no
//! credentials.

use async_trait::async_trait;
use rollscan::pipeline::extract::{self, FieldPattern, NO_TEXT_MARKER};
use rollscan::pipeline::{report, upload};
use rollscan::{
    run_batch, BatchConfig, BatchError, Document, DocumentResult, MemoryStore, Recognizer,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Recognizer that writes pre-scripted result objects into the store,
/// mimicking Vision's write-back of `<prefix><stem>-output-N-to-M.json`.
struct PlantingRecognizer {
    store: Arc<MemoryStore>,
    /// object name -> [(key suffix, result JSON)]
    results: HashMap<String, Vec<(String, String)>>,
    /// Objects whose recognition should fail instead.
    fail_on: Vec<String>,
}

impl PlantingRecognizer {
    fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            results: HashMap::new(),
            fail_on: Vec::new(),
        }
    }

    fn plant(mut self, object: &str, key_suffix: &str, json: serde_json::Value) -> Self {
        self.results
            .entry(object.to_string())
            .or_default()
            .push((key_suffix.to_string(), json.to_string()));
        self
    }

    fn fail_on(mut self, object: &str) -> Self {
        self.fail_on.push(object.to_string());
        self
    }
}

#[async_trait]
impl Recognizer for PlantingRecognizer {
    async fn recognize(
        &self,
        bucket: &str,
        object: &str,
        output_prefix: &str,
        _timeout: Duration,
    ) -> Result<(), BatchError> {
        if self.fail_on.iter().any(|o| o == object) {
            return Err(BatchError::OcrFailed {
                object: object.to_string(),
                detail: "scripted failure".into(),
            });
        }
        if let Some(results) = self.results.get(object) {
            for (suffix, json) in results {
                let key = format!("{output_prefix}{suffix}");
                self.store.insert(bucket, &key, json.clone().into_bytes());
            }
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn page_with_text(text: &str) -> serde_json::Value {
    serde_json::json!({ "fullTextAnnotation": { "text": text, "pages": [] } })
}

fn result_json(pages: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "responses": pages })
}

/// Input folder with the given (empty-ish) PDF files plus a matching config.
fn batch_fixture(files: &[&str]) -> (tempfile::TempDir, BatchConfig) {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("scans");
    std::fs::create_dir(&input_dir).unwrap();
    for name in files {
        std::fs::write(input_dir.join(name), b"%PDF-1.4 fixture").unwrap();
    }

    let config = BatchConfig::builder()
        .bucket("rolls")
        .input_dir(&input_dir)
        .output_root(dir.path().join("output"))
        .build()
        .unwrap();
    (dir, config)
}

fn doc_result(file_name: &str, fields: &[&str]) -> DocumentResult {
    DocumentResult {
        file_name: file_name.to_string(),
        fields: fields.iter().map(|s| s.to_string()).collect(),
        text_path: PathBuf::new(),
        result_keys: Vec::new(),
        duration_ms: 0,
    }
}

// ── Pipeline runs ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_writes_text_and_extracts_fields() {
    let (dir, config) = batch_fixture(&["ward-7.pdf"]);
    let store = Arc::new(MemoryStore::new());
    let ocr = PlantingRecognizer::new(store.clone()).plant(
        "ward-7.pdf",
        "ward-7-output-1-to-1.json",
        result_json(vec![
            page_with_text("मतदार यादी\nनाव: RAMESH\nवय: 42\n"),
            serde_json::json!({ "context": { "pageNumber": 2 } }),
        ]),
    );

    let output = run_batch(&*store, &ocr, &config).await.unwrap();

    assert_eq!(output.stats.total_documents, 1);
    assert_eq!(output.documents[0].fields, vec!["RAMESH"]);
    assert_eq!(
        output.documents[0].result_keys,
        vec!["output/ocr/ward-7-output-1-to-1.json"]
    );

    // The uploaded document sits in the bucket under its base name.
    assert!(store
        .object_names("rolls")
        .contains(&"ward-7.pdf".to_string()));

    // Text file: delimiter, recognized text, and the no-text marker for
    // the annotation-less page.
    let text = std::fs::read_to_string(dir.path().join("output/ocr/ward-7.txt")).unwrap();
    assert!(text.contains("--- Text from ward-7.pdf ---"));
    assert!(text.contains("नाव: RAMESH"));
    assert!(text.contains(NO_TEXT_MARKER.trim_end()));
}

#[tokio::test]
async fn upload_stage_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ward-7.pdf");
    std::fs::write(&path, b"%PDF-1.4 fixture").unwrap();
    let document = Document::from_path(path).unwrap();

    let store = MemoryStore::new();
    upload::run(&store, "rolls", &document).await.unwrap();
    upload::run(&store, "rolls", &document).await.unwrap();

    assert_eq!(store.object_names("rolls"), vec!["ward-7.pdf"]);
}

#[tokio::test]
async fn second_document_reprocesses_first_documents_results() {
    // The output prefix is shared across the run and never cleaned, so
    // document B's extraction also sees document A's result objects. This
    // is inherited behavior the pipeline keeps on purpose; the test pins
    // it down rather than hiding it.
    let (dir, config) = batch_fixture(&["a.pdf", "b.pdf"]);
    let store = Arc::new(MemoryStore::new());
    let ocr = PlantingRecognizer::new(store.clone())
        .plant(
            "a.pdf",
            "a-output-1-to-1.json",
            result_json(vec![page_with_text("नाव: RAMESH\n")]),
        )
        .plant(
            "b.pdf",
            "b-output-1-to-1.json",
            result_json(vec![page_with_text("नाव: SUNITA\n")]),
        );

    let output = run_batch(&*store, &ocr, &config).await.unwrap();

    assert_eq!(output.documents[0].file_name, "a.pdf");
    assert_eq!(output.documents[0].fields, vec!["RAMESH"]);

    // B sees A's result object too, in listing order.
    assert_eq!(output.documents[1].file_name, "b.pdf");
    assert_eq!(output.documents[1].fields, vec!["RAMESH", "SUNITA"]);
    assert_eq!(output.documents[1].result_keys.len(), 2);

    // And A's text was appended to B's output file a second time.
    let b_text = std::fs::read_to_string(dir.path().join("output/ocr/b.txt")).unwrap();
    assert!(b_text.contains("नाव: RAMESH"));
}

#[tokio::test]
async fn scoped_keys_avoid_reprocessing() {
    // The extraction interface takes explicit keys, so a caller driving
    // the stages directly can scope each document to its own results.
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.insert(
        "rolls",
        "output/ocr/a-output-1-to-1.json",
        result_json(vec![page_with_text("नाव: RAMESH\n")])
            .to_string()
            .into_bytes(),
    );
    store.insert(
        "rolls",
        "output/ocr/b-output-1-to-1.json",
        result_json(vec![page_with_text("नाव: SUNITA\n")])
            .to_string()
            .into_bytes(),
    );

    let text_path = dir.path().join("b.txt");
    let keys = vec!["output/ocr/b-output-1-to-1.json".to_string()];
    let fields = extract::run(
        &store,
        "rolls",
        &keys,
        &text_path,
        "b.pdf",
        &FieldPattern::default(),
    )
    .await
    .unwrap();

    assert_eq!(fields, vec!["SUNITA"]);
    let text = std::fs::read_to_string(&text_path).unwrap();
    assert!(!text.contains("RAMESH"));
}

#[tokio::test]
async fn malformed_result_object_aborts_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.insert("rolls", "output/ocr/bad.json", b"not json".to_vec());

    let err = extract::run(
        &store,
        "rolls",
        &["output/ocr/bad.json".to_string()],
        &dir.path().join("out.txt"),
        "bad.pdf",
        &FieldPattern::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BatchError::MalformedResult { .. }));
}

#[tokio::test]
async fn stage_failure_aborts_batch_but_keeps_earlier_outputs() {
    let (dir, config) = batch_fixture(&["a.pdf", "b.pdf"]);
    let store = Arc::new(MemoryStore::new());
    let ocr = PlantingRecognizer::new(store.clone())
        .plant(
            "a.pdf",
            "a-output-1-to-1.json",
            result_json(vec![page_with_text("नाव: RAMESH\n")]),
        )
        .fail_on("b.pdf");

    let err = run_batch(&*store, &ocr, &config).await.unwrap_err();
    assert!(matches!(err, BatchError::OcrFailed { .. }));

    // Document A completed before the failure; its outputs survive.
    let a_text = std::fs::read_to_string(dir.path().join("output/ocr/a.txt")).unwrap();
    assert!(a_text.contains("RAMESH"));
    assert!(store.object_names("rolls").contains(&"a.pdf".to_string()));
}

#[tokio::test]
async fn output_text_file_accumulates_across_runs() {
    let (dir, config) = batch_fixture(&["ward-7.pdf"]);
    let store = Arc::new(MemoryStore::new());

    for _ in 0..2 {
        let ocr = PlantingRecognizer::new(store.clone()).plant(
            "ward-7.pdf",
            "ward-7-output-1-to-1.json",
            result_json(vec![page_with_text("नाव: RAMESH\n")]),
        );
        run_batch(&*store, &ocr, &config).await.unwrap();
    }

    let text = std::fs::read_to_string(dir.path().join("output/ocr/ward-7.txt")).unwrap();
    assert_eq!(text.matches("--- Text from ward-7.pdf ---").count(), 2);
}

// ── Reporting ────────────────────────────────────────────────────────────────

#[test]
fn workbook_has_one_sheet_per_document() {
    use calamine::{open_workbook, Data, Reader, Xlsx};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.xlsx");
    let results = vec![doc_result("doc1", &["A", "B"]), doc_result("doc2", &[])];
    report::write_workbook(&results, &path).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["doc1", "doc2"]);

    let doc1 = workbook.worksheet_range("doc1").unwrap();
    assert_eq!(doc1.get_value((0, 0)), Some(&Data::String("Names".into())));
    assert_eq!(doc1.get_value((1, 0)), Some(&Data::String("A".into())));
    assert_eq!(doc1.get_value((2, 0)), Some(&Data::String("B".into())));
    assert_eq!(doc1.get_value((3, 0)), None);

    let doc2 = workbook.worksheet_range("doc2").unwrap();
    assert_eq!(doc2.get_value((0, 0)), Some(&Data::String("Names".into())));
    assert_eq!(doc2.get_value((1, 0)), None);
}

#[test]
fn workbook_sheet_titles_truncate_to_31_characters() {
    use calamine::{open_workbook, Reader, Xlsx};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.xlsx");
    let long_name = "an-extremely-long-document-name-from-ward-seven.pdf";
    let results = vec![doc_result(long_name, &["A"])];
    report::write_workbook(&results, &path).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let expected: String = long_name.chars().take(31).collect();
    assert_eq!(workbook.sheet_names(), vec![expected]);
}

#[test]
fn colliding_truncated_titles_collapse_to_the_later_document() {
    use calamine::{open_workbook, Data, Reader, Xlsx};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.xlsx");
    // Identical first 31 characters; only the tails differ.
    let results = vec![
        doc_result("shared-prefix-that-hits-the-cap-ONE.pdf", &["A"]),
        doc_result("shared-prefix-that-hits-the-cap-TWO.pdf", &["B"]),
    ];
    report::write_workbook(&results, &path).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let names = workbook.sheet_names();
    assert_eq!(names.len(), 1);
    let sheet = workbook.worksheet_range(&names[0]).unwrap();
    assert_eq!(sheet.get_value((1, 0)), Some(&Data::String("B".into())));
}
