//! Scanned-document scenarios for the OCR fallback, with fake backends.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{
    report_pdf, BlankRasterizer, DocxBuilder, MissingEngine, PdfBuilder, ScriptedEngine,
    SlowEngine,
};
use docunify::{process_document, Error, ParseOptions, SourceType};

const RECOGNIZED: &str = "Invoice 42\nTotal due: 100 EUR\n\nPay within 30 days.";

fn scripted_options(engine: ScriptedEngine) -> ParseOptions {
    ParseOptions::default()
        .with_rasterizer(BlankRasterizer)
        .with_ocr_engine(engine)
}

#[test]
fn test_scanned_pdf_text_recovered() {
    let engine = ScriptedEngine::new(RECOGNIZED);
    let calls = engine.calls.clone();
    let data = PdfBuilder::new().scanned(2).build();

    let processed = process_document(&data, SourceType::Pdf, &scripted_options(engine)).unwrap();
    let doc = processed.document;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(doc.extras().ocr_applied());
    assert!(!doc.metadata().has_text_content);
    assert_eq!(doc.metadata().page_count, Some(2));

    let pages = doc.text().pages.as_ref().unwrap();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.text.contains("Invoice 42")));
    assert!(doc.text().full_text.contains("Pay within 30 days."));

    assert_eq!(doc.sections().len(), 1);
    let section = &doc.sections()[0];
    assert!(section.is_implicit());
    assert_eq!(
        &section.paragraphs[..2],
        &["Invoice 42 Total due: 100 EUR", "Pay within 30 days."]
    );
    assert_eq!(doc.extras().paragraph_count(), 4);
}

#[test]
fn test_scanned_pdf_with_ocr_disabled() {
    let engine = ScriptedEngine::new(RECOGNIZED);
    let calls = engine.calls.clone();
    let data = PdfBuilder::new().scanned(1).build();
    let options = scripted_options(engine).without_ocr();

    let doc = process_document(&data, SourceType::Pdf, &options).unwrap().document;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!doc.extras().ocr_applied());
    assert!(doc.text().is_blank());
}

#[test]
fn test_missing_engine_degrades_to_warning() {
    let data = PdfBuilder::new().scanned(1).build();
    let options = ParseOptions::default()
        .with_rasterizer(BlankRasterizer)
        .with_ocr_engine(MissingEngine);

    let processed = process_document(&data, SourceType::Pdf, &options).unwrap();

    assert!(processed.document.extras().ocr_applied());
    assert!(processed.document.text().is_blank());
    assert!(processed
        .warnings
        .iter()
        .any(|w| w.contains("OCR failed for page 1")));
}

#[test]
fn test_ocr_deadline_is_fatal() {
    let data = PdfBuilder::new().scanned(1).build();
    let options = ParseOptions::default()
        .with_rasterizer(BlankRasterizer)
        .with_ocr_engine(SlowEngine(Duration::from_millis(500)))
        .with_ocr_timeout(Duration::from_millis(20));

    let err = process_document(&data, SourceType::Pdf, &options).unwrap_err();
    match err {
        Error::Timeout { stage, limit } => {
            assert_eq!(stage, "OCR");
            assert_eq!(limit, Duration::from_millis(20));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_text_pdf_skips_ocr() {
    let engine = ScriptedEngine::new(RECOGNIZED);
    let calls = engine.calls.clone();

    let doc = process_document(&report_pdf("Summary"), SourceType::Pdf, &scripted_options(engine))
        .unwrap()
        .document;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!doc.extras().ocr_applied());
    assert!(!doc.text().full_text.contains("Invoice"));
}

#[test]
fn test_docx_never_uses_ocr() {
    let engine = ScriptedEngine::new(RECOGNIZED);
    let calls = engine.calls.clone();
    let data = DocxBuilder::new().build();

    let doc = process_document(&data, SourceType::Docx, &scripted_options(engine))
        .unwrap()
        .document;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!doc.extras().ocr_applied());
    assert!(doc.text().is_blank());
}

#[test]
fn test_profile_ignores_recognized_text() {
    let data = PdfBuilder::new().scanned(1).build();
    let processed = process_document(
        &data,
        SourceType::Pdf,
        &scripted_options(ScriptedEngine::new(RECOGNIZED)),
    )
    .unwrap();

    assert!(processed.profile.fonts.is_none());
    assert!(processed.profile.font_sizes.is_none());
    assert!(!processed.profile.warnings.is_empty());
}
