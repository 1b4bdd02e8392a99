//! Benchmarks for docunify parsing and comparison.
//!
//! Run with: cargo bench
//!
//! Inputs are synthetic documents built in memory.

use std::io::{Cursor, Write};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use docunify::{
    compare_formats, CompareOptions, DocumentInput, FormatProfileExtractor, ParseOptions,
    SourceType, StructuralReader,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Creates a text PDF with a heading and a few body lines per page.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for page in 0..page_count {
        let mut operations = Vec::new();
        let mut line = |size: i64, y: i64, text: String| {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        };
        line(18, 720, format!("Chapter {}", page + 1));
        for n in 0..20 {
            line(
                11,
                690 - n * 14,
                format!("Line {} of the benchmark body text on page {}.", n + 1, page + 1),
            );
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Creates a DOCX package with the given number of heading/paragraph pairs.
fn create_test_docx(sections: usize) -> Vec<u8> {
    let mut body = String::new();
    for n in 0..sections {
        body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Section {}</w:t></w:r></w:p>"#,
            n + 1
        ));
        body.push_str(
            r#"<w:p><w:pPr><w:ind w:firstLine="360"/><w:spacing w:after="160"/></w:pPr><w:r><w:rPr><w:rFonts w:ascii="Calibri"/><w:sz w:val="22"/></w:rPr><w:t>Benchmark paragraph text.</w:t></w:r></w:p>"#,
        );
    }
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:bottom="1440" w:left="1440" w:right="1440"/></w:sectPr></w:body></w:document>"#
    );

    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf.into_inner()
}

/// Benchmark format detection.
fn bench_format_detection(c: &mut Criterion) {
    let pdf_data = create_test_pdf(1);
    let docx_data = create_test_docx(1);
    let other = b"Not a document at all, just random text content";

    c.bench_function("detect_pdf", |b| {
        b.iter(|| docunify::detect_format_from_bytes(black_box(&pdf_data)).unwrap());
    });

    c.bench_function("detect_docx", |b| {
        b.iter(|| docunify::detect_format_from_bytes(black_box(&docx_data)).unwrap());
    });

    c.bench_function("detect_other", |b| {
        b.iter(|| docunify::detect_format_from_bytes(black_box(other)).is_err());
    });
}

/// Benchmark the full pipeline at various sizes.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let options = ParseOptions::new().without_ocr().without_rasterizer();

    for page_count in [1, 5, 10] {
        let data = create_test_pdf(page_count);
        group.bench_function(format!("pdf_{}_pages", page_count), |b| {
            b.iter(|| docunify::parse_document(black_box(&data), SourceType::Pdf, &options));
        });
    }

    for sections in [10, 100] {
        let data = create_test_docx(sections);
        group.bench_function(format!("docx_{}_sections", sections), |b| {
            b.iter(|| docunify::parse_document(black_box(&data), SourceType::Docx, &options));
        });
    }

    group.finish();
}

/// Benchmark profile extraction on an already extracted structure.
fn bench_profile(c: &mut Criterion) {
    let options = ParseOptions::new().without_ocr().without_rasterizer();
    let reader = docunify::parser::reader_for(SourceType::Pdf, &options);
    let raw = reader.extract(&create_test_pdf(10)).unwrap();
    let extractor = FormatProfileExtractor::new();

    c.bench_function("profile_pdf_10_pages", |b| {
        b.iter(|| extractor.extract(black_box(&raw)));
    });
}

/// Benchmark a three-way format comparison.
fn bench_compare(c: &mut Criterion) {
    let options = ParseOptions::new().without_ocr().without_rasterizer();
    let inputs = [
        DocumentInput::new("a.docx", create_test_docx(20), SourceType::Docx),
        DocumentInput::new("b.docx", create_test_docx(20), SourceType::Docx),
        DocumentInput::new("c.pdf", create_test_pdf(3), SourceType::Pdf),
    ];

    c.bench_function("compare_formats_3", |b| {
        b.iter(|| compare_formats(black_box(&inputs), &options, &CompareOptions::default()));
    });
}

criterion_group!(
    benches,
    bench_format_detection,
    bench_pipeline,
    bench_profile,
    bench_compare,
);
criterion_main!(benches);
