//! docunify CLI - document normalization and comparison tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docunify::compare::{MetricOutcome, ReferenceReport};
use docunify::ocr::TesseractEngine;
use docunify::{
    render, CompareOptions, ConsistencyReport, DocumentInput, ErrorMode, FormatComparison,
    JsonFormat, ParseOptions, ReferenceFormatComparison, TitleComparison,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "docunify")]
#[command(author = "iyulab")]
#[command(version)]
#[command(
    about = "Normalize DOCX and PDF documents to JSON and compare their formatting",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    parse: ParseArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that parses documents.
#[derive(Args)]
struct ParseArgs {
    /// Run OCR on PDFs without extractable text
    #[arg(long, global = true, env = "DOCUNIFY_OCR", default_value_t = true, action = clap::ArgAction::Set)]
    ocr: bool,

    /// Render resolution for OCR
    #[arg(long, global = true, env = "DOCUNIFY_OCR_DPI", default_value_t = 200)]
    ocr_dpi: u32,

    /// Seconds the whole OCR stage may take
    #[arg(long, global = true, env = "DOCUNIFY_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Tesseract language models (e.g., "eng+deu")
    #[arg(long, global = true, env = "DOCUNIFY_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Skip unreadable pages and report failed inputs instead of aborting
    #[arg(long, global = true, env = "DOCUNIFY_LENIENT")]
    lenient: bool,

    /// Process PDF pages on a single thread
    #[arg(long, global = true)]
    sequential: bool,
}

impl ParseArgs {
    fn to_options(&self) -> ParseOptions {
        let mut options = ParseOptions::new()
            .with_ocr(self.ocr)
            .with_ocr_dpi(self.ocr_dpi)
            .with_ocr_timeout(Duration::from_secs(self.ocr_timeout))
            .with_ocr_engine(TesseractEngine::new().with_language(&self.ocr_lang));
        if self.lenient {
            options = options.with_error_mode(ErrorMode::Lenient);
        }
        if self.sequential {
            options = options.sequential();
        }
        options
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document to unified JSON
    Parse {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Skip image extraction
        #[arg(long)]
        no_images: bool,
    },

    /// Show document information
    Info {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show the formatting profile of a document
    Profile {
        /// Input DOCX or PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare formatting consistency across two or three documents
    #[command(name = "compare-format")]
    CompareFormat {
        /// Input files (2 or 3, including the reference when given)
        #[arg(value_name = "FILES", required = true, num_args = 1..=3)]
        inputs: Vec<PathBuf>,

        /// Compare every input against this file instead of against each other
        #[arg(short, long, value_name = "FILE")]
        reference: Option<PathBuf>,

        #[command(flatten)]
        tolerances: ToleranceArgs,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare document titles against a reference
    #[command(name = "compare-titles")]
    CompareTitles {
        /// Reference file
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Files to check (1 or 2)
        #[arg(value_name = "FILES", required = true, num_args = 1..=2)]
        candidates: Vec<PathBuf>,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct ToleranceArgs {
    /// Margin tolerance in points
    #[arg(long, default_value_t = 0.5)]
    margin_tolerance: f32,

    /// Font size tolerance in points
    #[arg(long, default_value_t = 0.2)]
    font_size_tolerance: f32,

    /// Indentation tolerance in points
    #[arg(long, default_value_t = 0.5)]
    indentation_tolerance: f32,

    /// Paragraph spacing tolerance in points
    #[arg(long, default_value_t = 0.5)]
    spacing_tolerance: f32,

    /// Line spacing tolerance in points
    #[arg(long, default_value_t = 0.5)]
    line_spacing_tolerance: f32,

    /// Unmatched values allowed between value sets
    #[arg(long, default_value_t = 0)]
    set_allowance: usize,
}

impl From<&ToleranceArgs> for CompareOptions {
    fn from(args: &ToleranceArgs) -> Self {
        CompareOptions::new()
            .with_margin_tolerance(args.margin_tolerance)
            .with_font_size_tolerance(args.font_size_tolerance)
            .with_indentation_tolerance(args.indentation_tolerance)
            .with_spacing_tolerance(args.spacing_tolerance)
            .with_line_spacing_tolerance(args.line_spacing_tolerance)
            .with_set_allowance(args.set_allowance)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let options = cli.parse.to_options();
    log::debug!("{:?}", options);

    let result = match cli.command {
        Commands::Parse {
            input,
            output,
            compact,
            no_images,
        } => cmd_parse(
            &input,
            output.as_deref(),
            compact,
            options.with_images(!no_images),
        ),
        Commands::Info { input } => cmd_info(&input, &options),
        Commands::Profile { input, json } => cmd_profile(&input, &options, json),
        Commands::CompareFormat {
            inputs,
            reference,
            tolerances,
            json,
        } => cmd_compare_format(
            &inputs,
            reference.as_deref(),
            &options,
            &CompareOptions::from(&tolerances),
            json,
        ),
        Commands::CompareTitles {
            reference,
            candidates,
            json,
        } => cmd_compare_titles(&reference, &candidates, &options, json),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn read_inputs(paths: &[&Path]) -> Result<Vec<DocumentInput>, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        pb.set_message(path.display().to_string());
        inputs.push(DocumentInput::from_path(path)?);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(inputs)
}

fn spinner(message: &'static str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn cmd_parse(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    options: ParseOptions,
) -> CliResult {
    let doc = docunify::parse_file_with_options(input, &options)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = render::to_json(&doc, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path, options: &ParseOptions) -> CliResult {
    let source = DocumentInput::from_path(input)?;
    let processed = docunify::process_document(&source.data, source.source_type, options)?;
    let doc = &processed.document;
    let metadata = doc.metadata();
    let extras = doc.extras();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), doc.source_type());
    println!("{}: {}", "MD5".bold(), docunify::content_hash(&source.data));
    if let Some(pages) = metadata.page_count {
        println!("{}: {}", "Pages".bold(), pages);
    }
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    println!(
        "{}: {}",
        "Text layer".bold(),
        if metadata.has_text_content { "Yes" } else { "No" }
    );

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let words = doc.text().full_text.split_whitespace().count();
    println!("{}: {}", "Words".bold(), words);
    println!("{}: {}", "Paragraphs".bold(), extras.paragraph_count());
    println!("{}: {}", "Sections".bold(), extras.section_count());
    println!("{}: {}", "Tables".bold(), extras.table_count());
    println!("{}: {}", "Images".bold(), extras.image_count());
    println!(
        "{}: {}",
        "OCR applied".bold(),
        if extras.ocr_applied() { "Yes" } else { "No" }
    );

    print_warnings(&processed.warnings);
    Ok(())
}

fn cmd_profile(input: &Path, options: &ParseOptions, json: bool) -> CliResult {
    let source = DocumentInput::from_path(input)?;
    let profile = docunify::profile_document(&source.data, source.source_type, options)?;

    if json {
        println!("{}", render::to_json(&profile, JsonFormat::Pretty)?);
        return Ok(());
    }

    let show = |values: &Option<Vec<f32>>| match values {
        Some(values) => values
            .iter()
            .map(|v| format!("{v}"))
            .collect::<Vec<_>>()
            .join(", "),
        None => "-".dimmed().to_string(),
    };
    let show_one = |value: Option<f32>| match value {
        Some(v) => format!("{v}"),
        None => "-".dimmed().to_string(),
    };

    println!("{}", "Formatting Profile".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: top {} / bottom {} / left {} / right {}",
        "Margins (pt)".bold(),
        show_one(profile.margins.top),
        show_one(profile.margins.bottom),
        show_one(profile.margins.left),
        show_one(profile.margins.right)
    );
    match &profile.fonts {
        Some(fonts) => println!(
            "{}: {}",
            "Fonts".bold(),
            fonts.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
        None => println!("{}: {}", "Fonts".bold(), "-".dimmed()),
    }
    println!("{}: {}", "Font sizes".bold(), show(&profile.font_sizes));
    println!("{}: {}", "Indent left".bold(), show(&profile.indentation.left));
    println!(
        "{}: {}",
        "Indent first line".bold(),
        show(&profile.indentation.first_line)
    );
    println!("{}: {}", "Space before".bold(), show(&profile.spacing.before));
    println!("{}: {}", "Space after".bold(), show(&profile.spacing.after));
    println!("{}: {}", "Line spacing".bold(), show(&profile.spacing.line));

    print_warnings(&profile.warnings);
    Ok(())
}

fn cmd_compare_format(
    inputs: &[PathBuf],
    reference: Option<&Path>,
    options: &ParseOptions,
    compare_options: &CompareOptions,
    json: bool,
) -> CliResult {
    let mut paths: Vec<&Path> = reference.into_iter().collect();
    paths.extend(inputs.iter().map(PathBuf::as_path));
    let mut documents = read_inputs(&paths)?;

    let pb = spinner("Comparing formatting...")?;
    if reference.is_some() {
        let reference = documents.remove(0);
        let result = docunify::compare_formats_against_reference(
            &reference,
            &documents,
            options,
            compare_options,
        );
        pb.finish_and_clear();
        let result = result?;
        if json {
            println!("{}", render::to_json(&result, JsonFormat::Pretty)?);
        } else {
            print_reference_comparison(&result);
        }
    } else {
        let result = docunify::compare_formats(&documents, options, compare_options);
        pb.finish_and_clear();
        let result = result?;
        if json {
            println!("{}", render::to_json(&result, JsonFormat::Pretty)?);
        } else {
            print_format_comparison(&result);
        }
    }

    Ok(())
}

fn print_format_comparison(result: &FormatComparison) {
    for doc in &result.documents {
        if let Some(ref error) = doc.error {
            println!("{} {}: {}", "✗".red(), doc.label.bold(), error);
        }
    }
    match &result.consistency {
        Some(report) => print_consistency(report),
        None => println!("{}", "Fewer than two documents parsed; nothing compared".yellow()),
    }
}

fn print_reference_comparison(result: &ReferenceFormatComparison) {
    for doc in &result.documents {
        if let Some(ref error) = doc.error {
            println!("{} {}: {}", "✗".red(), doc.label.bold(), error);
        }
    }
    let Some(ReferenceReport {
        reference,
        candidates,
        all_match,
    }) = &result.comparison
    else {
        println!("{}", "Reference or every candidate failed; nothing compared".yellow());
        return;
    };

    println!("{}: {}", "Reference".bold(), reference);
    for candidate in candidates {
        println!();
        println!("{}", candidate.label.cyan().bold());
        print_consistency(&candidate.report);
    }
    println!();
    print_verdict(*all_match);
}

fn print_consistency(report: &ConsistencyReport) {
    println!("{}", "Consistency".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (metric, result) in &report.metrics {
        let status = match result.outcome {
            MetricOutcome::Match => "match".green(),
            MetricOutcome::Mismatch => "mismatch".red(),
            MetricOutcome::PartiallyMissing => "partially missing".yellow(),
            MetricOutcome::Undeterminable => "undeterminable".yellow(),
        };
        println!("  {:<24} {}", metric.name(), status);
    }
    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
    for doc in &report.document_warnings {
        for warning in &doc.warnings {
            println!("  {} {}: {}", "!".yellow(), doc.label, warning);
        }
    }
    print_verdict(report.all_match);
}

fn print_verdict(all_match: bool) {
    if all_match {
        println!("{}", "All metrics match".green().bold());
    } else {
        println!("{}", "Formatting differs".red().bold());
    }
}

fn cmd_compare_titles(
    reference: &Path,
    candidates: &[PathBuf],
    options: &ParseOptions,
    json: bool,
) -> CliResult {
    let mut paths: Vec<&Path> = vec![reference];
    paths.extend(candidates.iter().map(PathBuf::as_path));
    let mut documents = read_inputs(&paths)?;
    let reference = documents.remove(0);

    let pb = spinner("Comparing titles...")?;
    let result = docunify::compare_document_titles(&reference, &documents, options);
    pb.finish_and_clear();
    let result = result?;

    if json {
        println!("{}", render::to_json(&result, JsonFormat::Pretty)?);
    } else {
        print_title_comparison(&result);
    }
    Ok(())
}

fn print_title_comparison(result: &TitleComparison) {
    let title = |t: &Option<String>| t.clone().unwrap_or_else(|| "(none)".to_string());

    println!(
        "{}: {} {}",
        "Reference".bold(),
        result.reference.label,
        title(&result.reference.title).dimmed()
    );
    for cell in &result.candidates {
        let mark = if cell.matches { "✓".green() } else { "✗".red() };
        println!("  {} {} {}", mark, cell.label, title(&cell.title).dimmed());
    }
    print_verdict(result.all_match());
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("{}", "Warnings".yellow().bold());
    for warning in warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
}

fn cmd_version() {
    println!("{} {}", "docunify".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document normalization and comparison tool");
    println!();
    println!("License: MIT");
}
