//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use invex_core::{InvoicePipeline, ParsedInvoice, TextSource};

use super::load_config;
use super::process::OutputFormat;
use crate::report::Report;

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Template directory (overrides config)
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    invoice: Option<ParsedInvoice>,
    error: Option<String>,
    processing_time_ms: u64,
    processed_at: DateTime<Local>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dir) = &args.templates {
        config.templates.dir = dir.clone();
    }

    let files = expand_inputs(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pipeline = InvoicePipeline::from_config(&config);

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let file_start = Instant::now();
        let result = pipeline.parse_file(&path);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;
        let processed_at = Local::now();

        match result {
            Ok(invoice) => results.push(ProcessResult {
                path,
                invoice: Some(invoice),
                error: None,
                processing_time_ms,
                processed_at,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                results.push(ProcessResult {
                    path,
                    invoice: None,
                    error: Some(error_msg),
                    processing_time_ms,
                    processed_at,
                });
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            if let Some(invoice) = &result.invoice {
                write_output(output_dir, &result.path, invoice, args.format)?;
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Expand a glob pattern to supported document files, in path order.
fn expand_inputs(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_output(
    output_dir: &Path,
    input: &Path,
    invoice: &ParsedInvoice,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");

    let filename = file_label(input);
    let report = Report::new(&filename, invoice);
    let (extension, content) = match format {
        OutputFormat::Json => ("json", report.to_json(true)?),
        OutputFormat::Csv => ("csv", report.to_csv()?),
        OutputFormat::Text => ("txt", report.to_text()),
    };

    let output_path = output_dir.join(format!("{}.{}", stem, extension));
    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "template",
        "source",
        "fields_found",
        "fields_total",
        "processing_time_ms",
        "processed_at",
        "error",
    ])?;

    for result in results {
        let filename = file_label(&result.path);
        let time_ms = result.processing_time_ms.to_string();
        let processed_at = result.processed_at.to_rfc3339();

        if let Some(invoice) = &result.invoice {
            let source = match invoice.source {
                TextSource::TextLayer => "text_layer",
                TextSource::Ocr => "ocr",
            };
            let found = invoice.extracted.found().to_string();
            let total = invoice.extracted.len().to_string();
            wtr.write_record([
                filename.as_str(),
                "success",
                invoice.template.as_str(),
                source,
                found.as_str(),
                total.as_str(),
                time_ms.as_str(),
                processed_at.as_str(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename.as_str(),
                "error",
                "",
                "",
                "",
                "",
                time_ms.as_str(),
                processed_at.as_str(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_document_extensions_are_supported() {
        assert!(is_supported(Path::new("a/INVOICE.PDF")));
        assert!(is_supported(Path::new("scan.jpeg")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn expand_inputs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.pdf", "c.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let pattern = format!("{}/*", dir.path().display());
        let files = expand_inputs(&pattern).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_label(p)).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
    }

    #[test]
    fn summary_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let results = vec![ProcessResult {
            path: PathBuf::from("broken.pdf"),
            invoice: None,
            error: Some("could not extract any text from the document".to_string()),
            processing_time_ms: 3,
            processed_at: Local::now(),
        }];

        write_summary(&path, &results).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("filename,status,template"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("broken.pdf,error,,,,,3,"));
        assert!(row.ends_with("could not extract any text from the document"));
    }
}
