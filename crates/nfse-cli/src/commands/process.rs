//! Process command - render report documents for a batch of invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use nfse_core::{
    BatchProcessor, BatchReport, DirTemplateProvider, DocumentStatus, DocxRenderer, InputDocument,
    PackageOutcome, ZipArchiver,
};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input directory, XML file or glob pattern
    #[arg(required = true)]
    input: String,

    /// Client organization; selects the category rules and template folder
    #[arg(long)]
    client: String,

    /// Template library directory (overrides the configured one)
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Output archive (default: documentos_<client>.zip)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a summary CSV next to the archive
    #[arg(long)]
    summary: bool,
}

/// Input file that could not be read, with the I/O error.
struct Unreadable {
    name: String,
    error: String,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(templates) = &args.templates {
        config.templates.base_dir = templates.clone();
    }

    let Some(rules) = config.rule_table(&args.client) else {
        let known: Vec<&str> = config.clients.iter().map(|c| c.name.as_str()).collect();
        anyhow::bail!(
            "Unknown client: {} (configured clients: {})",
            args.client,
            known.join(", ")
        );
    };

    let template_dir = config.client_template_dir(&args.client);
    if !template_dir.is_dir() {
        warn!("Template directory {} does not exist", template_dir.display());
    }

    let files = collect_inputs(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No XML files found for: {}", args.input);
    }

    println!(
        "{} Processing {} files for {}",
        style("ℹ").blue(),
        files.len(),
        args.client.trim().to_uppercase()
    );

    let templates = DirTemplateProvider::new(&template_dir);
    let renderer = DocxRenderer::new();
    let processor = BatchProcessor::new(rules, &templates, &renderer);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut batch = BatchReport::default();
    let mut unreadable = Vec::new();

    for path in &files {
        let name = file_name(path);
        match fs::read(path) {
            Ok(bytes) => {
                let (report, documents) =
                    processor.process_document(&InputDocument::new(name, bytes));
                batch.push(report, documents);
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                unreadable.push(Unreadable {
                    name,
                    error: e.to_string(),
                });
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    batch.processing_time_ms = start.elapsed().as_millis() as u64;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.archive_name(&args.client)));

    if args.summary {
        let summary_path = output_path.with_file_name("summary.csv");
        write_summary(&summary_path, &batch, &unreadable)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let outcome = batch
        .package(&ZipArchiver::new())
        .context("Failed to build the archive")?;

    match outcome {
        PackageOutcome::Bundle(bytes) => {
            if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output_path, bytes)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            debug!("Wrote archive to {}", output_path.display());

            println!(
                "{} Generated {} documents in {} ms",
                style("✓").green(),
                batch.documents.len(),
                batch.processing_time_ms
            );
            for document in &batch.documents {
                println!("  - {}", document.name);
            }
            println!(
                "{} Archive written to {}",
                style("✓").green(),
                output_path.display()
            );
        }
        PackageOutcome::NothingProcessed => {
            println!(
                "{} Nothing processed: no documents were generated",
                style("⚠").yellow()
            );
        }
    }

    print_skips(&batch, &unreadable);

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice.xml")
        .to_string()
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Expand a directory, file or glob pattern into sorted XML file paths.
fn collect_inputs(input: &str) -> anyhow::Result<Vec<PathBuf>> {
    let path = Path::new(input);
    let pattern = if path.is_dir() {
        path.join("*").to_string_lossy().into_owned()
    } else {
        input.to_string()
    };

    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_xml(p))
        .collect();
    files.sort();

    Ok(files)
}

fn print_skips(batch: &BatchReport, unreadable: &[Unreadable]) {
    let skips: Vec<_> = batch.skips().collect();
    if skips.is_empty() && unreadable.is_empty() {
        return;
    }

    println!();
    println!("{}", style("Skipped:").yellow());
    for file in unreadable {
        println!("  - {}: {}", file.name, style(&file.error).red());
    }
    for (name, reason) in skips {
        if reason.is_failure() {
            println!("  - {}: {}", name, style(reason).red());
        } else {
            println!("  - {}: {}", name, reason);
        }
    }
}

/// One row per input file, unreadable files included.
fn write_summary(
    path: &Path,
    batch: &BatchReport,
    unreadable: &[Unreadable],
) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["filename", "status", "category", "outputs", "reason", "warnings"])?;

    for report in &batch.reports {
        let role_reasons: Vec<String> = report.role_skips.iter().map(|s| s.to_string()).collect();
        let warnings = report.warnings.join("; ");

        match &report.status {
            DocumentStatus::Rendered { category, outputs } => {
                wtr.write_record([
                    report.name.as_str(),
                    "rendered",
                    category.as_str(),
                    &outputs.join(";"),
                    &role_reasons.join("; "),
                    &warnings,
                ])?;
            }
            DocumentStatus::Skipped { reason } => {
                wtr.write_record([
                    report.name.as_str(),
                    if reason.is_failure() { "error" } else { "skipped" },
                    "",
                    "",
                    &reason.to_string(),
                    &warnings,
                ])?;
            }
        }
    }

    for file in unreadable {
        wtr.write_record([
            file.name.as_str(),
            "error",
            "",
            "",
            &format!("unreadable: {}", file.error),
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
