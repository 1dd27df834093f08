//! Inspect command - show the fields extracted from one invoice.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use nfse_core::{InvoiceParser, InvoiceRecord, NfseParser, classify};

use super::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Invoice XML file
    #[arg(required = true)]
    file: PathBuf,

    /// Also classify the invoice with this client's rules
    #[arg(long)]
    client: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

#[derive(Serialize)]
struct Inspection<'a> {
    fields: &'a InvoiceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    warnings: &'a [String],
    processing_time_ms: u64,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Input file not found: {}", args.file.display());
    }

    let config = load_config(config_path)?;
    let rules = match &args.client {
        Some(client) => Some(
            config
                .rule_table(client)
                .ok_or_else(|| anyhow::anyhow!("Unknown client: {}", client))?,
        ),
        None => None,
    };

    info!("Inspecting {}", args.file.display());

    let bytes = fs::read(&args.file)?;
    let extraction = NfseParser::new().parse(&bytes)?;
    let category = rules.and_then(|r| classify(&extraction.record, r));

    let inspection = Inspection {
        fields: &extraction.record,
        category,
        warnings: &extraction.warnings,
        processing_time_ms: extraction.processing_time_ms,
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inspection)?),
        OutputFormat::Text => print_text(&inspection, args.client.is_some()),
    }

    Ok(())
}

fn print_text(inspection: &Inspection<'_>, classified: bool) {
    let record = inspection.fields;

    println!("{}", style("Invoice").bold());
    println!("  Number:       {}", record.invoice_number);
    println!("  Issue date:   {}", record.issue_date);
    println!("  Amount:       {}", record.gross_amount);
    println!("  In words:     {}", record.amount_in_words);
    println!("  Competency:   {}", record.competency_period);
    println!("  Quantity:     {}", record.quantity);
    println!("  Description:  {}", record.service_description);

    if classified {
        match inspection.category {
            Some(category) => println!("  Category:     {}", style(category).green()),
            None => println!("  Category:     {}", style("no match").yellow()),
        }
    }

    for warning in inspection.warnings {
        println!("{} {}", style("⚠").yellow(), warning);
    }

    println!();
    println!("Extracted in {} ms", inspection.processing_time_ms);
}
