//! Parse command - extract expense fields from a single receipt.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use tally_core::models::config::TallyConfig;
use tally_core::receipt::rules::format_amount;
use tally_core::{
    Categorizer, Confidence, PureOcrEngine, ReceiptParseResult, ReceiptTextParser, scan_receipt,
};

use super::config::load_config;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Receipt file: recognized text (.txt) or an image
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// OCR model directory (overrides config)
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Show per-field confidence
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

/// A parsed receipt with its suggested expense category.
#[derive(Debug, Serialize)]
pub struct ReceiptReport {
    #[serde(flatten)]
    pub receipt: ReceiptParseResult,
    pub category: String,
    pub needs_review: bool,
}

impl ReceiptReport {
    pub fn new(receipt: ReceiptParseResult, categorizer: &Categorizer) -> Self {
        let category = categorizer.categorize(receipt.merchant.as_deref()).category;
        let needs_review = receipt.needs_review();
        Self {
            receipt,
            category,
            needs_review,
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "tiff", "tif", "bmp"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];

/// File types the receipt readers understand.
pub fn is_supported(path: &Path) -> bool {
    let ext = extension(path);
    IMAGE_EXTENSIONS.contains(&ext.as_str()) || TEXT_EXTENSIONS.contains(&ext.as_str())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Parsing receipt: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Reading receipt...");

    let parser = ReceiptTextParser::from_config(&config.receipt);
    let receipt = read_receipt(&args.input, &parser, &config, args.model_dir.as_deref());
    pb.finish_and_clear();
    let receipt = receipt?;

    let categorizer = Categorizer::from_config(&config.categories);
    let report = ReceiptReport::new(receipt, &categorizer);

    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        print_confidence(&report.receipt);
    }

    if report.receipt.is_empty() {
        eprintln!("{} No receipt fields recognized", style("⚠").yellow());
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read a receipt from text or, for images, through OCR.
pub fn read_receipt(
    path: &Path,
    parser: &ReceiptTextParser,
    config: &TallyConfig,
    model_dir: Option<&Path>,
) -> anyhow::Result<ReceiptParseResult> {
    let ext = extension(path);

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        let text = fs::read_to_string(path)?;
        return Ok(parser.parse(&text));
    }

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        let image = image::open(path)?;

        let mut ocr_config = config.ocr.clone();
        if let Some(dir) = model_dir {
            ocr_config.model_dir = dir.to_path_buf();
        }
        let engine = PureOcrEngine::from_config(&ocr_config).map_err(|e| {
            anyhow::anyhow!(
                "{}\n\nSet 'ocr.model_dir' with 'tally config set' or pass --model-dir.",
                e
            )
        })?;

        let receipt = scan_receipt(&engine, parser, &image)?;
        if receipt.raw_text.trim().is_empty() {
            anyhow::bail!("No text detected in image");
        }
        return Ok(receipt);
    }

    anyhow::bail!("Unsupported file format: {}", ext)
}

pub fn format_report(report: &ReceiptReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

fn format_csv(report: &ReceiptReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let receipt = &report.receipt;
    let amount = |value: Option<rust_decimal::Decimal>| value.map(|v| v.to_string()).unwrap_or_default();

    wtr.write_record([
        "merchant",
        "date",
        "subtotal",
        "tax",
        "tip",
        "total",
        "category",
        "needs_review",
    ])?;

    wtr.write_record([
        receipt.merchant.clone().unwrap_or_default(),
        receipt.date_string().unwrap_or_default(),
        amount(receipt.subtotal),
        amount(receipt.tax),
        amount(receipt.tip),
        amount(receipt.total),
        report.category.clone(),
        report.needs_review.to_string(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ReceiptReport) -> String {
    let receipt = &report.receipt;
    let mut output = String::new();

    output.push_str(&format!(
        "Merchant: {}\n",
        receipt.merchant.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Date:     {}\n",
        receipt.date_string().as_deref().unwrap_or("-")
    ));
    output.push_str(&format!("Category: {}\n", report.category));
    output.push('\n');

    for (label, value) in [
        ("Subtotal", receipt.subtotal),
        ("Tax", receipt.tax),
        ("Tip", receipt.tip),
        ("Total", receipt.total),
    ] {
        if let Some(value) = value {
            output.push_str(&format!("  {:<9} ${}\n", label, format_amount(value)));
        }
    }

    if report.needs_review {
        output.push_str("\nPlease review before saving.\n");
    }

    output
}

fn print_confidence(receipt: &ReceiptParseResult) {
    let c = &receipt.confidence;
    println!("{}", style("Field confidence").bold());
    for (field, level) in [
        ("merchant", c.merchant),
        ("date", c.date),
        ("subtotal", c.subtotal),
        ("tax", c.tax),
        ("tip", c.tip),
        ("total", c.total),
    ] {
        let label = match level {
            Confidence::High => style(level.as_str()).green(),
            Confidence::Medium => style(level.as_str()).cyan(),
            Confidence::Low => style(level.as_str()).yellow(),
            Confidence::None => style(level.as_str()).dim(),
        };
        println!("  {:<9} {}", field, label);
    }
}
