//! Trip command - replay recorded GPS fixes into a mileage log.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use tally_core::mileage::MileageRateTable;
use tally_core::models::config::TallyConfig;
use tally_core::{
    DetectionSession, FixOutcome, GpsFix, LocationPermission, MemoryTripStore, MileageTrip,
    TripPurpose,
};

use super::config::load_config;

/// Arguments for the trip command.
#[derive(Args)]
pub struct TripArgs {
    /// Recorded fixes (.csv with latitude,longitude,timestamp[,speed] or a .json array)
    #[arg(required = true)]
    input: PathBuf,

    /// Purpose for detected trips (business or personal)
    #[arg(short, long)]
    purpose: Option<TripPurpose>,

    /// Start a trip at the first fix instead of waiting for motion
    #[arg(long)]
    manual: bool,

    /// End a trip after this many seconds without motion
    #[arg(long)]
    stop_after: Option<u64>,

    /// User the trips belong to
    #[arg(long, default_value = "me")]
    user: String,

    /// Profile the trips are logged under
    #[arg(long, default_value = "default")]
    profile: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: LogFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// CSV mileage log
    Csv,
    /// JSON array
    Json,
    /// Plain text table
    Text,
}

/// How recorded fixes are turned into trips.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub user: String,
    pub profile: String,
    pub purpose: Option<TripPurpose>,
    pub manual: bool,
    pub stop_after_secs: Option<u64>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            user: "me".to_string(),
            profile: "default".to_string(),
            purpose: None,
            manual: false,
            stop_after_secs: None,
        }
    }
}

/// One line of the mileage log.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub purpose: TripPurpose,
    pub start_time: String,
    pub end_time: String,
    pub distance_miles: f64,
    pub duration_minutes: i64,
    pub auto_started: bool,
    pub rate_per_mile: Option<Decimal>,
    pub reimbursement: Decimal,
}

impl LogEntry {
    pub fn new(trip: &MileageTrip, rates: &MileageRateTable) -> Self {
        Self {
            id: trip.id,
            purpose: trip.purpose,
            start_time: trip.start_time.to_rfc3339(),
            end_time: trip.end_time.map(|t| t.to_rfc3339()).unwrap_or_default(),
            distance_miles: (trip.distance_miles * 100.0).round() / 100.0,
            duration_minutes: trip.duration().map(|d| d.num_minutes()).unwrap_or(0),
            auto_started: trip.auto_started,
            rate_per_mile: rates.rate_on(trip.start_time.date_naive()),
            reimbursement: rates.reimbursement_for(trip),
        }
    }
}

pub async fn run(args: TripArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let fixes = read_fixes(&args.input)?;
    info!("Replaying {} fixes from {}", fixes.len(), args.input.display());

    let options = ReplayOptions {
        user: args.user,
        profile: args.profile,
        purpose: args.purpose,
        manual: args.manual,
        stop_after_secs: args.stop_after,
    };
    let trips = replay(&fixes, &config, &options)?;

    let rates = config.mileage.rate_table();
    let entries: Vec<LogEntry> = trips.iter().map(|t| LogEntry::new(t, &rates)).collect();

    let output = match args.format {
        LogFormat::Csv => format_csv(&entries)?,
        LogFormat::Json => serde_json::to_string_pretty(&entries)?,
        LogFormat::Text => format_text(&entries),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Mileage log written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    if entries.is_empty() {
        eprintln!("{} No trips detected", style("ℹ").blue());
    }

    Ok(())
}

/// Load fixes from CSV (with a header row) or a JSON array.
pub fn read_fixes(path: &Path) -> anyhow::Result<Vec<GpsFix>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "json" => {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        "csv" => {
            let mut reader = csv::Reader::from_path(path)?;
            let mut fixes = Vec::new();
            for (i, row) in reader.deserialize().enumerate() {
                let fix: GpsFix =
                    row.map_err(|e| anyhow::anyhow!("Row {}: {}", i + 1, e))?;
                fixes.push(fix);
            }
            Ok(fixes)
        }
        _ => anyhow::bail!("Unsupported fix log format: {}", ext),
    }
}

/// Run fixes through a detection session and return the trips it logged.
pub fn replay(
    fixes: &[GpsFix],
    config: &TallyConfig,
    options: &ReplayOptions,
) -> anyhow::Result<Vec<MileageTrip>> {
    let mut detector_config = config.detector.clone();
    if let Some(purpose) = options.purpose {
        detector_config.auto_start_purpose = purpose;
    }

    let mut session = DetectionSession::new(
        MemoryTripStore::new(),
        options.user.clone(),
        options.profile.clone(),
        LocationPermission::Granted,
        &detector_config,
    );

    if options.manual {
        if let Some(first) = fixes.first() {
            session.start_manual_trip(detector_config.auto_start_purpose, fix_time(first, 1)?)?;
        }
    }

    let stop_after_ms = options
        .stop_after_secs
        .map(|s| i64::try_from(s).unwrap_or(i64::MAX).saturating_mul(1000));
    let mut still_since: Option<i64> = None;

    for (i, fix) in fixes.iter().enumerate() {
        let outcome = session
            .on_fix(fix)
            .map_err(|e| anyhow::anyhow!("Fix {}: {}", i + 1, e))?;

        match outcome {
            FixOutcome::AutoStarted(trip) => {
                debug!("Fix {} started trip {}", i + 1, trip.id);
                still_since = None;
            }
            FixOutcome::Tracking { trip_id, .. } => {
                let Some(limit) = stop_after_ms else { continue };
                if session.detector().consecutive_moving_samples() > 0 {
                    still_since = None;
                    continue;
                }
                let since = *still_since.get_or_insert(fix.timestamp_ms);
                if fix.timestamp_ms.saturating_sub(since) >= limit {
                    debug!("Trip {} stopped moving at fix {}", trip_id, i + 1);
                    session.end_trip(fix_time(fix, i + 1)?)?;
                    still_since = None;
                }
            }
            _ => {}
        }
    }

    if session.detector().trip_id().is_some() {
        if let Some(last) = fixes.last() {
            session.end_trip(fix_time(last, fixes.len())?)?;
        }
    }

    Ok(session.into_store().trips()?)
}

fn fix_time(fix: &GpsFix, index: usize) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    fix.time()
        .ok_or_else(|| anyhow::anyhow!("Fix {}: invalid timestamp {}", index, fix.timestamp_ms))
}

fn format_csv(entries: &[LogEntry]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for entry in entries {
        wtr.serialize(entry)?;
    }
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(entries: &[LogEntry]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:>3}  {:<9} {:<25} {:>8} {:>6} {:>10}\n",
        "#", "Purpose", "Start", "Miles", "Min", "Reimb."
    ));

    let mut business_miles = 0.0;
    let mut total = Decimal::ZERO;
    for entry in entries {
        output.push_str(&format!(
            "{:>3}  {:<9} {:<25} {:>8.2} {:>6} {:>10}\n",
            entry.id,
            entry.purpose.as_str(),
            entry.start_time,
            entry.distance_miles,
            entry.duration_minutes,
            format!("${}", entry.reimbursement),
        ));
        if entry.purpose == TripPurpose::Business {
            business_miles += entry.distance_miles;
        }
        total += entry.reimbursement;
    }

    output.push_str(&format!(
        "\n{} trips, {:.2} business miles, ${} reimbursable\n",
        entries.len(),
        business_miles,
        total
    ));

    output
}
