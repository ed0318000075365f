use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use super::IntakeCommands;
use crate::config::LeadConfig;
use crate::models::LeadSource;
use crate::pipeline::{IntakeReport, ItemOutcome, Pipeline, RawLead};
use crate::sources;

/// A row from a CSV import file.
///
/// Headers: `name,email,phone,campaign`. Empty strings are converted to
/// `None` for the optional fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub campaign: Option<String>,
}

impl From<ImportRow> for RawLead {
    fn from(row: ImportRow) -> Self {
        RawLead {
            name: row.name,
            email: row.email,
            phone: row.phone,
            campaign: row.campaign,
        }
    }
}

/// Deserialize empty strings as None.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Execute an intake subcommand.
pub fn run_intake(pipeline: &Pipeline, config: &LeadConfig, command: IntakeCommands) -> Result<()> {
    match command {
        IntakeCommands::Import {
            file,
            source,
            dry_run,
        } => run_import(pipeline, &file, LeadSource::parse(&source), dry_run),
        IntakeCommands::Poll { source } => {
            let platform = sources::platform_for(LeadSource::parse(&source), config)?;
            let report = sources::poll(pipeline, platform.as_ref())
                .with_context(|| format!("Polling {} failed", source))?;
            print_report(&report, None);
            Ok(())
        }
    }
}

fn run_import(pipeline: &Pipeline, file: &str, source: LeadSource, dry_run: bool) -> Result<()> {
    let path = Path::new(file);
    if !path.exists() {
        bail!("File not found: {}", file);
    }
    let reader = File::open(path).context("Failed to open CSV file")?;

    let (rows, parse_errors) = read_rows(reader);
    for (line, err) in &parse_errors {
        eprintln!("Line {}: parse error: {}", line, err);
    }

    if dry_run {
        eprintln!("Dry run: {}", file);
        let mut valid = 0;
        for (idx, raw) in rows.iter().enumerate() {
            match raw.to_lead(source) {
                Ok(_) => valid += 1,
                Err(e) => eprintln!("Row {}: {}", idx + 1, e),
            }
        }
        println!(
            "\nWould ingest {} of {} rows ({} parse errors)",
            valid,
            rows.len(),
            parse_errors.len()
        );
        return Ok(());
    }

    eprintln!("Importing: {}", file);
    let report = pipeline.ingest_batch(&rows, source);
    print_report(&report, Some(parse_errors.len()));
    Ok(())
}

/// Deserialize every row, collecting parse errors by CSV line number.
fn read_rows<R: Read>(reader: R) -> (Vec<RawLead>, Vec<(usize, String)>) {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, result) in csv_reader.deserialize::<ImportRow>().enumerate() {
        // 1-indexed, after the header
        let line = idx + 2;
        match result {
            Ok(row) => rows.push(row.into()),
            Err(e) => errors.push((line, e.to_string())),
        }
    }
    (rows, errors)
}

fn print_report(report: &IntakeReport, parse_errors: Option<usize>) {
    for (idx, item) in report.items.iter().enumerate() {
        match item {
            ItemOutcome::InvalidPayload { error } => eprintln!("Item {}: invalid: {}", idx + 1, error),
            ItemOutcome::Failed { error, retryable } => eprintln!(
                "Item {}: failed{}: {}",
                idx + 1,
                if *retryable { " (retryable)" } else { "" },
                error
            ),
            _ => {}
        }
    }

    println!("\nProcessed {} lead(s)", report.processed);
    println!("  Created:    {}", report.created);
    if report.duplicates > 0 {
        println!("  Duplicates: {}", report.duplicates);
    }
    if report.invalid > 0 {
        println!("  Invalid:    {}", report.invalid);
    }
    if report.failed > 0 {
        println!("  Failed:     {}", report.failed);
    }
    if let Some(n) = parse_errors.filter(|n| *n > 0) {
        println!("  Unreadable: {}", n);
    }
}
