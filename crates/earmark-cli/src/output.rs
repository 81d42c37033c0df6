//! Output formatting for CLI

use std::path::Path;

use earmark_core::{FingerprintDocument, IngestOutcome, MatchReport};
use serde::Serialize;
use serde_json::json;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Render a query report
pub fn format_match(report: &MatchReport, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => match (&report.song_name, report.is_match) {
            (Some(name), true) => format!(
                "Match Found: {}\nSimilarity Score: {:.2}%",
                name, report.debug_info.similarity_percent
            ),
            _ => "No match found with sufficient confidence.".to_string(),
        },
    }
}

/// Render ingest outcomes, one line per identity
pub fn format_ingest(outcomes: &[(String, IngestOutcome)], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = outcomes
                .iter()
                .map(|(identity, outcome)| json!({ "identity": identity, "outcome": outcome }))
                .collect();
            to_json(&entries)
        }
        OutputFormat::Text => {
            if outcomes.is_empty() {
                return "No songs ingested.".to_string();
            }
            outcomes
                .iter()
                .map(|(identity, outcome)| match outcome {
                    IngestOutcome::Stored => format!("Added fingerprint for {identity}"),
                    IngestOutcome::AlreadyExists => {
                        format!("Song {identity} already exists, skipped")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Render a fingerprint export summary
pub fn format_document(
    document: &FingerprintDocument,
    path: &Path,
    format: &OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => to_json(&json!({
            "output": path.display().to_string(),
            "hashes": document.fingerprints.len(),
            "duration": document.duration,
            "timestamp": document.timestamp,
        })),
        OutputFormat::Text => format!(
            "Wrote {} hashes ({:.2}s of audio) to {}",
            document.fingerprints.len(),
            document.duration,
            path.display()
        ),
    }
}

/// Render catalog identities
pub fn format_list(identities: &[String], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&identities),
        OutputFormat::Text if identities.is_empty() => "Catalog is empty.".to_string(),
        OutputFormat::Text => identities.join("\n"),
    }
}
