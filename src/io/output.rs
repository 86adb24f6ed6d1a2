use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::is_stdio;
use crate::models::LogEntry;

/// Write text to a file, or to stdout when the path is `-`
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if is_stdio(path) {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes()).context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
        return Ok(());
    }

    std::fs::write(path, text).with_context(|| format!("Failed to write file: {:?}", path))
}

/// Serialize a value as pretty JSON to a file or stdout
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    write_text(path, &json)
}

/// One line per log entry, for terminal summaries
pub fn format_log(log: &[LogEntry]) -> String {
    let mut output = String::new();

    for (i, entry) in log.iter().enumerate() {
        output.push_str(&format!("{:>2}. {}\n", i + 1, describe_entry(entry)));
    }

    output
}

fn describe_entry(entry: &LogEntry) -> String {
    match entry {
        LogEntry::Configuration {
            target_roles,
            enable_safeguard,
            validate_only,
        } => format!(
            "configuration: roles {}, safeguard {}, validate-only {}",
            target_roles.describe(),
            on_off(*enable_safeguard),
            on_off(*validate_only)
        ),
        LogEntry::LabelAnalysis {
            all_labels,
            non_target_labels,
            ..
        } => format!(
            "label analysis: {} labels [{}], {} to map",
            all_labels.len(),
            all_labels.join(", "),
            non_target_labels.len()
        ),
        LogEntry::MappingRequest { labels_to_map, .. } => {
            format!("mapping request: [{}]", labels_to_map.join(", "))
        }
        LogEntry::MappingDecision { mapping } => format!(
            "mapping: {}",
            mapping
                .iter()
                .map(|(tag, role)| format!("{} -> {}", tag, role))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        LogEntry::LabelReplacement {
            lines_rewritten, ..
        } => format!("label replacement: {} lines rewritten", lines_rewritten),
        LogEntry::SafeguardStart { max_iterations, .. } => {
            format!("safeguard start: up to {} rounds", max_iterations)
        }
        LogEntry::SafeguardIteration {
            iteration,
            tool_calls,
        } => format!("safeguard round {}: {} tool calls", iteration, tool_calls),
        LogEntry::UtteranceCorrected { record, .. } => format!(
            "corrected line {}: {} -> {}",
            record.line_index.map(|i| i + 1).unwrap_or(0),
            record.attempted_role_from,
            record.attempted_role_to
        ),
        LogEntry::UtteranceCorrectionFailed { record, reason, .. } => format!(
            "correction failed for {:?} ({} -> {}): {}",
            record.utterance_prefix,
            record.attempted_role_from,
            record.attempted_role_to,
            reason.describe()
        ),
        LogEntry::SafeguardAborted {
            error,
            discarded_corrections,
        } => format!(
            "safeguard aborted ({} corrections discarded): {}",
            discarded_corrections.len(),
            error
        ),
        LogEntry::SafeguardEnd {
            total_corrections,
            iterations,
            converged,
            ..
        } => format!(
            "safeguard end: {} corrections in {} rounds{}",
            total_corrections,
            iterations,
            if *converged { "" } else { " (not converged)" }
        ),
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoleMapping, TargetRoles};

    #[test]
    fn test_format_log() {
        let log = vec![
            LogEntry::Configuration {
                target_roles: TargetRoles::default(),
                enable_safeguard: true,
                validate_only: false,
            },
            LogEntry::MappingDecision {
                mapping: [("Speaker 0", "Agent")].into_iter().collect::<RoleMapping>(),
            },
            LogEntry::SafeguardEnd {
                corrections_made: vec![],
                total_corrections: 0,
                iterations: 3,
                converged: false,
            },
        ];

        assert_eq!(
            format_log(&log),
            " 1. configuration: roles Agent and Customer, safeguard on, validate-only off\n \
             2. mapping: Speaker 0 -> Agent\n \
             3. safeguard end: 0 corrections in 3 rounds (not converged)\n"
        );
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        let log = vec![LogEntry::SafeguardAborted {
            error: "bad tool call".to_string(),
            discarded_corrections: vec![],
        }];

        write_json(&path, &log).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["step"], "safeguard_aborted");
        assert_eq!(written[0]["error"], "bad tool call");
    }

    #[test]
    fn test_write_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_text(&path, "Agent: Hello\nCustomer: Hi").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Agent: Hello\nCustomer: Hi");
    }
}
