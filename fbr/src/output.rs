//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use fbr_core::{BackupOutcome, Digest, RenameOutcome, RotationReport, backup_path};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `text_fn` closure is called only in text mode.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// One successful rename during rotation.
#[derive(Debug, Clone, Serialize)]
pub struct RotatedInfo {
    pub from: String,
    pub to: String,
}

/// Output for `once` command.
#[derive(Debug, Serialize)]
pub struct OnceOutput {
    pub success: bool,
    pub result_code: u8,
    pub file: String,
    pub backed_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    pub rotated: Vec<RotatedInfo>,
    pub pruned: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OnceOutput {
    pub fn from_outcome(file: &Path, outcome: &BackupOutcome) -> Self {
        let mut output = Self {
            success: true,
            result_code: 0,
            file: file.display().to_string(),
            backed_up: false,
            backup: None,
            bytes: None,
            rotated: Vec::new(),
            pruned: Vec::new(),
            reason: None,
        };
        match outcome {
            BackupOutcome::Created {
                backup,
                bytes,
                rotation,
                pruned,
            } => {
                output.backed_up = true;
                output.backup = Some(backup.display().to_string());
                output.bytes = Some(*bytes);
                output.rotated = rotated(file, rotation);
                output.pruned = pruned.iter().map(|p| p.display().to_string()).collect();
            }
            BackupOutcome::Skipped { reason } => {
                output.reason = Some(reason.to_string());
            }
        }
        output
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for path in &self.pruned {
            text.push_str(&format!("Pruned {}\n", path));
        }
        for info in &self.rotated {
            text.push_str(&format!("Rotated {} -> {}\n", info.from, info.to));
        }
        match (&self.backup, self.bytes, &self.reason) {
            (Some(backup), Some(bytes), _) => {
                text.push_str(&format!("Backed up {} to {} ({} bytes)\n", self.file, backup, bytes));
            }
            (_, _, Some(reason)) => {
                text.push_str(&format!("Backup not needed: {}\n", reason));
            }
            _ => {}
        }
        text
    }
}

fn rotated(file: &Path, rotation: &RotationReport) -> Vec<RotatedInfo> {
    rotation
        .steps
        .iter()
        .filter(|step| step.outcome == RenameOutcome::Renamed)
        .map(|step| RotatedInfo {
            from: backup_path(file, step.index).display().to_string(),
            to: backup_path(file, step.index + 1).display().to_string(),
        })
        .collect()
}

/// Chain entry information for `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct ChainEntryInfo {
    pub index: usize,
    pub path: String,
    pub size: u64,
    pub modified: String,
    pub matches_live: bool,
    pub stale: bool,
}

/// Output for `status` command.
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub success: bool,
    pub result_code: u8,
    pub file: String,
    pub algorithm: String,
    pub max_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_digest: Option<Digest>,
    pub entries: Vec<ChainEntryInfo>,
}

impl StatusOutput {
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        match &self.live_digest {
            Some(digest) => text.push_str(&format!("{} {} {}\n", self.algorithm, digest, self.file)),
            None => text.push_str(&format!("{} (missing)\n", self.file)),
        }
        if self.entries.is_empty() {
            text.push_str("No backups\n");
        }
        for entry in &self.entries {
            let mut flags = Vec::new();
            if entry.matches_live {
                flags.push("current");
            }
            if entry.stale {
                flags.push("stale");
            }
            text.push_str(&format!(
                "{:>3} {:>10} {} {}{}\n",
                entry.index,
                entry.size,
                entry.modified,
                entry.path,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            ));
        }
        text
    }
}

/// Output for `hash` command.
#[derive(Debug, Serialize)]
pub struct HashOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub algorithm: String,
    pub digest: Digest,
}
