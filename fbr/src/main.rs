mod config;
mod logging;
mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use config::{FileConfig, Overrides, Settings};
use fbr_core::{Algorithm, BackupChain, Digest, Rotator, TracingSink};
use output::{ChainEntryInfo, HashOutput, OnceOutput, OutputWriter, StatusOutput};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Back up a file when it has changed and rotate the backups
#[derive(Parser)]
#[command(name = "file-backup-rotate")]
#[command(about = "Back up a file when it has changed and rotate the backups", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/file-backup-rotate.yaml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hash algorithm: sha256 or blake3
    #[arg(long, global = true, env = "FBR_ALGORITHM")]
    algorithm: Option<String>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log chunk counts and digests
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// File to back up
    #[arg(short, long, env = "FBR_FILE")]
    file: Option<PathBuf>,

    /// Maximum backup number: <file>.<max>
    #[arg(short, long, env = "FBR_MAX")]
    max: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up the file if it changed, rotating older backups
    Once {
        #[command(flatten)]
        target: TargetArgs,

        /// Write the new backup to a temp file and rename it into place
        #[arg(long)]
        atomic: bool,

        /// Delete backups numbered above --max
        #[arg(long)]
        prune: bool,
    },

    /// List the existing backups of the file
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the digest of a file
    Hash {
        /// File to hash
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);

    // Config is loaded first so its `verbose` setting reaches the log filter.
    let loaded = FileConfig::load(cli.config.as_deref()).and_then(|(config, path)| {
        logging::init_logging(config.verbose(cli.verbose))?;
        Ok((config, path))
    });
    let (config, config_path) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            output.write_error(&e, 1);
            return ExitCode::from(1);
        }
    };
    if let Some(path) = &config_path {
        tracing::debug!(target: "fbr", "using config file {}", path.display());
    }

    match run(cli, &config, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.write_error(&e, 1);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli, config: &FileConfig, output: &OutputWriter) -> Result<()> {
    match cli.command {
        Commands::Once {
            target,
            atomic,
            prune,
        } => {
            let settings = Settings::resolve(
                Overrides {
                    file: target.file,
                    max_count: target.max,
                    algorithm: cli.algorithm,
                    verbose: cli.verbose,
                    atomic,
                    prune,
                },
                config,
            )?;
            cmd_once(&settings, output)
        }
        Commands::Status { target } => {
            let settings = Settings::resolve(
                Overrides {
                    file: target.file,
                    max_count: target.max,
                    algorithm: cli.algorithm,
                    verbose: cli.verbose,
                    ..Overrides::default()
                },
                config,
            )?;
            cmd_status(&settings, output)
        }
        Commands::Hash { path } => {
            let algorithm = match cli.algorithm.as_deref().or(config.args.algorithm.as_deref()) {
                Some(name) => Algorithm::parse(name)?,
                None => Algorithm::default(),
            };
            cmd_hash(&path, algorithm, output)
        }
    }
}

fn cmd_once(settings: &Settings, output: &OutputWriter) -> Result<()> {
    tracing::info!(
        target: "fbr",
        "process file: {}, max count: {}",
        settings.file.display(),
        settings.options.max_count
    );

    let rotator = Rotator::new(settings.options.clone(), &TracingSink);
    let outcome = rotator
        .process(&settings.file)
        .with_context(|| format!("Failed to back up {}", settings.file.display()))?;

    let data = OnceOutput::from_outcome(&settings.file, &outcome);
    output.write(&data, || data.to_text())
}

fn cmd_status(settings: &Settings, output: &OutputWriter) -> Result<()> {
    let file = &settings.file;
    let algorithm = settings.options.algorithm;
    let chain = BackupChain::scan(file)
        .with_context(|| format!("Failed to scan backups of {}", file.display()))?;

    let live_digest = Digest::hash_file(algorithm, file).ok();

    let mut entries = Vec::new();
    for entry in chain.entries() {
        let metadata = std::fs::metadata(&entry.path)
            .with_context(|| format!("Failed to read metadata of {}", entry.path.display()))?;
        let modified = metadata
            .modified()
            .map(|time| {
                DateTime::<Local>::from(time)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|_| "-".to_string());
        let matches_live = match live_digest {
            Some(live) => Digest::hash_file(algorithm, &entry.path)
                .map(|digest| digest == live)
                .unwrap_or(false),
            None => false,
        };

        entries.push(ChainEntryInfo {
            index: entry.index,
            path: entry.path.display().to_string(),
            size: metadata.len(),
            modified,
            matches_live,
            stale: entry.index > settings.options.max_count,
        });
    }

    let data = StatusOutput {
        success: true,
        result_code: 0,
        file: file.display().to_string(),
        algorithm: algorithm.to_string(),
        max_count: settings.options.max_count,
        live_digest,
        entries,
    };
    output.write(&data, || data.to_text())
}

fn cmd_hash(path: &Path, algorithm: Algorithm, output: &OutputWriter) -> Result<()> {
    let digest = Digest::hash_file(algorithm, path)
        .with_context(|| format!("Failed to hash {}", path.display()))?;

    let data = HashOutput {
        success: true,
        result_code: 0,
        path: path.display().to_string(),
        algorithm: algorithm.to_string(),
        digest,
    };
    output.write(&data, || format!("{} {}\n", digest, path.display()))
}
