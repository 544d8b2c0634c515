//! `gradesync sync`: config-driven multi-subject import.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use gradesync_recon::sync::{self, SheetGrid};
use gradesync_recon::SyncConfig;

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::input::{load_answer_keys, load_grid, load_snapshot, read_file_as_utf8, to_json, write_file};
use crate::CliError;

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Import every configured sheet and merge into the snapshot
    #[command(after_help = "\
Examples:
  gradesync sync run trimestre.sync.toml
  gradesync sync run trimestre.sync.toml --json
  gradesync sync run trimestre.sync.toml --output report.json --verbose")]
    Run {
        /// Path to the .sync.toml config file
        config: PathBuf,

        /// Output the JSON report to stdout instead of only the summary
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file (overrides [output].json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print every reconciliation log line on stderr
        #[arg(long, short)]
        verbose: bool,
    },

    /// Validate a sync config without running
    #[command(after_help = "\
Examples:
  gradesync sync validate trimestre.sync.toml")]
    Validate {
        /// Path to the .sync.toml config file
        config: PathBuf,
    },
}

pub fn cmd_sync(cmd: SyncCommands) -> Result<(), CliError> {
    match cmd {
        SyncCommands::Run { config, json, output, verbose } => {
            cmd_sync_run(config, json, output, verbose)
        }
        SyncCommands::Validate { config } => cmd_sync_validate(config),
    }
}

fn config_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
}

fn load_config(config_path: &Path) -> Result<SyncConfig, CliError> {
    let config_str = read_file_as_utf8(config_path)?;
    SyncConfig::from_toml(&config_str).map_err(|e| config_err(e.to_string()))
}

fn cmd_sync_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    verbose: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let mut snapshot = load_snapshot(&base_dir.join(&config.snapshot))?;
    let answer_keys = load_answer_keys(
        config.answer_keys.as_ref().map(|p| base_dir.join(p)).as_deref(),
    )?;

    let mut sheets = Vec::with_capacity(config.sheets.len());
    for sheet in &config.sheets {
        sheets.push(SheetGrid {
            subject_name: sheet.subject.clone(),
            grid: load_grid(&base_dir.join(&sheet.file))?,
        });
    }

    let report = sync::run(&config.name, &mut snapshot, &sheets, &answer_keys, &config.detect);

    // Output
    let json_str = to_json(&report)?;

    let report_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = report_path {
        write_file(path, &json_str)?;
    }
    if let Some(ref path) = config.output.snapshot {
        write_file(&base_dir.join(path), &to_json(&snapshot)?)?;
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    for step in &report.steps {
        let target = step.subject_name.as_deref().unwrap_or("(no subject)");
        eprintln!(
            "  '{}' -> {}: {} produced, {} new, {} updated",
            step.sheet, target, step.produced, step.inserted, step.replaced,
        );
        if verbose {
            for line in &step.logs {
                eprintln!("      {line}");
            }
        }
    }
    eprintln!(
        "sync '{}': {} step(s), {} evaluation(s): {} new, {} updated",
        report.meta.name,
        report.steps.len(),
        report.total_produced,
        report.total_inserted,
        report.total_replaced,
    );

    Ok(())
}

fn cmd_sync_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: sync '{}' with {} sheet(s){}",
        config.name,
        config.sheets.len(),
        if config.answer_keys.is_some() { ", answer keys" } else { "" },
    );
    Ok(())
}
