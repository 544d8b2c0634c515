// gradesync CLI - import grading spreadsheets into competency evaluations

mod exit_codes;
mod input;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gradesync_recon::stats::subject_report;
use gradesync_recon::{reconcile, ReconError, ReconInput, Snapshot, Subject};

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_UNKNOWN_SUBJECT, EXIT_USAGE};
use input::{load_answer_keys, load_grid, load_snapshot, to_json, write_file};
use sync::SyncCommands;

#[derive(Parser)]
#[command(name = "gradesync")]
#[command(about = "Reconcile grading spreadsheets against a class roster and competency list")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one grid against one subject and print the evaluations
    #[command(after_help = "\
Examples:
  gradesync reconcile --grid respostes.csv --snapshot snapshot.json --subject mat1a
  gradesync reconcile --grid notes.json --snapshot snapshot.json --subject cat1a --json
  gradesync reconcile --grid respostes.csv --snapshot snapshot.json --subject mat1a \\
      --answer-keys claus.csv --output result.json --verbose")]
    Reconcile {
        /// Grid file (.csv, .tsv or values-API .json)
        #[arg(long)]
        grid: PathBuf,

        /// Snapshot JSON with subjects, students and competencies
        #[arg(long)]
        snapshot: PathBuf,

        /// Subject id the grid belongs to
        #[arg(long)]
        subject: String,

        /// Answer-key file (Subject,Question,Answer rows)
        #[arg(long, env = "GRADESYNC_ANSWER_KEYS")]
        answer_keys: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the reconciliation log on stderr
        #[arg(long, short)]
        verbose: bool,
    },

    /// Multi-subject import driven by a TOML config
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Inspect answer-key files
    Keys {
        #[command(subcommand)]
        command: KeysCommands,
    },

    /// Per-student score summary for one subject
    #[command(after_help = "\
Examples:
  gradesync stats --snapshot snapshot.out.json --subject mat1a --answer-keys claus.csv")]
    Stats {
        /// Snapshot JSON (usually the merged output of `sync run`)
        #[arg(long)]
        snapshot: PathBuf,

        /// Subject id
        #[arg(long)]
        subject: String,

        /// Answer-key file; decides which competencies count as test items
        #[arg(long, env = "GRADESYNC_ANSWER_KEYS")]
        answer_keys: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum KeysCommands {
    /// Parse an answer-key file and print it as JSON
    Show {
        /// Answer-key file
        file: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  gradesync-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  gradesync-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: gradesync <command> [options]");
            eprintln!("       gradesync --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Reconcile {
            grid,
            snapshot,
            subject,
            answer_keys,
            json,
            output,
            verbose,
        }) => cmd_reconcile(grid, snapshot, subject, answer_keys, json, output, verbose),
        Some(Commands::Sync { command }) => sync::cmd_sync(command),
        Some(Commands::Keys { command }) => match command {
            KeysCommands::Show { file } => cmd_keys_show(file),
        },
        Some(Commands::Stats {
            snapshot,
            subject,
            answer_keys,
        }) => cmd_stats(snapshot, subject, answer_keys),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Look up `--subject`, listing the known ids when it is missing.
fn find_subject<'a>(snapshot: &'a Snapshot, id: &str) -> Result<&'a Subject, CliError> {
    snapshot.subject(id).ok_or_else(|| {
        let known: Vec<&str> = snapshot.subjects.iter().map(|s| s.id.as_str()).collect();
        let err = CliError {
            code: EXIT_UNKNOWN_SUBJECT,
            message: ReconError::UnknownSubject(id.to_string()).to_string(),
            hint: None,
        };
        if known.is_empty() {
            err.with_hint("the snapshot has no subjects")
        } else {
            err.with_hint(format!("known subjects: {}", known.join(", ")))
        }
    })
}

// ============================================================================
// reconcile
// ============================================================================

fn cmd_reconcile(
    grid_path: PathBuf,
    snapshot_path: PathBuf,
    subject_id: String,
    answer_keys_path: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
    verbose: bool,
) -> Result<(), CliError> {
    let snapshot = load_snapshot(&snapshot_path)?;
    let subject = find_subject(&snapshot, &subject_id)?;
    let answer_keys = load_answer_keys(answer_keys_path.as_deref())?;
    let grid = load_grid(&grid_path)?;

    let students = snapshot.students_of(subject);
    let out = reconcile(&ReconInput {
        grid: &grid,
        students: &students,
        competencies: &snapshot.competencies,
        subject_id: &subject.id,
        subject_name: &subject.name,
        answer_keys: &answer_keys,
    });

    let json_str = to_json(&out)?;
    if let Some(ref path) = output_file {
        write_file(path, &json_str)?;
    }
    if json_output {
        println!("{json_str}");
    }

    if verbose {
        for line in &out.logs {
            eprintln!("  {line}");
        }
    }
    let s = &out.summary;
    eprintln!(
        "{}: {} evaluation(s) ({} auto-graded, {} rubric), {} row(s) skipped, {} ambiguous",
        subject.name,
        s.total,
        s.auto_graded,
        s.rubric_graded,
        s.skipped_rows,
        s.ambiguous.len(),
    );

    Ok(())
}

// ============================================================================
// keys show
// ============================================================================

fn cmd_keys_show(file: PathBuf) -> Result<(), CliError> {
    let store = load_answer_keys(Some(&file))?;
    println!("{}", to_json(&store)?);
    let questions: usize = store.subjects().map(|(_, key)| key.len()).sum();
    eprintln!("{} subject(s), {} question(s)", store.len(), questions);
    Ok(())
}

// ============================================================================
// stats
// ============================================================================

fn cmd_stats(
    snapshot_path: PathBuf,
    subject_id: String,
    answer_keys_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let snapshot = load_snapshot(&snapshot_path)?;
    let subject = find_subject(&snapshot, &subject_id)?;
    let answer_keys = load_answer_keys(answer_keys_path.as_deref())?;

    let report = subject_report(&snapshot, &subject.id, &answer_keys)
        .map_err(|e| CliError::recon(&e))?;
    println!("{}", to_json(&report)?);
    eprintln!("{}: {} student(s)", subject.name, report.len());
    Ok(())
}
