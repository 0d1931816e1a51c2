//! `roster` CLI: check, plan, and apply weekly monitoring schedules.
//!
//! ## Usage
//!
//! ```sh
//! # Flag overlapping slots in a list of intervals (stdin → stdout)
//! cat intervals.json | roster check
//!
//! # Check a worker's combined schedule across subjects
//! roster check -i all_intervals.json --scope worker
//!
//! # Compute the create/update/delete plan for an edited schedule
//! roster plan --snapshot before.json --working after.json
//!
//! # Apply an edit to a JSON store, only allowing surveillance officers
//! roster apply --store store.json --working after.json --subject 5 \
//!     --require-role surveillance-officer
//! ```
//!
//! Log output goes to stderr. `RUST_LOG` overrides the level chosen by `-v`.

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roster_engine::{
    commit, eligible_workers, find_clashes, load_snapshot, reconcile_with, ConflictScope,
    InMemoryStore, ReconcileOptions, ScheduleInterval, ScheduleSnapshot, SubjectId, WorkerRole,
    WorkingSet,
};

#[derive(Parser)]
#[command(
    name = "roster",
    version,
    about = "Weekly monitoring schedule checker and reconciler"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag overlapping intervals; exits non-zero if any clash is found
    Check {
        /// Input JSON array of intervals (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Grouping policy: "subject" (by weekday) or "worker" (by worker and weekday)
        #[arg(long, default_value = "subject")]
        scope: ConflictScope,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compute the plan that turns a snapshot into an edited working set
    Plan {
        /// Persisted intervals before editing (JSON array)
        #[arg(long)]
        snapshot: String,
        /// Edited intervals (JSON array); new slots have no id
        #[arg(long)]
        working: String,
        /// Subject the schedule belongs to (inferred from the files if omitted)
        #[arg(long)]
        subject: Option<u64>,
        /// Other subjects' intervals to check for worker double-booking (JSON array)
        #[arg(long)]
        bookings: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Reconcile an edited schedule against a JSON store and write the result back
    Apply {
        /// Store file with `intervals` and `workers`
        #[arg(long)]
        store: String,
        /// Edited intervals (JSON array); new slots have no id
        #[arg(long)]
        working: String,
        /// Subject the schedule belongs to (inferred from the working set if omitted)
        #[arg(long)]
        subject: Option<u64>,
        /// Only allow workers with this role (e.g. "surveillance-officer")
        #[arg(long)]
        require_role: Option<WorkerRole>,
        /// Print the plan without modifying the store
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            input,
            scope,
            output,
        } => {
            let intervals = read_intervals(input.as_deref())?;
            let annotated = scope.annotate(&intervals);
            write_json(output.as_deref(), &annotated)?;

            let clashes = find_clashes(&intervals, |i| scope.key(i));
            for clash in &clashes {
                eprintln!("clash on {}: {}", clash.weekday, clash);
            }
            if !clashes.is_empty() {
                anyhow::bail!("{} clash(es) found", clashes.len());
            }
        }
        Commands::Plan {
            snapshot,
            working,
            subject,
            bookings,
            output,
        } => {
            let before = read_intervals(Some(snapshot.as_str()))?;
            let after = read_intervals(Some(working.as_str()))?;
            let subject = resolve_subject(subject, &[before.as_slice(), after.as_slice()])?;

            let mut options = ReconcileOptions::default();
            if let Some(path) = bookings {
                options = options.with_worker_bookings(read_intervals(Some(path.as_str()))?);
            }

            let snapshot = ScheduleSnapshot::new(subject, before);
            let working = WorkingSet::from_entries(subject, after);
            let plan = reconcile_with(&snapshot, &working, &options)
                .context("Schedule edit rejected")?;
            write_json(output.as_deref(), &plan)?;
        }
        Commands::Apply {
            store,
            working,
            subject,
            require_role,
            dry_run,
        } => {
            let mut repo = InMemoryStore::from_file(read_json(Some(store.as_str()), "store")?);
            let edited = read_intervals(Some(working.as_str()))?;
            let subject = resolve_subject(subject, &[edited.as_slice()])?;

            let snapshot = load_snapshot(&repo, subject)?;
            let working = WorkingSet::from_entries(subject, edited);

            let mut options =
                ReconcileOptions::default().with_worker_bookings(repo.all_intervals());
            if let Some(role) = require_role {
                options = options.with_eligible_workers(eligible_workers(&repo, role)?);
            }

            if dry_run {
                let plan = reconcile_with(&snapshot, &working, &options)
                    .context("Schedule edit rejected")?;
                write_json(None, &plan)?;
                return Ok(());
            }

            let report = commit(&snapshot, &working, &options, &mut repo)
                .context("Failed to apply schedule edit")?;
            write_json(Some(store.as_str()), &repo.to_file())?;
            info!(applied = report.applied(), store = %store, "store updated");
            write_json(None, &report)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Use the explicit subject, or the subject of the first interval found.
fn resolve_subject(explicit: Option<u64>, sources: &[&[ScheduleInterval]]) -> Result<SubjectId> {
    if let Some(id) = explicit {
        return Ok(SubjectId(id));
    }
    sources
        .iter()
        .flat_map(|s| s.iter())
        .map(|i| i.subject_id)
        .next()
        .context("Cannot infer the subject from empty input; pass --subject")
}

fn read_intervals(path: Option<&str>) -> Result<Vec<ScheduleInterval>> {
    read_json(path, "intervals")
}

/// Parse a JSON document of type `T` from `path`, or from stdin when absent.
fn read_json<T: DeserializeOwned>(path: Option<&str>, what: &str) -> Result<T> {
    let (json, origin) = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path))?;
            (json, path)
        }
        None => {
            let mut json = String::new();
            io::stdin()
                .read_to_string(&mut json)
                .context("Failed to read from stdin")?;
            (json, "stdin")
        }
    };
    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {} from {}", what, origin))
}

/// Pretty-print `value` to `path`, or to stdout when absent.
fn write_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write file: {}", path)),
        None => {
            io::stdout()
                .write_all(json.as_bytes())
                .context("Failed to write to stdout")
        }
    }
}
