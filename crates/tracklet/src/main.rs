//! Tracklet issue tracker
//!
//! A repository-local CLI for filing and moving issues. New issues are
//! validated and checked against existing titles for likely duplicates.
//!
//! # Features
//!
//! - Field validation with per-field messages
//! - Duplicate warning with an explicit override (`--force`)
//! - Open / In Progress / Done workflow
//! - Live-updating list (`tracklet watch`)

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracklet::cli::{Cli, Commands};
use tracklet::commands::{CommandExecutor, IssueSubmission};
use tracklet::config::TrackletConfig;
use tracklet::domain::{IssueFilter, NewIssue};
use tracklet::errors::TrackerError;
use tracklet::identity::resolve_identity;
use tracklet::output::{
    format_issue_detail, format_issue_line, ExitCode, JsonError, JsonOutput, OutputContext,
};
use tracklet::snapshot::SnapshotCache;
use tracklet::storage::{IssueStore, JsonFileStorage};

/// Environment variable naming the data directory, relative to the working directory
const DATA_DIR_ENV_VAR: &str = "TRACKLET_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".tracklet";

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here, on stdout.
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCode::InvalidArgument
            } else {
                ExitCode::Success
            };
            std::process::exit(code.code());
        }
    };
    let json = command_wants_json(&cli.command);
    let command_name = command_name(&cli.command);

    let exit_code = match run(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            report_error(&e, json, command_name);
            ExitCode::for_error(&e)
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(error: &anyhow::Error, json: bool, command: &str) {
    match error.downcast_ref::<TrackerError>() {
        Some(tracker) if json => match JsonError::from_tracker_error(tracker, command).to_json_string() {
            Ok(body) => println!("{}", body),
            Err(_) => eprintln!("Error: {}", tracker),
        },
        Some(tracker) => eprint!("{}", tracker.to_actionable()),
        None if json => {
            let body = JsonError::new("ERROR", format!("{:#}", error), command);
            match body.to_json_string() {
                Ok(body) => println!("{}", body),
                Err(_) => eprintln!("Error: {:#}", error),
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Create { json, .. }
        | Commands::List { json, .. }
        | Commands::Show { json, .. }
        | Commands::Status { json, .. }
        | Commands::Similar { json, .. } => *json,
        Commands::Init | Commands::Watch { .. } => false,
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::Create { .. } => "create",
        Commands::List { .. } => "list",
        Commands::Show { .. } => "show",
        Commands::Status { .. } => "status",
        Commands::Similar { .. } => "similar",
        Commands::Watch { .. } => "watch",
    }
}

fn data_dir() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Failed to read current directory")?;
    Ok(match env::var(DATA_DIR_ENV_VAR) {
        Ok(custom_dir) => current_dir.join(custom_dir),
        Err(_) => current_dir.join(DEFAULT_DATA_DIR),
    })
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    let root = data_dir()?;
    debug!(root = %root.display(), "using data directory");

    let config = TrackletConfig::load(&root)?;
    let storage = JsonFileStorage::new(&root);
    let executor = CommandExecutor::with_config(storage.clone(), &config);

    if let Commands::Init = cli.command {
        let output_ctx = OutputContext::new(quiet, false);
        executor.init()?;
        output_ctx.print_success(format!("Initialized tracklet in {}", root.display()))?;
        return Ok(());
    }

    storage
        .validate()
        .context("Run 'tracklet init' to set up the data directory")?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Create {
            title,
            description,
            priority,
            assign,
            force,
            json,
        } => {
            let output_ctx = OutputContext::new(quiet, json);
            let identity = resolve_identity(cli.user, &config.identity());

            let mut fields = NewIssue::new(title, description).with_priority(priority);
            if let Some(assignee) = assign {
                fields = fields.with_assignee(assignee);
            }
            let submission = IssueSubmission::new(fields).with_override(force);

            let snapshot = executor.load_snapshot()?;
            let issue = executor.submit_issue(&submission, &identity, &snapshot)?;

            output_ctx.print_json(&JsonOutput::success(&issue, "create"))?;
            if quiet {
                output_ctx.print_data(&issue.id)?;
            } else {
                output_ctx.print_data(format!("Created issue: {}", issue.id))?;
            }
            Ok(())
        }
        Commands::List {
            status,
            priority,
            json,
        } => {
            let output_ctx = OutputContext::new(quiet, json);
            let issues = executor.list_issues(&IssueFilter { status, priority })?;

            output_ctx.print_json(&JsonOutput::success(
                json!({ "issues": issues, "count": issues.len() }),
                "list",
            ))?;
            for issue in &issues {
                output_ctx.print_data(format_issue_line(issue))?;
            }
            output_ctx.print_success(format!("\nTotal: {}", issues.len()))?;
            Ok(())
        }
        Commands::Show { id, json } => {
            let output_ctx = OutputContext::new(quiet, json);
            let issue = executor.show_issue(&id)?;

            output_ctx.print_json(&JsonOutput::success(&issue, "show"))?;
            output_ctx.print_data(format_issue_detail(&issue))?;
            Ok(())
        }
        Commands::Status { id, status, json } => {
            let output_ctx = OutputContext::new(quiet, json);
            let issue = executor.set_status(&id, status)?;

            output_ctx.print_json(&JsonOutput::success(&issue, "status"))?;
            output_ctx.print_success(format!("Issue {} is now {}", issue.short_id(), issue.status))?;
            Ok(())
        }
        Commands::Similar { title, json } => {
            let output_ctx = OutputContext::new(quiet, json);
            let snapshot = executor.load_snapshot()?;
            let matches = executor.find_similar(&title, &snapshot);

            output_ctx.print_json(&JsonOutput::success(
                json!({ "matches": matches, "count": matches.len() }),
                "similar",
            ))?;
            if matches.is_empty() {
                output_ctx.print_success("No similar issues")?;
            }
            for issue in &matches {
                output_ctx.print_data(format_issue_line(issue))?;
            }
            Ok(())
        }
        Commands::Watch {
            interval_ms,
            status,
            priority,
        } => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(watch(
                storage,
                Duration::from_millis(interval_ms.max(1)),
                IssueFilter { status, priority },
                quiet,
            ))
        }
    }
}

/// Print the filtered list once, then again after every change, until Ctrl-C.
///
/// Other processes write straight to the data directory, so the store is
/// re-read on a timer; only listings that differ reach the screen.
async fn watch(
    storage: JsonFileStorage,
    interval: Duration,
    filter: IssueFilter,
    quiet: bool,
) -> Result<()> {
    let output_ctx = OutputContext::new(quiet, false);

    let cache = SnapshotCache::default();
    let mut reader = cache.reader();
    storage.refresh()?;
    let _subscription = cache.follow(storage.subscribe());

    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                output_ctx.print_success("Stopped watching")?;
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = storage.refresh() {
                    output_ctx.print_warning(format!("Failed to read issues: {:#}", e))?;
                }
            }
            next = reader.next() => {
                let Some(snapshot) = next else {
                    return Ok(());
                };
                let issues = snapshot.filtered(&filter);
                output_ctx.print_data(format!("--- {} issue(s) ---", issues.len()))?;
                for issue in &issues {
                    output_ctx.print_data(format_issue_line(issue))?;
                }
            }
        }
    }
}
