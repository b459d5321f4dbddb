//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand};

use crate::domain::{Priority, Status};

/// Tracklet issue tracker
///
/// Intake for bug reports and feature requests: field validation, a duplicate
/// check against existing titles, and a small Open / In Progress / Done lifecycle.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments or usage error
///   3  - Issue not found
///   4  - Validation failed (invalid fields, rejected status change)
///   6  - Similar issues exist (re-run create with --force)
///  10  - Store failed (file system, etc.)
#[derive(Parser)]
#[command(name = "tracklet")]
#[command(about = "Tracklet issue tracker", long_about = None)]
pub struct Cli {
    /// Suppress non-essential output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Identity recorded as the creator of new issues
    #[arg(long, global = true, env = "TRACKLET_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the issue tracker in the current directory
    Init,

    /// Create a new issue
    ///
    /// The title is checked against existing issues. If two or more significant
    /// words are shared with an existing title the issue is not created and the
    /// similar issues are listed; pass --force to create it anyway.
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        /// Priority: low, medium, high
        #[arg(short, long, default_value = "low")]
        priority: Priority,

        /// Person responsible for the issue
        #[arg(short, long)]
        assign: Option<String>,

        /// Create even if similar issues exist
        #[arg(long)]
        force: bool,

        #[arg(long)]
        json: bool,
    },

    /// List issues, newest first
    List {
        /// Filter by status (open, in_progress, done)
        #[arg(long)]
        status: Option<Status>,

        /// Filter by priority (low, medium, high)
        #[arg(long)]
        priority: Option<Priority>,

        #[arg(long)]
        json: bool,
    },

    /// Show issue details
    Show {
        /// Issue ID or unique prefix
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Change the status of an issue
    ///
    /// Open issues cannot go straight to Done; move them to in_progress first.
    Status {
        /// Issue ID or unique prefix
        id: String,

        /// New status (open, in_progress, done)
        status: Status,

        #[arg(long)]
        json: bool,
    },

    /// List existing issues whose titles look like the given one
    Similar {
        title: String,

        #[arg(long)]
        json: bool,
    },

    /// Print the issue list every time it changes
    Watch {
        /// How often to re-read the data directory, in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Filter by status (open, in_progress, done)
        #[arg(long)]
        status: Option<Status>,

        /// Filter by priority (low, medium, high)
        #[arg(long)]
        priority: Option<Priority>,
    },
}
