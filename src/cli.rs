//! Command-line surface of the recorder.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "autopattern")]
#[command(about = "Record browser activity and split it into replayable workflows")]
#[command(version)]
pub struct Cli {
    /// Directory holding the event store and settings
    #[arg(long, env = "AUTOPATTERN_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Inactivity gap (ms) that starts a new workflow, for this run only
    #[arg(long, global = true)]
    pub threshold_ms: Option<u64>,

    /// Dashboard debounce window (ms), for this run only
    #[arg(long, global = true)]
    pub debounce_ms: Option<u64>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store newline-delimited JSON events read from stdin or a file
    Record {
        /// Read events from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Record events while a live dashboard redraws after each burst
    Watch {
        /// Read events from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List the workflows found in the stored events
    Workflows,

    /// Show every event of one workflow
    Show {
        /// Workflow index as listed by `workflows`
        index: usize,

        /// Expand payload sections
        #[arg(short, long)]
        expand: bool,
    },

    /// Write all stored events to a JSON file
    Export {
        /// Output path (default: autopattern-events-<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Segment an exported event file without touching the store
    Segment {
        /// Export document or bare JSON array of events
        file: PathBuf,
    },

    /// Prepare a replay request for one workflow
    Automate {
        /// Workflow index as listed by `workflows`
        index: usize,

        /// Start the replay from this URL instead of the recorded one
        #[arg(long)]
        start_url: Option<String>,

        /// Task description to send instead of a generated one
        #[arg(long)]
        task: Option<String>,

        /// Input value as KEY=VALUE, referenced as {{KEY}} in the task
        #[arg(long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Run the browser headless (default: stored setting)
        #[arg(long)]
        headless: Option<bool>,

        /// Write the request here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Prepare a free-text automation task request
    Task {
        /// What the browser agent should do
        text: String,

        /// Input value as KEY=VALUE, referenced as {{KEY}} in the task
        #[arg(long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Run the browser headless (default: stored setting)
        #[arg(long)]
        headless: Option<bool>,

        /// Write the request here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the current settings as JSON
    Show,

    /// Update one or more settings
    Set {
        #[arg(long)]
        threshold_ms: Option<u64>,

        #[arg(long)]
        debounce_ms: Option<u64>,

        #[arg(long)]
        llm_model: Option<String>,

        #[arg(long)]
        analysis_model: Option<String>,

        #[arg(long)]
        headless: Option<bool>,
    },
}
