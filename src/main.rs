//! Gateway Jobs CLI
//!
//! Entry point for the `gateway-jobs` command-line tool.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gateway_jobs::job_status::legal_targets;
use gateway_jobs::{
    can_transition, logging, Config, JobContext, JobStatus, JobTracker, SshConnector, TrackError,
};

const EXIT_ILLEGAL: i32 = 1;
const EXIT_DISPATCH: i32 = 2;
const EXIT_CONFIG: i32 = 3;
const EXIT_MONITOR: i32 = 4;

#[derive(Parser)]
#[command(name = "gateway-jobs")]
#[command(about = "Job lifecycle control plane", version)]
struct Cli {
    /// Debug logging (GATEWAY_JOBS_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a status change is legal
    Check {
        from: String,
        to: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the transition table
    Transitions {
        /// Only the edges out of this status
        #[arg(long)]
        from: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Follow a job on its execution host until it finishes
    Monitor {
        /// Job file (TOML with [job], [app] and [system] tables)
        #[arg(long)]
        job: PathBuf,

        /// Config file (default: ~/.config/gateway-jobs/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output the updated job record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cancel a job on its execution host
    Cancel {
        /// Job file (TOML with [job], [app] and [system] tables)
        #[arg(long)]
        job: PathBuf,

        /// Config file (default: ~/.config/gateway-jobs/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output the updated job record as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Check { from, to, json } => run_check(&from, &to, json),
        Commands::Transitions { from, json } => run_transitions(from.as_deref(), json),
        Commands::Monitor { job, config, json } => run_monitor(&job, config.as_deref(), json),
        Commands::Cancel { job, config, json } => run_cancel(&job, config.as_deref(), json),
    }
}

fn parse_status(name: &str) -> JobStatus {
    match name.parse() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(EXIT_ILLEGAL);
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_check(from: &str, to: &str, json: bool) {
    let from = parse_status(from);
    let to = parse_status(to);
    let legal = can_transition(from, to);

    if json {
        print_json(&serde_json::json!({ "from": from, "to": to, "legal": legal }));
    } else if legal {
        println!("{} -> {}: legal", from, to);
    } else {
        println!("{} -> {}: not legal", from, to);
    }

    if !legal {
        process::exit(EXIT_ILLEGAL);
    }
}

fn run_transitions(from: Option<&str>, json: bool) {
    let statuses: Vec<JobStatus> = match from {
        Some(name) => vec![parse_status(name)],
        None => JobStatus::ALL.to_vec(),
    };

    if json {
        let table: Vec<_> = statuses
            .iter()
            .map(|s| serde_json::json!({ "from": s, "to": legal_targets(*s) }))
            .collect();
        print_json(&serde_json::Value::Array(table));
        return;
    }

    for status in statuses {
        let targets: Vec<&str> = legal_targets(status).iter().map(|t| t.as_str()).collect();
        if targets.is_empty() {
            println!("{:<18} (terminal)", status.as_str());
        } else {
            println!("{:<18} -> {}", status.as_str(), targets.join(", "));
        }
    }
}

/// Load the job file and configuration, exiting on failure.
fn load_inputs(job_path: &Path, config_path: Option<&Path>) -> (JobContext, JobTracker) {
    let config = match Config::resolve(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(EXIT_CONFIG);
        }
    };

    let ctx = match JobContext::load(job_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading job file {}: {}", job_path.display(), e);
            process::exit(EXIT_CONFIG);
        }
    };

    let tracker = JobTracker::new(Arc::new(SshConnector::new(config.ssh.clone())), config.policy());
    (ctx, tracker)
}

fn report(ctx: &JobContext, json: bool) {
    if json {
        match serde_json::to_value(&ctx.job) {
            Ok(value) => print_json(&value),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("Job {}: {}", ctx.job.uuid, ctx.job.status);
    if let Some(outcome) = ctx.job.remote_outcome {
        println!("  remote outcome: {:?}", outcome);
    }
    if let Some(code) = &ctx.job.remote_result_info {
        println!("  exit code: {}", code);
    }
    if let Some(message) = &ctx.job.last_message {
        println!("  {}", message);
    }
}

fn exit_for(err: &TrackError) -> i32 {
    match err {
        TrackError::Dispatch(_) => EXIT_DISPATCH,
        TrackError::Monitor(_) => EXIT_MONITOR,
        TrackError::Job(_) => EXIT_ILLEGAL,
    }
}

fn run_monitor(job_path: &Path, config_path: Option<&Path>, json: bool) {
    let (mut ctx, tracker) = load_inputs(job_path, config_path);

    if let Err(e) = tracker.track(&mut ctx) {
        eprintln!("Monitoring failed: {}", e);
        report(&ctx, json);
        process::exit(exit_for(&e));
    }
    report(&ctx, json);
}

fn run_cancel(job_path: &Path, config_path: Option<&Path>, json: bool) {
    let (mut ctx, tracker) = load_inputs(job_path, config_path);

    if let Err(e) = tracker.cancel(&mut ctx) {
        eprintln!("Cancel failed: {}", e);
        process::exit(exit_for(&e));
    }
    report(&ctx, json);
}
