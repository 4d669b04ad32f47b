//! migcheck CLI
//!
//! Command-line entry point for the upgrade verification harness. Runs
//! the {backend × version} matrix, prints the filtered matrix without
//! executing, or compares two version tokens.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use migcheck::orchestrator::MigrationOrchestrator;
use migcheck::{report, version, DatabaseKind, HarnessConfig, SystemRunner};

#[derive(Parser)]
#[command(name = "migcheck")]
#[command(about = "Upgrade verification harness for the pipeline application's metadata store")]
#[command(version)]
struct Cli {
    /// Configuration file (default: migcheck.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the full upgrade test matrix
    Run {
        /// Restrict the run to one backend
        #[arg(long, value_enum)]
        database: Option<DatabaseKind>,

        /// Comma-separated version list overriding the configured one
        #[arg(long)]
        versions: Option<String>,

        /// Root state directory override
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the filtered {backend x version} matrix without executing
    Matrix {
        /// Restrict to one backend
        #[arg(long, value_enum)]
        database: Option<DatabaseKind>,
    },

    /// Compare two version tokens and print their ordering
    Compare { a: String, b: String },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = match HarnessConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            database,
            versions,
            state_dir,
            report,
        } => handle_run(config, database, versions, state_dir, report),
        Commands::Matrix { database } => handle_matrix(config, database),
        Commands::Compare { a, b } => handle_compare(&a, &b),
    };

    match result {
        Ok(()) => {
            if !cli.quiet {
                println!("✅ Success");
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn handle_run(
    mut config: HarnessConfig,
    database: Option<DatabaseKind>,
    versions: Option<String>,
    state_dir: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    if database.is_some() {
        config.database = database;
    }
    if let Some(list) = versions {
        config.versions = list.split(',').map(|v| v.trim().to_string()).collect();
    }
    if let Some(dir) = state_dir {
        config.state_dir = dir;
    }
    if report_path.is_some() {
        config.report_path = report_path;
    }

    let runner = SystemRunner;
    let orchestrator = MigrationOrchestrator::new(&runner, &config);
    let run = orchestrator.run().context("building the test matrix")?;

    report::print_summary(&run);
    if let Some(path) = &config.report_path {
        report::write_json(&run, path)
            .with_context(|| format!("writing run report to {}", path.display()))?;
        println!("report written to {}", path.display());
    }

    if !run.passed() {
        anyhow::bail!("upgrade verification failed, see outcomes above");
    }
    Ok(())
}

fn handle_matrix(mut config: HarnessConfig, database: Option<DatabaseKind>) -> anyhow::Result<()> {
    if database.is_some() {
        config.database = database;
    }
    let runner = SystemRunner;
    let orchestrator = MigrationOrchestrator::new(&runner, &config);
    for entry in orchestrator.build_matrix()? {
        let versions: Vec<String> = entry.versions.iter().map(|v| v.to_string()).collect();
        println!("{:<9} {}", entry.backend.name(), versions.join(" "));
    }
    Ok(())
}

fn handle_compare(a: &str, b: &str) -> anyhow::Result<()> {
    let ordering = version::compare(a, b)?;
    let glyph = match ordering {
        Ordering::Less => "<",
        Ordering::Equal => "=",
        Ordering::Greater => ">",
    };
    println!("{} {} {}", a, glyph, b);
    Ok(())
}
