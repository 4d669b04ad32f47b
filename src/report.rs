//! Run-report output: a human summary on stdout and an optional JSON
//! artifact for CI to archive.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use colored::Colorize;

use crate::orchestrator::MatrixRun;

pub fn write_json(run: &MatrixRun, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), run)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
}

pub fn print_summary(run: &MatrixRun) {
    println!("\n{}", "Upgrade verification summary".bold());
    for outcome in &run.outcomes {
        let glyph = if outcome.passed { "✅".green() } else { "❌".red() };
        let stage = outcome
            .failure_stage
            .map(|s| format!(" [{:?}]", s))
            .unwrap_or_default();
        println!(
            "  {} {:<9} {:<12}{} {}",
            glyph,
            outcome.backend.name(),
            outcome.version.to_string(),
            stage,
            if outcome.passed { "" } else { outcome.message.as_str() }
        );
    }
    let verdict = if run.passed() {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "  {} ({} outcomes, {} -> {})",
        verdict,
        run.outcomes.len(),
        run.started_at.format("%H:%M:%S"),
        run.finished_at.format("%H:%M:%S"),
    );
}
