//! Persistence layer.
//!
//! Reads input snapshots from JSON files and writes evaluation reports as
//! pretty-printed JSON. The engine itself never touches the filesystem.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::data::Snapshot;
use crate::strategy::EvaluationReport;

/// Load a snapshot of fixtures, odds and probabilities.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;

    let snapshot: Snapshot = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse snapshot from {}", path.display()))?;

    info!(
        path = %path.display(),
        fixtures = snapshot.fixtures.len(),
        odds = snapshot.odds.len(),
        probabilities = snapshot.probabilities.len(),
        "Snapshot loaded"
    );

    Ok(snapshot)
}

/// Write a snapshot, e.g. to freeze provider data for later replays.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialise snapshot")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    debug!(path = %path.display(), "Snapshot saved");
    Ok(())
}

/// Write an evaluation report.
pub fn save_report(report: &EvaluationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    info!(
        path = %path.display(),
        picks = report.picks.picks.len(),
        accumulators = report.accumulators.accumulators.len(),
        "Report saved"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
