//! # Scheduled Jobs
//!
//! The periodic stage evaluation: load the stored snapshot, classify it,
//! append the result to the stage history. The job is the only writer of
//! scheduled stage rows; on-demand classifications via the API append to
//! the same log.

use crate::api::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the periodic evaluation loop.
///
/// The first evaluation runs immediately, then every `interval_secs`.
/// An empty store (no observations yet) is skipped with a warning
/// rather than recording a contentless fallback row.
pub fn spawn_evaluation_loop(state: AppState, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            ticker.tick().await;
            evaluate_once(&state);
        }
    })
}

/// One evaluation pass.
fn evaluate_once(state: &AppState) {
    let snapshot = match state.store.load_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!("Scheduled evaluation: cannot load snapshot: {}", e);
            return;
        }
    };

    if snapshot.is_empty() {
        tracing::warn!("Scheduled evaluation skipped: no observations stored yet");
        return;
    }

    let result = state.classifier.determine(&snapshot);
    match state.store.append_stage(&result) {
        Ok(_) => {
            tracing::info!(
                stage = ?result.stage,
                confidence = result.confidence.as_str(),
                "Scheduled evaluation: {}",
                result.rationale
            );
        }
        Err(e) => {
            tracing::error!("Scheduled evaluation: cannot append stage: {}", e);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
