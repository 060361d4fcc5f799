//! Check many boards at once.
//!
//! Each board is resolved and validated on its own blocking task. Results are
//! reported per board and one failing board never hides the others.

use crate::errors::TargetError;
use crate::registry::SourceRegistry;
use crate::validator::CheckedTarget;
use crate::value::Value;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug)]
pub struct TargetReport {
    pub board: String,
    pub outcome: Result<CheckedTarget, TargetError>,
}

impl TargetReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Check `boards` concurrently; reports come back in input order
pub async fn check_all(
    registry: Arc<SourceRegistry>,
    boards: Vec<String>,
    overrides: Vec<(String, Value)>,
) -> Vec<TargetReport> {
    let overrides = Arc::new(overrides);
    let mut handles = Vec::with_capacity(boards.len());

    for board in boards {
        let registry = registry.clone();
        let overrides = overrides.clone();
        let task_board = board.clone();
        let handle = tokio::task::spawn_blocking(move || registry.check(&task_board, &overrides));
        handles.push((board, handle));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (board, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("[matrix] check of {} aborted: {}", board, e);
                Err(TargetError::Aborted {
                    board: board.clone(),
                    reason: e.to_string(),
                })
            }
        };
        reports.push(TargetReport { board, outcome });
    }

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    info!("[matrix] {} board(s) checked, {} failed", reports.len(), failed);
    reports
}
