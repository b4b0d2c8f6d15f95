pub mod backfill;
pub mod repair;

use tracing::{error, info};

/// What the persister did for one target session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportAction {
    Created { report_number: String },
    Updated { report_id: i64 },
}

#[derive(Debug)]
pub struct RecordOutcome {
    pub session_id: i64,
    pub detail: anyhow::Result<ReportAction>,
}

/// Aggregated result of one job run. Per-record failures are collected here
/// rather than aborting the run or changing the exit code.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub found: usize,
    pub succeeded: usize,
    pub failed: Vec<(i64, String)>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome.detail {
            Ok(ReportAction::Created { report_number }) => {
                self.succeeded += 1;
                info!(
                    session_id = outcome.session_id,
                    report_number = %report_number,
                    "created report"
                );
            }
            Ok(ReportAction::Updated { report_id }) => {
                self.succeeded += 1;
                info!(
                    session_id = outcome.session_id,
                    report_id, "updated existing report"
                );
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(
                    session_id = outcome.session_id,
                    reason = %reason,
                    "record failed, rolled back"
                );
                self.failed.push((outcome.session_id, reason));
            }
        }
    }

    pub fn log(&self, job: &str) {
        info!(
            job,
            found = self.found,
            succeeded = self.succeeded,
            failed = self.failed.len(),
            "run finished"
        );
    }
}
