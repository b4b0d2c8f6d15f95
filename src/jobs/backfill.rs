//! Backfill path: sessions whose two levels are both COMPLETED but which
//! never got a report row. Scores are copied from the attempt metadata the
//! completion already wrote; nothing is recomputed here.

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::metadata::AttemptMetadata;
use crate::report::{self, NewReport};

use super::{RecordOutcome, ReportAction, RunSummary};

#[derive(Debug, Clone)]
struct BackfillTarget {
    session_id: i64,
    program_id: i64,
    l1_metadata: Option<String>,
    l1_dominant_trait_id: Option<i64>,
    l2_metadata: Option<String>,
}

fn select_targets(conn: &Connection, group_id: i64) -> anyhow::Result<Vec<BackfillTarget>> {
    let mut stmt = conn.prepare(
        "SELECT
            s.id, s.program_id, l1.metadata, l1.dominant_trait_id, l2.metadata
         FROM assessment_sessions s
         JOIN assessment_attempts l1 ON s.id = l1.assessment_session_id
             AND l1.assessment_level_id = 1 AND l1.status = 'COMPLETED'
         JOIN assessment_attempts l2 ON s.id = l2.assessment_session_id
             AND l2.assessment_level_id = 2 AND l2.status = 'COMPLETED'
         LEFT JOIN assessment_reports ar ON s.id = ar.assessment_session_id
         WHERE s.group_id = ? AND ar.id IS NULL",
    )?;
    let targets = stmt
        .query_map([group_id], |r| {
            Ok(BackfillTarget {
                session_id: r.get(0)?,
                program_id: r.get(1)?,
                l1_metadata: r.get(2)?,
                l1_dominant_trait_id: r.get(3)?,
                l2_metadata: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(targets)
}

pub fn run(conn: &mut Connection, group_id: i64) -> anyhow::Result<RunSummary> {
    let targets = select_targets(conn, group_id)?;
    info!(
        group_id,
        targets = targets.len(),
        "found completed sessions missing reports"
    );

    let mut summary = RunSummary {
        found: targets.len(),
        ..Default::default()
    };
    for target in targets {
        let detail = backfill_one(conn, group_id, &target);
        summary.record(RecordOutcome {
            session_id: target.session_id,
            detail,
        });
    }
    Ok(summary)
}

fn backfill_one(
    conn: &mut Connection,
    group_id: i64,
    target: &BackfillTarget,
) -> anyhow::Result<ReportAction> {
    let tx = conn.transaction()?;

    let l1_meta = AttemptMetadata::parse(target.l1_metadata.as_deref());
    let l2_meta = AttemptMetadata::parse(target.l2_metadata.as_deref());
    let overall_sincerity = l2_meta.overall_sincerity.unwrap_or(100.0);

    let now = Utc::now().to_rfc3339();
    let report_number = report::generate_report_number(&tx, group_id, target.program_id)?;
    report::insert_report(
        &tx,
        &NewReport {
            session_id: target.session_id,
            report_number: &report_number,
            disc_scores: &l1_meta.disc_scores_column(),
            agile_scores: &l2_meta.agile_scores_column()?,
            overall_sincerity,
            dominant_trait_id: target.l1_dominant_trait_id,
        },
        &now,
    )?;
    tx.execute(
        "UPDATE assessment_sessions
         SET status = 'COMPLETED', is_report_ready = 1, updated_at = ?
         WHERE id = ?",
        rusqlite::params![now, target.session_id],
    )?;

    tx.commit()?;
    Ok(ReportAction::Created { report_number })
}
