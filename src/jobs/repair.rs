//! Repair path: completes "stuck" level-2 attempts that have recorded
//! progress, recomputing their scores from raw answers and creating or
//! repairing the session report.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::calc;
use crate::metadata::AttemptMetadata;
use crate::report::{self, NewReport};

use super::{RecordOutcome, ReportAction, RunSummary};

#[derive(Debug, Clone)]
struct RepairTarget {
    session_id: i64,
    user_id: i64,
    program_id: i64,
    attempt_id: i64,
    attempt_metadata: Option<String>,
}

/// Sessions in the group where level 1 is COMPLETED, level 2 is neither
/// NOT_STARTED nor COMPLETED, and the level-2 attempt has at least one
/// answered row. Result sets are small; held in memory.
fn select_targets(conn: &Connection, group_id: i64) -> anyhow::Result<Vec<RepairTarget>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT
            s.id, s.user_id, s.program_id, l2.id, l2.metadata
         FROM assessment_sessions s
         JOIN assessment_attempts l1 ON s.id = l1.assessment_session_id
             AND l1.assessment_level_id = 1
             AND l1.status = 'COMPLETED'
         JOIN assessment_attempts l2 ON s.id = l2.assessment_session_id
             AND l2.assessment_level_id = 2
         WHERE s.group_id = ?
             AND l2.status NOT IN ('NOT_STARTED', 'COMPLETED')
             AND EXISTS (
                 SELECT 1
                 FROM assessment_answers ans
                 WHERE ans.assessment_attempt_id = l2.id
                   AND ans.status = 'ANSWERED'
             )",
    )?;
    let targets = stmt
        .query_map([group_id], |r| {
            Ok(RepairTarget {
                session_id: r.get(0)?,
                user_id: r.get(1)?,
                program_id: r.get(2)?,
                attempt_id: r.get(3)?,
                attempt_metadata: r.get(4)?,
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
        "found stuck level-2 attempts to repair"
    );

    let mut summary = RunSummary {
        found: targets.len(),
        ..Default::default()
    };
    for target in targets {
        info!(
            user_id = target.user_id,
            session_id = target.session_id,
            attempt_id = target.attempt_id,
            "processing"
        );
        let detail = repair_one(conn, group_id, &target);
        summary.record(RecordOutcome {
            session_id: target.session_id,
            detail,
        });
    }
    Ok(summary)
}

/// All writes for one session, in one transaction. Any error rolls the whole
/// record back via the transaction's drop behavior.
fn repair_one(
    conn: &mut Connection,
    group_id: i64,
    target: &RepairTarget,
) -> anyhow::Result<ReportAction> {
    let tx = conn.transaction()?;

    let scores = calc::compute_attempt_scores(&tx, target.attempt_id)?;

    let mut meta = AttemptMetadata::parse(target.attempt_metadata.as_deref());
    meta.apply_scores(&scores);

    let now = Utc::now().to_rfc3339();
    tx.execute(
        "UPDATE assessment_attempts
         SET status = 'COMPLETED',
             completed_at = ?,
             metadata = ?,
             total_score = ?,
             sincerity_index = ?,
             sincerity_class = ?,
             updated_at = ?
         WHERE id = ?",
        rusqlite::params![
            now,
            meta.to_column()?,
            scores.agile.total,
            scores.sincerity_index,
            scores.sincerity_class.as_str(),
            now,
            target.attempt_id
        ],
    )?;
    tx.execute(
        "UPDATE assessment_sessions
         SET status = 'COMPLETED', completed_at = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![now, now, target.session_id],
    )?;

    let action = match report::find_report_id(&tx, target.session_id)? {
        None => {
            let report_number = report::generate_report_number(&tx, group_id, target.program_id)?;
            let level1 = fetch_level1(&tx, target.session_id)?;
            report::insert_report(
                &tx,
                &NewReport {
                    session_id: target.session_id,
                    report_number: &report_number,
                    disc_scores: &level1.disc_scores,
                    agile_scores: &meta.agile_scores_column()?,
                    overall_sincerity: scores.sincerity_index,
                    dominant_trait_id: level1.dominant_trait_id,
                },
                &now,
            )?;
            ReportAction::Created { report_number }
        }
        Some(report_id) => {
            report::update_report_scores(
                &tx,
                report_id,
                &meta.agile_scores_column()?,
                scores.sincerity_index,
                &now,
            )?;
            ReportAction::Updated { report_id }
        }
    };

    tx.commit()?;
    Ok(action)
}

struct Level1Data {
    disc_scores: String,
    dominant_trait_id: Option<i64>,
}

/// Trait and disc-score fields for a new report come from the level-1
/// attempt; both default when the attempt or its metadata is missing.
fn fetch_level1(conn: &Connection, session_id: i64) -> anyhow::Result<Level1Data> {
    let row: Option<(Option<String>, Option<i64>)> = conn
        .query_row(
            "SELECT metadata, dominant_trait_id
             FROM assessment_attempts
             WHERE assessment_session_id = ? AND assessment_level_id = 1",
            [session_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    match row {
        Some((meta_column, dominant_trait_id)) => {
            let meta = AttemptMetadata::parse(meta_column.as_deref());
            Ok(Level1Data {
                disc_scores: meta.disc_scores_column(),
                dominant_trait_id,
            })
        }
        None => Ok(Level1Data {
            disc_scores: "{}".to_string(),
            dominant_trait_id: None,
        }),
    }
}
