use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

/// Report numbers bucket by group, month/year, and program:
/// `OBI-G{group}-{MM/YY}-{code}-`.
pub fn report_prefix(group_id: i64, now: DateTime<Utc>, program_code: &str) -> String {
    format!("OBI-G{}-{}-{}-", group_id, now.format("%m/%y"), program_code)
}

/// Allocates the next report number in the group/month/program bucket by
/// counting existing numbers with the same prefix. A missing program row
/// falls back to code "UNK" rather than failing.
///
/// Count-then-insert is not atomic: two concurrent runs against the same
/// bucket can allocate the same number. Single-operator tool, so tolerated;
/// the UNIQUE column turns a collision into a per-record failure.
pub fn generate_report_number(
    conn: &Connection,
    group_id: i64,
    program_id: i64,
) -> anyhow::Result<String> {
    let program_code: Option<String> = conn
        .query_row("SELECT code FROM programs WHERE id = ?", [program_id], |r| {
            r.get(0)
        })
        .optional()?;
    let program_code = program_code.unwrap_or_else(|| "UNK".to_string());

    let prefix = report_prefix(group_id, Utc::now(), &program_code);
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM assessment_reports WHERE report_number LIKE ?",
        [format!("{}%", prefix)],
        |r| r.get(0),
    )?;

    Ok(format!("{}{:03}", prefix, count + 1))
}

#[derive(Debug, Clone)]
pub struct NewReport<'a> {
    pub session_id: i64,
    pub report_number: &'a str,
    pub disc_scores: &'a str,
    pub agile_scores: &'a str,
    pub overall_sincerity: f64,
    pub dominant_trait_id: Option<i64>,
}

pub fn insert_report(conn: &Connection, report: &NewReport<'_>, now: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO assessment_reports (
            assessment_session_id, report_number, generated_at,
            disc_scores, agile_scores, level3_scores, level4_scores,
            overall_sincerity, dominant_trait_id, metadata, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, '{}', '{}', ?, ?, '{}', ?, ?)",
        rusqlite::params![
            report.session_id,
            report.report_number,
            now,
            report.disc_scores,
            report.agile_scores,
            report.overall_sincerity,
            report.dominant_trait_id,
            now,
            now
        ],
    )?;
    Ok(())
}

/// Repair re-runs touch only the score fields of an existing report; the
/// report number and everything else stay as generated.
pub fn update_report_scores(
    conn: &Connection,
    report_id: i64,
    agile_scores: &str,
    overall_sincerity: f64,
    now: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE assessment_reports
         SET agile_scores = ?, overall_sincerity = ?, updated_at = ?
         WHERE id = ?",
        rusqlite::params![agile_scores, overall_sincerity, now, report_id],
    )?;
    Ok(())
}

pub fn find_report_id(conn: &Connection, session_id: i64) -> anyhow::Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM assessment_reports WHERE assessment_session_id = ?",
            [session_id],
            |r| r.get(0),
        )
        .optional()?)
}
