use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;

use obi_maint::db;
use obi_maint::jobs::backfill;
use obi_maint::report::report_prefix;

fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    db::init_schema(&conn).expect("init schema");
    conn
}

fn seed_program(conn: &Connection, id: i64, code: &str) {
    conn.execute(
        "INSERT INTO programs (id, code) VALUES (?, ?)",
        rusqlite::params![id, code],
    )
    .expect("seed program");
}

fn seed_session(conn: &Connection, id: i64, group_id: i64, program_id: i64, status: &str) {
    conn.execute(
        "INSERT INTO assessment_sessions (id, group_id, user_id, program_id, status)
         VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![id, group_id, id, program_id, status],
    )
    .expect("seed session");
}

fn seed_attempt(
    conn: &Connection,
    id: i64,
    session_id: i64,
    level: i64,
    status: &str,
    metadata: Option<&str>,
    dominant_trait_id: Option<i64>,
) {
    conn.execute(
        "INSERT INTO assessment_attempts
         (id, assessment_session_id, assessment_level_id, status, metadata, dominant_trait_id)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![id, session_id, level, status, metadata, dominant_trait_id],
    )
    .expect("seed attempt");
}

fn seed_report(conn: &Connection, session_id: i64, report_number: &str) {
    conn.execute(
        "INSERT INTO assessment_reports (assessment_session_id, report_number)
         VALUES (?, ?)",
        rusqlite::params![session_id, report_number],
    )
    .expect("seed report");
}

const L2_META: &str = r#"{
    "agile_scores": {
        "Commitment": 2.0, "Courage": 1.0, "Focus": 3.0,
        "Openness": 0.0, "Respect": 1.0, "total": 7.0
    },
    "overall_sincerity": 90.0,
    "sincerity_class": "SINCERE"
}"#;

#[test]
fn backfill_inserts_missing_reports_and_marks_sessions_ready() {
    let mut conn = test_conn();
    seed_program(&conn, 7, "MBA");

    // Completed with scored metadata, no report.
    seed_session(&conn, 200, 29, 7, "COMPLETED");
    seed_attempt(
        &conn,
        1,
        200,
        1,
        "COMPLETED",
        Some(r#"{"disc_scores":{"D":7}}"#),
        Some(4),
    );
    seed_attempt(&conn, 2, 200, 2, "COMPLETED", Some(L2_META), None);

    // Completed but both metadata columns are NULL; defaults apply.
    seed_session(&conn, 202, 29, 7, "COMPLETED");
    seed_attempt(&conn, 3, 202, 1, "COMPLETED", None, None);
    seed_attempt(&conn, 4, 202, 2, "COMPLETED", None, None);

    // Already reported; must not be selected. Its number sits in an old
    // month bucket so it does not shift this run's sequence.
    seed_session(&conn, 201, 29, 7, "COMPLETED");
    seed_attempt(&conn, 5, 201, 1, "COMPLETED", None, None);
    seed_attempt(&conn, 6, 201, 2, "COMPLETED", None, None);
    seed_report(&conn, 201, "OBI-G29-01/20-MBA-001");

    let summary = backfill::run(&mut conn, 29).expect("run backfill");
    assert_eq!(summary.found, 2);
    assert_eq!(summary.succeeded, 2);
    assert!(summary.failed.is_empty());

    let (disc_scores, agile_scores, overall_sincerity, dominant_trait_id): (
        String,
        String,
        f64,
        Option<i64>,
    ) = conn
        .query_row(
            "SELECT disc_scores, agile_scores, overall_sincerity, dominant_trait_id
             FROM assessment_reports WHERE assessment_session_id = 200",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .expect("read report 200");
    let disc: Value = serde_json::from_str(&disc_scores).expect("disc json");
    assert_eq!(disc["D"], 7);
    let agile: Value = serde_json::from_str(&agile_scores).expect("agile json");
    assert_eq!(agile["Focus"], 3.0);
    assert_eq!(agile["total"], 7.0);
    assert_eq!(overall_sincerity, 90.0);
    assert_eq!(dominant_trait_id, Some(4));

    let (disc_202, agile_202, sincerity_202): (String, String, f64) = conn
        .query_row(
            "SELECT disc_scores, agile_scores, overall_sincerity
             FROM assessment_reports WHERE assessment_session_id = 202",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .expect("read report 202");
    assert_eq!(disc_202, "{}");
    assert_eq!(agile_202, "{}");
    assert_eq!(sincerity_202, 100.0);

    // Sequence numbers land in the current month/program bucket.
    let prefix = report_prefix(29, Utc::now(), "MBA");
    let mut numbers: Vec<String> = conn
        .prepare("SELECT report_number FROM assessment_reports WHERE report_number LIKE ?")
        .expect("prepare")
        .query_map([format!("{}%", prefix)], |r| r.get(0))
        .expect("query numbers")
        .collect::<Result<Vec<_>, _>>()
        .expect("collect numbers");
    numbers.sort();
    assert_eq!(
        numbers,
        vec![format!("{}001", prefix), format!("{}002", prefix)]
    );

    let ready: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM assessment_sessions WHERE is_report_ready = 1",
            [],
            |r| r.get(0),
        )
        .expect("count ready sessions");
    assert_eq!(ready, 2);

    let (status_201, ready_201): (String, i64) = conn
        .query_row(
            "SELECT status, is_report_ready FROM assessment_sessions WHERE id = 201",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .expect("read session 201");
    assert_eq!(status_201, "COMPLETED");
    assert_eq!(ready_201, 0);

    let report_count_201: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM assessment_reports WHERE assessment_session_id = 201",
            [],
            |r| r.get(0),
        )
        .expect("count reports 201");
    assert_eq!(report_count_201, 1);
}

#[test]
fn unknown_program_falls_back_to_unk_code() {
    let mut conn = test_conn();
    seed_session(&conn, 203, 29, 999, "COMPLETED");
    seed_attempt(&conn, 1, 203, 1, "COMPLETED", None, None);
    seed_attempt(&conn, 2, 203, 2, "COMPLETED", None, None);

    let summary = backfill::run(&mut conn, 29).expect("run backfill");
    assert_eq!(summary.succeeded, 1);

    let report_number: String = conn
        .query_row(
            "SELECT report_number FROM assessment_reports WHERE assessment_session_id = 203",
            [],
            |r| r.get(0),
        )
        .expect("read report number");
    assert_eq!(
        report_number,
        format!("{}001", report_prefix(29, Utc::now(), "UNK"))
    );
}
