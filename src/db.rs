use rusqlite::Connection;
use std::path::Path;

pub fn open_db(db_path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS programs(
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_sessions(
            id INTEGER PRIMARY KEY,
            group_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            program_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'NOT_STARTED',
            is_report_ready INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_group ON assessment_sessions(group_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_attempts(
            id INTEGER PRIMARY KEY,
            assessment_session_id INTEGER NOT NULL,
            assessment_level_id INTEGER,
            status TEXT NOT NULL DEFAULT 'NOT_STARTED',
            metadata TEXT,
            total_score REAL,
            sincerity_index REAL,
            sincerity_class TEXT,
            dominant_trait_id INTEGER,
            completed_at TEXT,
            created_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(assessment_session_id) REFERENCES assessment_sessions(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attempts_session_level
         ON assessment_attempts(assessment_session_id, assessment_level_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_questions(
            id INTEGER PRIMARY KEY,
            category TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_question_options(
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            score_value REAL NOT NULL,
            FOREIGN KEY(question_id) REFERENCES assessment_questions(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_answers(
            id INTEGER PRIMARY KEY,
            assessment_attempt_id INTEGER NOT NULL,
            main_question_id INTEGER,
            main_option_id INTEGER,
            status TEXT NOT NULL DEFAULT 'SKIPPED',
            is_attention_fail INTEGER NOT NULL DEFAULT 0,
            is_distraction_chosen INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(assessment_attempt_id) REFERENCES assessment_attempts(id),
            FOREIGN KEY(main_question_id) REFERENCES assessment_questions(id),
            FOREIGN KEY(main_option_id) REFERENCES assessment_question_options(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_answers_attempt ON assessment_answers(assessment_attempt_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_reports(
            id INTEGER PRIMARY KEY,
            assessment_session_id INTEGER NOT NULL UNIQUE,
            report_number TEXT NOT NULL UNIQUE,
            generated_at TEXT,
            disc_scores TEXT NOT NULL DEFAULT '{}',
            agile_scores TEXT NOT NULL DEFAULT '{}',
            level3_scores TEXT NOT NULL DEFAULT '{}',
            level4_scores TEXT NOT NULL DEFAULT '{}',
            overall_sincerity REAL,
            dominant_trait_id INTEGER,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT,
            updated_at TEXT,
            FOREIGN KEY(assessment_session_id) REFERENCES assessment_sessions(id)
        )",
        [],
    )?;

    Ok(())
}
