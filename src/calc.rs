use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-category agile scores for one level-2 attempt.
///
/// Every category is always present in the serialized form, even when the
/// attempt had no answers in it; `total` is the sum of the five categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgileScores {
    #[serde(rename = "Commitment")]
    pub commitment: f64,
    #[serde(rename = "Courage")]
    pub courage: f64,
    #[serde(rename = "Focus")]
    pub focus: f64,
    #[serde(rename = "Openness")]
    pub openness: f64,
    #[serde(rename = "Respect")]
    pub respect: f64,
    pub total: f64,
}

impl AgileScores {
    fn slot(&mut self, category: &str) -> Option<&mut f64> {
        match category {
            "Commitment" => Some(&mut self.commitment),
            "Courage" => Some(&mut self.courage),
            "Focus" => Some(&mut self.focus),
            "Openness" => Some(&mut self.openness),
            "Respect" => Some(&mut self.respect),
            _ => None,
        }
    }

    /// Exact category match first, then a capitalized-first-letter fallback.
    /// Returns false when neither matches; the caller drops the row.
    pub fn assign(&mut self, category: &str, value: f64) -> bool {
        if let Some(slot) = self.slot(category) {
            *slot = value;
            return true;
        }
        let capitalized = capitalize_first(category);
        if let Some(slot) = self.slot(&capitalized) {
            *slot = value;
            return true;
        }
        false
    }

    pub fn recompute_total(&mut self) {
        self.total = self.commitment + self.courage + self.focus + self.openness + self.respect;
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SincerityClass {
    Sincere,
    Borderline,
    NotSincere,
}

impl SincerityClass {
    /// Index >= 80 is SINCERE, >= 50 is BORDERLINE, below that NOT_SINCERE.
    pub fn from_index(index: f64) -> Self {
        if index >= 80.0 {
            SincerityClass::Sincere
        } else if index >= 50.0 {
            SincerityClass::Borderline
        } else {
            SincerityClass::NotSincere
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SincerityClass::Sincere => "SINCERE",
            SincerityClass::Borderline => "BORDERLINE",
            SincerityClass::NotSincere => "NOT_SINCERE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptScores {
    pub agile: AgileScores,
    pub sincerity_index: f64,
    pub sincerity_class: SincerityClass,
}

/// Recomputes agile scores and the sincerity index for one attempt from its
/// raw answers. Sums option score values grouped by question category; an
/// answer with no matching option contributes zero via the outer join.
/// Read-only.
pub fn compute_attempt_scores(conn: &Connection, attempt_id: i64) -> anyhow::Result<AttemptScores> {
    let mut agile = AgileScores::default();

    let mut stmt = conn.prepare(
        "SELECT q.category, COALESCE(SUM(o.score_value), 0)
         FROM assessment_answers a
         JOIN assessment_questions q ON a.main_question_id = q.id
         LEFT JOIN assessment_question_options o ON a.main_option_id = o.id
         WHERE a.assessment_attempt_id = ?
         GROUP BY q.category",
    )?;
    let rows = stmt.query_map([attempt_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?))
    })?;
    for row in rows {
        let (category, value) = row?;
        if !agile.assign(&category, value) {
            warn!(attempt_id, %category, "unrecognized answer category, dropping its score");
        }
    }
    agile.recompute_total();

    let (attention_fails, distractions_chosen): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN is_attention_fail THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_distraction_chosen THEN 1 ELSE 0 END), 0)
         FROM assessment_answers
         WHERE assessment_attempt_id = ?",
        [attempt_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    // 20 points per failed attention check, 10 per chosen distractor,
    // floored at zero. The flags are independent and may stack on one answer.
    let mut sincerity_index =
        100.0 - 20.0 * attention_fails as f64 - 10.0 * distractions_chosen as f64;
    if sincerity_index < 0.0 {
        sincerity_index = 0.0;
    }
    let sincerity_class = SincerityClass::from_index(sincerity_index);

    Ok(AttemptScores {
        agile,
        sincerity_index,
        sincerity_class,
    })
}
