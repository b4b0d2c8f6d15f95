use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::calc::{AgileScores, AttemptScores, SincerityClass};

/// The free-form metadata document stored on an attempt row, with the keys
/// this tool reads or writes typed out. Unrecognized keys survive a
/// parse/merge/serialize round trip via the flattened map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agile_scores: Option<AgileScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_sincerity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sincerity_class: Option<SincerityClass>,
    /// Marks a repaired completion as opposed to a natural one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_score: Option<bool>,
    /// Written by the level-1 trait profiling pipeline; only read here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_scores: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AttemptMetadata {
    /// Parses the metadata column. NULL, blank, or malformed text all yield
    /// the empty document; a parse failure is logged since it loses whatever
    /// the column held.
    pub fn parse(column: Option<&str>) -> Self {
        let Some(raw) = column else {
            return Self::default();
        };
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "malformed attempt metadata, starting from an empty document");
                Self::default()
            }
        }
    }

    /// Merges freshly computed scores in, preserving every other key.
    pub fn apply_scores(&mut self, scores: &AttemptScores) {
        self.agile_scores = Some(scores.agile);
        self.overall_sincerity = Some(scores.sincerity_index);
        self.sincerity_class = Some(scores.sincerity_class);
        self.partial_score = Some(true);
    }

    pub fn to_column(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The `disc_scores` sub-document as report column text, `{}` if absent.
    pub fn disc_scores_column(&self) -> String {
        self.disc_scores
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "{}".to_string())
    }

    /// The `agile_scores` sub-document as report column text, `{}` if absent.
    pub fn agile_scores_column(&self) -> anyhow::Result<String> {
        match &self.agile_scores {
            Some(scores) => Ok(serde_json::to_string(scores)?),
            None => Ok("{}".to_string()),
        }
    }
}
