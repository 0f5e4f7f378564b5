use serde::{Deserialize, Serialize};

use crate::domain::{InterviewConfig, Message, Plan, SessionId};

pub const DEFAULT_CATEGORY_MAX: f64 = 5.0;
pub const DEFAULT_MAX_TOTAL: f64 = 25.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub company: String,
    pub role: String,
    pub level: String,
    pub round_type: String,
}

impl From<&InterviewConfig> for StartSessionRequest {
    fn from(config: &InterviewConfig) -> Self {
        Self {
            company: config.company.clone(),
            role: config.role.clone(),
            level: config.level.clone(),
            round_type: config.round_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    pub plan: Plan,
}

/// Server-side session state. Only the transcript is consumed by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateResponse {
    #[serde(default)]
    pub conversation: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub reply: String,
    pub phase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExecuteRequest {
    pub session_id: SessionId,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExecuteResponse {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub scorecard: Scorecard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCategory {
    pub score: f64,
    #[serde(default = "default_category_max")]
    pub max: f64,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub overall: String,
    pub total: f64,
    #[serde(default = "default_max_total")]
    pub max_total: f64,
    /// Category scores in the order the evaluator reported them.
    #[serde(with = "ordered_scores")]
    pub scores: Vec<(String, ScoreCategory)>,
    #[serde(default)]
    pub summary: String,
}

fn default_category_max() -> f64 {
    DEFAULT_CATEGORY_MAX
}

fn default_max_total() -> f64 {
    DEFAULT_MAX_TOTAL
}

mod ordered_scores {
    use std::fmt;

    use serde::{
        de::{MapAccess, Visitor},
        Deserializer, Serializer,
    };

    use super::ScoreCategory;

    pub fn serialize<S>(scores: &[(String, ScoreCategory)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(scores.iter().map(|(key, category)| (key, category)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, ScoreCategory)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vec<(String, ScoreCategory)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category name to score")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut scores: Vec<(String, ScoreCategory)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                // A repeated key keeps its first position and takes the last value.
                while let Some((key, category)) = map.next_entry::<String, ScoreCategory>()? {
                    match scores.iter_mut().find(|(existing, _)| *existing == key) {
                        Some((_, slot)) => *slot = category,
                        None => scores.push((key, category)),
                    }
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
