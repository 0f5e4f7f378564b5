use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const MAX_COMPANY_LEN: usize = 100;

pub const KNOWN_ROLES: &[&str] = &["SDE", "Data Analyst"];
pub const KNOWN_LEVELS: &[&str] = &["Intern", "SDE1", "SDE2"];
pub const KNOWN_ROUND_TYPES: &[&str] = &["DSA", "SQL", "ML", "System Design"];

/// Opaque session identifier minted by the interview server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Planning,
    Question,
    Clarification,
    Complexity,
    EdgeCases,
    Coding,
    Evaluating,
    Completed,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Planning,
        Phase::Question,
        Phase::Clarification,
        Phase::Complexity,
        Phase::EdgeCases,
        Phase::Coding,
        Phase::Evaluating,
        Phase::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Question => "question",
            Phase::Clarification => "clarification",
            Phase::Complexity => "complexity",
            Phase::EdgeCases => "edge_cases",
            Phase::Coding => "coding",
            Phase::Evaluating => "evaluating",
            Phase::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Planning => "Planning",
            Phase::Question => "Question",
            Phase::Clarification => "Clarification",
            Phase::Complexity => "Complexity",
            Phase::EdgeCases => "Edge Cases",
            Phase::Coding => "Coding",
            Phase::Evaluating => "Evaluating...",
            Phase::Completed => "Completed",
        }
    }

    /// Phases a chat reply may declare. The rest are owned by the client
    /// lifecycle (`planning` before start, `evaluating`/`completed` around
    /// evaluation).
    pub fn is_server_declared(self) -> bool {
        matches!(
            self,
            Phase::Question
                | Phase::Clarification
                | Phase::Complexity
                | Phase::EdgeCases
                | Phase::Coding
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown interview phase '{0}'")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == raw)
            .ok_or_else(|| UnknownPhase(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parses an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_timestamp(&raw).map_err(de::Error::custom))
        .transpose()
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewConfig {
    pub company: String,
    pub role: String,
    pub level: String,
    pub round_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("company must not be empty")]
    EmptyCompany,
    #[error("company must be at most {MAX_COMPANY_LEN} characters")]
    CompanyTooLong,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

impl InterviewConfig {
    pub fn new(
        company: impl Into<String>,
        role: impl Into<String>,
        level: impl Into<String>,
        round_type: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            role: role.into(),
            level: level.into(),
            round_type: round_type.into(),
        }
    }

    /// Returns a trimmed copy, or the first field that cannot be sent.
    pub fn validate(&self) -> Result<Self, ConfigValidationError> {
        let company = self.company.trim();
        if company.is_empty() {
            return Err(ConfigValidationError::EmptyCompany);
        }
        if company.chars().count() > MAX_COMPANY_LEN {
            return Err(ConfigValidationError::CompanyTooLong);
        }

        let field = |value: &str, name: &'static str| {
            let value = value.trim();
            if value.is_empty() {
                Err(ConfigValidationError::EmptyField(name))
            } else {
                Ok(value.to_string())
            }
        };

        Ok(Self {
            company: company.to_string(),
            role: field(&self.role, "role")?,
            level: field(&self.level, "level")?,
            round_type: field(&self.round_type, "round type")?,
        })
    }
}

/// Interview plan produced by the planner at session start. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub duration_minutes: i64,
    pub difficulty: String,
    pub persona: String,
    #[serde(rename = "question_topic_hint")]
    pub topic_hint: String,
    pub ai_policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_expectations: Option<String>,
}
