//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::lifecycle::Status;
use crate::{Error, Result};

/// Separator used when a multi-choice field is flattened into one column
pub const LIST_SEPARATOR: &str = "; ";

/// Separator between a project code and its description in a label
pub const PROJECT_LABEL_SEPARATOR: &str = " — ";

/// A recorded quality incident (RNC)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonConformity {
    pub id: i64,
    /// `YYYY-NNN`, assigned once at creation
    pub rnc_number: String,
    pub occurred_on: Option<NaiveDate>,
    pub issuer: String,
    pub area: String,
    pub project_code: Option<String>,
    pub title: String,
    pub inspector: String,
    pub description: String,
    pub references: String,
    pub cause: String,
    pub process: String,
    pub origin: String,
    pub corrective_action: String,
    pub severity: Option<Severity>,
    pub category: String,
    pub action_owner: String,
    pub status: Status,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub closing_notes: Option<String>,
    pub effectiveness: Option<Effectiveness>,
    pub reopened_at: Option<DateTime<Utc>>,
    pub reopened_by: Option<String>,
    pub reopening_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancel_reason: Option<String>,
}

/// Lifecycle event that produced a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Opening,
    Closing,
    Reopening,
}

impl Stage {
    /// Report order: opening photos first, then closing evidence, then reopening
    pub const ALL: [Stage; 3] = [Stage::Opening, Stage::Closing, Stage::Reopening];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Opening => "opening",
            Stage::Closing => "closing",
            Stage::Reopening => "reopening",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "opening" | "abertura" => Ok(Stage::Opening),
            "closing" | "encerramento" => Ok(Stage::Closing),
            "reopening" | "reabertura" => Ok(Stage::Reopening),
            other => Err(Error::InvalidInput(format!("unknown photo stage '{}'", other))),
        }
    }
}

/// Attachment metadata (payload loaded separately)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub record_id: i64,
    pub stage: Stage,
    pub filename: Option<String>,
    pub mime_type: String,
    pub size: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Photo payload ready to be stored
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub filename: Option<String>,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Project/cost-center code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCode {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
}

impl ProjectCode {
    /// `CODE — description`, the form stored on records
    pub fn label(&self) -> String {
        match self.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => {
                format!("{}{}{}", self.code, PROJECT_LABEL_SEPARATOR, desc)
            }
            _ => self.code.clone(),
        }
    }

    /// Split a `CODE — description` label into its parts
    pub fn split_label(label: &str) -> (String, Option<String>) {
        match label.split_once(PROJECT_LABEL_SEPARATOR) {
            Some((code, desc)) if !desc.trim().is_empty() => {
                (code.trim().to_string(), Some(desc.trim().to_string()))
            }
            Some((code, _)) => (code.trim().to_string(), None),
            None => (label.trim().to_string(), None),
        }
    }
}

/// Severity of the finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "baixa" => Ok(Severity::Low),
            "medium" | "média" | "media" => Ok(Severity::Medium),
            "high" | "alta" => Ok(Severity::High),
            "critical" | "crítica" | "critica" => Ok(Severity::Critical),
            other => Err(Error::InvalidInput(format!("unknown severity '{}'", other))),
        }
    }
}

/// Outcome of the effectiveness check made when closing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effectiveness {
    Pending,
    Effective,
    NotEffective,
}

impl Effectiveness {
    pub fn as_str(self) -> &'static str {
        match self {
            Effectiveness::Pending => "pending",
            Effectiveness::Effective => "effective",
            Effectiveness::NotEffective => "not_effective",
        }
    }
}

impl fmt::Display for Effectiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effectiveness {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "a verificar" => Ok(Effectiveness::Pending),
            "effective" | "eficaz" => Ok(Effectiveness::Effective),
            "not_effective" | "not effective" | "não eficaz" | "nao eficaz" => {
                Ok(Effectiveness::NotEffective)
            }
            other => Err(Error::InvalidInput(format!(
                "unknown effectiveness '{}'",
                other
            ))),
        }
    }
}

/// Flatten a multi-choice selection into one column value
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}
