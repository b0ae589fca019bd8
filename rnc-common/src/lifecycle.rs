//! Record lifecycle
//!
//! A non-conformity starts `open`, is `closed` once corrective action is
//! verified, may be `reopened` after closing (and closed again), and can be
//! `cancelled` from any live state. `cancelled` is terminal: the only thing
//! left to do with a cancelled record is hard-delete it.
//!
//! ```text
//!   open ──close──▶ closed ──reopen──▶ reopened
//!     │               ▲ │                 │
//!     │               │ └─────────────────┼──close──┐
//!     │               └───────────────────┘         │
//!     └──────cancel──▶ cancelled ◀──cancel──────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{Error, Result};

/// Record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Closed,
    Reopened,
    Cancelled,
}

/// User action that moves a record between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Close,
    Reopen,
    Cancel,
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {transition} a record that is {from}")]
pub struct TransitionError {
    pub from: Status,
    pub transition: Transition,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Open,
        Status::Closed,
        Status::Reopened,
        Status::Cancelled,
    ];

    /// Database/export representation
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
            Status::Reopened => "reopened",
            Status::Cancelled => "cancelled",
        }
    }

    /// Compute the state reached by applying `transition`
    pub fn apply(self, transition: Transition) -> std::result::Result<Status, TransitionError> {
        use Status::*;
        use Transition::*;

        match (self, transition) {
            (Open, Close) | (Reopened, Close) => Ok(Closed),
            (Closed, Reopen) => Ok(Reopened),
            (Open, Cancel) | (Closed, Cancel) | (Reopened, Cancel) => Ok(Cancelled),
            (Closed, Close) | (Open, Reopen) | (Reopened, Reopen) | (Cancelled, _) => {
                Err(TransitionError {
                    from: self,
                    transition,
                })
            }
        }
    }

    /// Whether descriptive fields and attachments may still change
    pub fn is_editable(self) -> bool {
        !matches!(self, Status::Cancelled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    /// Accepts the English names and the labels used by the legacy
    /// spreadsheet register (`Aberta`, `Encerrada`, `Em ação`, ...).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" | "aberta" => Ok(Status::Open),
            "closed" | "encerrada" => Ok(Status::Closed),
            "reopened" | "reaberta" | "em ação" | "em acao" => Ok(Status::Reopened),
            "cancelled" | "canceled" | "cancelada" => Ok(Status::Cancelled),
            other => Err(Error::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Close => "close",
            Transition::Reopen => "reopen",
            Transition::Cancel => "cancel",
        }
    }

    /// Human name of the free-text field this transition cannot do without
    pub fn required_text(self) -> &'static str {
        match self {
            Transition::Close => "closing notes",
            Transition::Reopen => "reopening reason",
            Transition::Cancel => "cancellation reason",
        }
    }

    /// Validate the mandatory text and actor of a transition request,
    /// returning both trimmed.
    pub fn check_request(self, actor: &str, text: &str) -> Result<(String, String)> {
        let actor = require_text("actor name", actor)?;
        let text = require_text(self.required_text(), text)?;
        Ok((actor, text))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim `value` and reject it if nothing is left
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
