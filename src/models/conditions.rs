//! Status conditions for Network resources
//!
//! Conditions follow the Available / Progressing / Degraded convention used by
//! cluster operators. Each condition type appears at most once in a status and
//! its `lastTransitionTime` only moves when the status value flips.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known condition types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    /// The network and its infrastructure are configured and usable.
    Available,
    /// The controller is actively working towards the desired state.
    Progressing,
    /// The network is impaired. Does not imply `Available=False`.
    Degraded,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Available => "Available",
            ConditionType::Progressing => "Progressing",
            ConditionType::Degraded => "Degraded",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            ConditionType::Available,
            ConditionType::Progressing,
            ConditionType::Degraded,
        ]
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(ConditionType::Available),
            "Progressing" => Ok(ConditionType::Progressing),
            "Degraded" => Ok(ConditionType::Degraded),
            _ => Err(format!("Unknown condition type: {}", s)),
        }
    }
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Machine-readable condition reasons set by this controller
pub mod reason {
    pub const INITIALIZING: &str = "Initializing";
    pub const NETWORK_AVAILABLE: &str = "NetworkAvailable";
    pub const FINALIZING: &str = "Finalizing";
    pub const FINALIZER_EXECUTED: &str = "Finalizer successfully executed";
    pub const FINALIZE_FAILED: &str = "FinalizeFailed";
    pub const CONVERGENCE_FAILED: &str = "ConvergenceFailed";
}

/// Message attached to every defaulted condition
pub const INITIALIZING_MESSAGE: &str = "Controller is initializing CR";

/// A single observation about the state of a resource
///
/// The type is stored as a plain string so conditions written by other
/// actors survive a read/write cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    pub last_transition_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Build a condition stamped with `now`
    pub fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            type_: type_.as_str().to_string(),
            status,
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: now,
            observed_generation: None,
        }
    }

    pub fn is(&self, type_: ConditionType) -> bool {
        self.type_ == type_.as_str()
    }
}

/// Find the condition of the given type
pub fn find_condition(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.is(type_))
}

/// Insert or update a condition, returning whether anything changed.
///
/// The transition time of an existing condition is kept unless its status
/// changes. Reason, message and observed generation are always taken from
/// `new`.
pub fn set_condition(conditions: &mut Vec<Condition>, new: Condition) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new.type_) else {
        conditions.push(new);
        return true;
    };

    let mut changed = false;
    if existing.status != new.status {
        existing.status = new.status;
        existing.last_transition_time = new.last_transition_time;
        changed = true;
    }
    if existing.reason != new.reason {
        existing.reason = new.reason;
        changed = true;
    }
    if existing.message != new.message {
        existing.message = new.message;
        changed = true;
    }
    if existing.observed_generation != new.observed_generation {
        existing.observed_generation = new.observed_generation;
        changed = true;
    }
    changed
}
