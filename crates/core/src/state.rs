// Workflow state records
//
// One WorkflowState is the latest known status of a step (optionally scoped to
// a context such as a ballot box). Field names follow the backend's camelCase
// JSON, with snake_case accepted as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::step::WorkflowStep;

/// Status of a workflow step as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Idle,
    Ready,
    InProgress,
    Complete,
    Warning,
    Error,
}

impl WorkflowStatus {
    /// A step is unlocked once the backend moved it out of `Idle`.
    /// Unlocked steps may be visited, including finished or failed ones.
    pub fn is_unlocked(self) -> bool {
        self != WorkflowStatus::Idle
    }

    /// Neither waiting to be unlocked nor finished
    pub fn is_actionable(self) -> bool {
        !matches!(self, WorkflowStatus::Idle | WorkflowStatus::Complete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Idle => "IDLE",
            WorkflowStatus::Ready => "READY",
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::Complete => "COMPLETE",
            WorkflowStatus::Warning => "WARNING",
            WorkflowStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Composite identity of a WorkflowState
///
/// Displayed as `STEP` for global steps and `STEP-contextId` for
/// context-scoped ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub step: WorkflowStep,
    pub context_id: Option<String>,
}

impl StateKey {
    pub fn new(step: WorkflowStep, context_id: Option<String>) -> Self {
        Self { step, context_id }
    }

    pub fn global(step: WorkflowStep) -> Self {
        Self::new(step, None)
    }

    pub fn scoped(step: WorkflowStep, context_id: impl Into<String>) -> Self {
        Self::new(step, Some(context_id.into()))
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context_id {
            Some(context_id) => write!(f, "{}-{}", self.step, context_id),
            None => write!(f, "{}", self.step),
        }
    }
}

/// Latest known state of one workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub step: WorkflowStep,

    /// Sub-entity scope (ballot box id); `None` for global steps
    #[serde(default, alias = "context_id", skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    pub status: WorkflowStatus,

    #[serde(
        default,
        alias = "start_timestamp",
        deserialize_with = "timestamp::deserialize"
    )]
    pub start_timestamp: Option<DateTime<Utc>>,

    #[serde(
        default,
        alias = "end_timestamp",
        deserialize_with = "timestamp::deserialize"
    )]
    pub end_timestamp: Option<DateTime<Utc>>,

    /// Opaque failure code, only meaningful when `status` is `Error`
    #[serde(
        default,
        alias = "exception_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub exception_code: Option<String>,

    /// Whether completion of this step is NOT required to finish the workflow
    #[serde(default)]
    pub optional: bool,

    /// Backend-assigned monotonic update number, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl WorkflowState {
    /// Create a global, required state with no timestamps
    pub fn new(step: WorkflowStep, status: WorkflowStatus) -> Self {
        Self {
            step,
            context_id: None,
            status,
            start_timestamp: None,
            end_timestamp: None,
            exception_code: None,
            optional: false,
            sequence: None,
        }
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_exception(mut self, code: impl Into<String>) -> Self {
        self.exception_code = Some(code.into());
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_timestamps(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_timestamp = start;
        self.end_timestamp = end;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn key(&self) -> StateKey {
        StateKey::new(self.step.clone(), self.context_id.clone())
    }

    /// Whether this state belongs to the given key, without allocating one
    pub fn has_key(&self, key: &StateKey) -> bool {
        self.step == key.step && self.context_id == key.context_id
    }

    pub fn is_global(&self) -> bool {
        self.context_id.is_none()
    }
}

/// Backend timestamps arrive either as RFC 3339 instants or as zone-less
/// local date-times, which are taken as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|value| {
            parse(&value).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", value)))
        })
        .transpose()
    }

    fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
            return Some(instant.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|local| local.and_utc())
    }
}
