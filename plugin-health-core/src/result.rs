//! Probe outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Verdict of one probe invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    /// The probe evaluated the plugin and found the positive condition.
    Success,
    /// The probe evaluated the plugin and found the negative condition.
    Failure,
    /// The probe could not reach a verdict.
    Error,
    /// The probe did not need to run; the previous result is still current.
    Skipped,
}

impl ResultStatus {
    /// Upper-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Error => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }
}

/// Immutable outcome of one probe invocation.
///
/// A new value is produced every time a probe runs; the plugin record replaces
/// the previous result for the same key instead of editing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    id: String,
    status: ResultStatus,
    #[schema(value_type = Object)]
    message: Value,
    #[schema(value_type = String, format = DateTime)]
    timestamp: DateTime<Utc>,
    schema_version: u32,
}

impl ProbeResult {
    /// Build a result stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        status: ResultStatus,
        message: impl Into<Value>,
        schema_version: u32,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            message: message.into(),
            timestamp: Utc::now(),
            schema_version,
        }
    }

    /// Successful verdict.
    pub fn success(id: impl Into<String>, schema_version: u32, message: impl Into<Value>) -> Self {
        Self::new(id, ResultStatus::Success, message, schema_version)
    }

    /// Negative verdict.
    pub fn failure(id: impl Into<String>, schema_version: u32, message: impl Into<Value>) -> Self {
        Self::new(id, ResultStatus::Failure, message, schema_version)
    }

    /// The probe could not evaluate the plugin.
    pub fn error(id: impl Into<String>, schema_version: u32, message: impl Into<Value>) -> Self {
        Self::new(id, ResultStatus::Error, message, schema_version)
    }

    /// The probe was not executed.
    pub fn skipped(id: impl Into<String>, schema_version: u32, message: impl Into<Value>) -> Self {
        Self::new(id, ResultStatus::Skipped, message, schema_version)
    }

    /// Return a copy carrying another timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Key of the probe that produced this result.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Verdict.
    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Producer-defined payload.
    pub fn message(&self) -> &Value {
        &self.message
    }

    /// Payload as display text; strings are returned without quotes.
    pub fn message_text(&self) -> String {
        match &self.message {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    /// When the result was produced.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Version of the probe logic that produced the result.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Whether the status is [`ResultStatus::Success`].
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Whether the status is [`ResultStatus::Error`].
    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Error
    }

    /// Compare everything except the timestamp.
    pub fn same_outcome(&self, other: &ProbeResult) -> bool {
        self.id == other.id
            && self.status == other.status
            && self.message == other.message
            && self.schema_version == other.schema_version
    }

    pub(crate) fn with_identity(mut self, id: &str, schema_version: u32) -> Self {
        if self.id != id {
            self.id = id.to_string();
        }
        self.schema_version = schema_version;
        self
    }
}
