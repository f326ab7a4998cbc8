use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::errors::{HookError, Result};

/// Agent name used when an event does not name one. Never aggregated in team metrics.
pub const UNKNOWN_AGENT: &str = "unknown";

/// The three persisted aggregate documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricsDoc {
    Delivery,
    Quality,
    Team,
}

impl MetricsDoc {
    #[cfg(test)]
    pub const ALL: [MetricsDoc; 3] = [MetricsDoc::Delivery, MetricsDoc::Quality, MetricsDoc::Team];

    /// File name of the document inside the metrics directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            MetricsDoc::Delivery => "delivery-metrics.json",
            MetricsDoc::Quality => "quality-metrics.json",
            MetricsDoc::Team => "team-metrics.json",
        }
    }
}

impl fmt::Display for MetricsDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Task-completion event read from stdin. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskEvent {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub feature: Option<String>,
}

impl TaskEvent {
    /// Parse a stdin payload. Blank input is the empty event.
    pub fn parse(payload: &str) -> Result<Self> {
        if payload.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(payload).map_err(|e| HookError::MalformedInput {
            details: format!("task event: {}", e),
        })
    }

    pub fn agent_or_unknown(&self) -> &str {
        self.agent.as_deref().unwrap_or(UNKNOWN_AGENT)
    }

    pub fn duration_or_zero(&self) -> f64 {
        self.duration_minutes.unwrap_or(0.0)
    }

    pub fn feature_or_unknown(&self) -> &str {
        self.feature.as_deref().unwrap_or("unknown")
    }
}

/// Reads an optional scalar, treating a value of another type as absent.
/// Used for summary fields that every update overwrites.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// One entry appended to `completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub task_id: String,
    pub completed_at: String,
    pub agent: String,
    pub duration: f64,
    pub quality_score: f64,
}

/// `delivery-metrics.json`
///
/// Existing completions are kept as raw JSON and never re-validated; keys this
/// tool does not know about survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    #[serde(default)]
    pub completions: Vec<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub total_tasks_completed: Option<usize>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry appended to `quality_scores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityEntry {
    pub timestamp: String,
    pub score: f64,
    pub agent: String,
    pub feature: String,
}

/// `quality-metrics.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    #[serde(default)]
    pub quality_scores: Vec<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rolling_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Numeric score of a stored quality entry, if it has one.
pub fn entry_score(entry: &Value) -> Option<f64> {
    entry.get("score").and_then(Value::as_f64)
}

/// Per-agent record inside `agent_performance`. Only the record being updated
/// is decoded; the others stay raw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub quality_scores: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_quality: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `team-metrics.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    #[serde(default)]
    pub agent_performance: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
