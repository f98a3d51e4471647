//! Wire and domain types for the dashboard protocol.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque job identifier issued by the backend.
///
/// The backend issues integer row ids today; both JSON numbers and strings
/// are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(Self(n.to_string())),
            Raw::Text(s) if s.trim().is_empty() => {
                Err(serde::de::Error::custom("job id must not be empty"))
            }
            Raw::Text(s) => Ok(Self(s)),
        }
    }
}

/// Answer language requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ja,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ja => "ja",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ja" => Ok(Self::Ja),
            other => Err(format!("unsupported language '{}' (expected en or ja)", other)),
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub language: Language,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Job id used as the polling key.
    pub id: JobId,

    /// Generated answer text.
    pub response: String,

    /// Source-consistency score computed synchronously by the backend.
    #[serde(default)]
    pub score: Option<f64>,

    /// Hallucination warning (backend sets it when the score is below 0.5).
    #[serde(default)]
    pub warning: bool,

    /// Retrieved source text the answer was grounded on.
    #[serde(default)]
    pub source: String,
}

/// Body of `POST /ref_metric`.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceRequest {
    pub log_id: JobId,
    pub reference: String,
}

/// Acknowledgement of `POST /ref_metric`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReferenceAck {
    #[serde(default = "ack_default")]
    pub success: bool,
}

fn ack_default() -> bool {
    true
}

/// Backend computation status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    New,
    Done,
    /// Any status string other than `new` or `done`.
    #[serde(other)]
    InProgress,
}

impl JobStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        })
    }
}

/// One named metric's value for a job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricResult {
    /// `None` while the backend is still computing; non-numeric values are
    /// read as `None` as well.
    #[serde(default, deserialize_with = "lenient_number")]
    pub metric_value: Option<f64>,

    /// Present only for explanation-capable evaluators.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl MetricResult {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn value(value: f64) -> Self {
        Self {
            metric_value: Some(value),
            explanation: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.metric_value.is_none()
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_f64()).filter(|v| v.is_finite()))
}

/// One response of `GET /metrics/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawSnapshot")]
pub struct MetricSnapshot {
    pub status: JobStatus,
    pub metrics: BTreeMap<String, MetricResult>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    status: JobStatus,
    #[serde(flatten)]
    entries: BTreeMap<String, serde_json::Value>,
}

impl From<RawSnapshot> for MetricSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        let mut metrics = BTreeMap::new();
        for (name, value) in raw.entries {
            if !value.is_object() {
                tracing::trace!(key = %name, "ignoring non-metric snapshot entry");
                continue;
            }
            match serde_json::from_value::<MetricResult>(value) {
                Ok(result) => {
                    metrics.insert(name, result);
                }
                Err(e) => tracing::debug!(key = %name, error = %e, "skipping malformed metric"),
            }
        }
        Self {
            status: raw.status,
            metrics,
        }
    }
}

impl Serialize for MetricSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len() + 1))?;
        map.serialize_entry("status", &self.status)?;
        for (name, result) in &self.metrics {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

impl MetricSnapshot {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, result: MetricResult) -> Self {
        self.metrics.insert(name.into(), result);
        self
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn get(&self, name: &str) -> Option<&MetricResult> {
        self.metrics.get(name)
    }
}

/// Client-side view of one evaluated (prompt, response) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub metrics: BTreeMap<String, MetricResult>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::New,
            metrics: BTreeMap::new(),
        }
    }

    /// Merge a snapshot into the job.
    ///
    /// Keys are never removed and a computed value is never replaced by a
    /// pending one. Within a cycle, `done` does not revert.
    pub fn apply(&mut self, snapshot: &MetricSnapshot) {
        for (name, incoming) in &snapshot.metrics {
            match self.metrics.get_mut(name) {
                Some(existing) if incoming.is_pending() && !existing.is_pending() => {}
                Some(existing) => *existing = incoming.clone(),
                None => {
                    self.metrics.insert(name.clone(), incoming.clone());
                }
            }
        }
        if !self.status.is_done() {
            self.status = snapshot.status;
        }
    }

    /// Start a new trigger cycle (reference submission): status goes back to
    /// `new`, metrics are kept.
    pub fn begin_cycle(&mut self) {
        self.status = JobStatus::New;
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            status: self.status,
            metrics: self.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_id_accepts_numbers_and_strings() {
        let a: JobId = serde_json::from_value(json!(42)).unwrap();
        let b: JobId = serde_json::from_value(json!("abc123")).unwrap();
        assert_eq!(a.as_str(), "42");
        assert_eq!(b.as_str(), "abc123");
        assert!(serde_json::from_value::<JobId>(json!("  ")).is_err());
    }

    #[test]
    fn snapshot_parses_status_and_metrics() {
        let snapshot: MetricSnapshot = serde_json::from_value(json!({
            "status": "done",
            "factual_consistency": {"metric_value": 0.92, "explanation": null},
            "factual_consistency_openai": {"metric_value": 0.8, "explanation": "grounded"},
            "response_toxicity": {"metric_value": null, "explanation": null},
            "log_id": 3
        }))
        .unwrap();

        assert!(snapshot.is_done());
        assert_eq!(snapshot.metrics.len(), 3);
        assert_eq!(
            snapshot.get("factual_consistency").unwrap().metric_value,
            Some(0.92)
        );
        assert_eq!(
            snapshot
                .get("factual_consistency_openai")
                .unwrap()
                .explanation
                .as_deref(),
            Some("grounded")
        );
        assert!(snapshot.get("response_toxicity").unwrap().is_pending());
    }

    #[test]
    fn snapshot_without_status_is_new_and_unknown_status_is_in_progress() {
        let empty: MetricSnapshot = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.status, JobStatus::New);

        let running: MetricSnapshot =
            serde_json::from_value(json!({"status": "computing"})).unwrap();
        assert_eq!(running.status, JobStatus::InProgress);
    }

    #[test]
    fn non_numeric_metric_value_reads_as_pending() {
        let snapshot: MetricSnapshot = serde_json::from_value(json!({
            "status": "new",
            "rouge1": {"metric_value": "n/a"}
        }))
        .unwrap();
        assert!(snapshot.get("rouge1").unwrap().is_pending());
    }

    #[test]
    fn snapshot_serializes_flat() {
        let snapshot = MetricSnapshot::new(JobStatus::Done)
            .with_metric("rouge1", MetricResult::value(0.5));
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["status"], "done");
        assert_eq!(value["rouge1"]["metric_value"], 0.5);
    }

    #[test]
    fn job_apply_accumulates_keys_and_keeps_computed_values() {
        let mut job = Job::new(JobId::from("1"));
        job.apply(
            &MetricSnapshot::new(JobStatus::Done)
                .with_metric("factual_consistency", MetricResult::value(0.7)),
        );

        job.begin_cycle();
        job.apply(
            &MetricSnapshot::new(JobStatus::New)
                .with_metric("factual_consistency", MetricResult::pending())
                .with_metric("rouge1", MetricResult::pending()),
        );

        assert_eq!(job.status, JobStatus::New);
        assert_eq!(job.metrics.len(), 2);
        assert_eq!(
            job.metrics["factual_consistency"].metric_value,
            Some(0.7)
        );
    }

    #[test]
    fn job_done_does_not_revert_within_cycle() {
        let mut job = Job::new(JobId::from("1"));
        job.apply(&MetricSnapshot::new(JobStatus::Done));
        job.apply(&MetricSnapshot::new(JobStatus::New));
        assert_eq!(job.status, JobStatus::Done);
    }

    #[test]
    fn language_parsing() {
        assert_eq!("JA".parse::<Language>().unwrap(), Language::Ja);
        assert!("fr".parse::<Language>().is_err());
        assert_eq!(serde_json::to_value(Language::En).unwrap(), json!("en"));
    }
}
