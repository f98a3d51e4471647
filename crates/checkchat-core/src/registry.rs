//! Static classification of metric names into families and pass/fail policy.
//!
//! This is the only place that knows which metric belongs to which family.
//! Classification and projection both read from it.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Metric family. Decides the display table and the activation trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricFamily {
    ReferenceFree,
    SourceBased,
    /// Only present once a reference answer was submitted for the job.
    ReferenceBased,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [
        MetricFamily::ReferenceFree,
        MetricFamily::SourceBased,
        MetricFamily::ReferenceBased,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ReferenceFree => "Reference-free metrics",
            Self::SourceBased => "Source-based metrics",
            Self::ReferenceBased => "Reference-based metrics",
        }
    }
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReferenceFree => "reference-free",
            Self::SourceBased => "source-based",
            Self::ReferenceBased => "reference-based",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fails when the value is above the threshold (e.g. toxicity).
    Low,
    /// Fails when the value is below the threshold (e.g. fluency).
    High,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::High => "high",
        })
    }
}

/// Threshold and direction always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub threshold: f64,
    pub direction: Direction,
}

impl Threshold {
    pub fn low(threshold: f64) -> Self {
        Self {
            threshold,
            direction: Direction::Low,
        }
    }

    pub fn high(threshold: f64) -> Self {
        Self {
            threshold,
            direction: Direction::High,
        }
    }

    pub fn fails(&self, value: f64) -> bool {
        match self.direction {
            Direction::Low => value > self.threshold,
            Direction::High => value < self.threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDefinition {
    pub family: MetricFamily,
    /// `None` means display the raw value without a judgment.
    pub threshold: Option<Threshold>,
}

impl MetricDefinition {
    pub fn direction(&self) -> Option<Direction> {
        self.threshold.map(|t| t.direction)
    }
}

/// Result of [`MetricRegistry::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub fails: bool,
    pub threshold: Option<Threshold>,
}

/// Threshold override from the configuration file. `None` removes the
/// judgment for that metric.
pub type ThresholdOverrides = std::collections::BTreeMap<String, Option<Threshold>>;

/// Name → definition lookup, kept in declaration order.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    entries: Vec<(String, MetricDefinition)>,
    index: HashMap<String, usize>,
}

const FREE: MetricFamily = MetricFamily::ReferenceFree;
const SOURCE: MetricFamily = MetricFamily::SourceBased;
const REFERENCE: MetricFamily = MetricFamily::ReferenceBased;
const LOW: Option<(f64, Direction)> = Some((0.5, Direction::Low));
const HIGH: Option<(f64, Direction)> = Some((0.5, Direction::High));

static BUILTIN: &[(&str, MetricFamily, Option<(f64, Direction)>)] = &[
    ("request_toxicity", FREE, LOW),
    ("request_toxicity_openai", FREE, LOW),
    ("response_toxicity", FREE, LOW),
    ("response_toxicity_openai", FREE, LOW),
    ("request_sentiment", FREE, HIGH),
    ("request_sentiment_openai", FREE, HIGH),
    ("response_sentiment", FREE, HIGH),
    ("response_sentiment_openai", FREE, HIGH),
    ("request_fluency", FREE, HIGH),
    ("request_fluency_openai", FREE, HIGH),
    ("response_fluency", FREE, HIGH),
    ("response_fluency_openai", FREE, HIGH),
    ("request_readability", FREE, None),
    ("response_readability", FREE, None),
    ("ai_disclaimer_similarity", FREE, LOW),
    ("answer_relevance_openai", FREE, HIGH),
    ("factual_consistency", SOURCE, HIGH),
    ("factual_consistency_openai", SOURCE, HIGH),
    ("context_relevance_openai", SOURCE, HIGH),
    ("rouge1", REFERENCE, HIGH),
    ("rouge2", REFERENCE, HIGH),
    ("rougeL", REFERENCE, HIGH),
    ("semantic_similarity", REFERENCE, HIGH),
];

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl MetricRegistry {
    /// The dashboard's built-in metric set.
    pub fn builtin() -> &'static MetricRegistry {
        static BUILTIN_REGISTRY: OnceLock<MetricRegistry> = OnceLock::new();
        BUILTIN_REGISTRY.get_or_init(|| {
            Self::from_definitions(BUILTIN.iter().map(|(name, family, policy)| {
                (
                    name.to_string(),
                    MetricDefinition {
                        family: *family,
                        threshold: policy.map(|(threshold, direction)| Threshold {
                            threshold,
                            direction,
                        }),
                    },
                )
            }))
        })
    }

    pub fn from_definitions(defs: impl IntoIterator<Item = (String, MetricDefinition)>) -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };
        for (name, def) in defs {
            match registry.index.get(&name) {
                Some(&i) => registry.entries[i].1 = def,
                None => {
                    registry.index.insert(name.clone(), registry.entries.len());
                    registry.entries.push((name, def));
                }
            }
        }
        registry
    }

    /// Apply threshold overrides. Overriding a metric the registry does not
    /// know is a configuration error.
    pub fn with_overrides(mut self, overrides: &ThresholdOverrides) -> ClientResult<Self> {
        for (name, threshold) in overrides {
            let Some(&i) = self.index.get(name) else {
                return Err(ClientError::config(format!(
                    "threshold override for unknown metric '{}'",
                    name
                )));
            };
            if let Some(t) = threshold {
                if !t.threshold.is_finite() {
                    return Err(ClientError::config(format!(
                        "threshold for '{}' must be a finite number",
                        name
                    )));
                }
            }
            self.entries[i].1.threshold = *threshold;
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Family of a metric, or `None` for names the registry does not know.
    pub fn classify(&self, name: &str) -> Option<MetricFamily> {
        self.get(name).map(|d| d.family)
    }

    /// Judge a computed value. Unknown metrics and metrics without a
    /// threshold never fail.
    pub fn evaluate(&self, name: &str, value: f64) -> Evaluation {
        let threshold = self.get(name).and_then(|d| d.threshold);
        Evaluation {
            fails: threshold.map(|t| t.fails(value)).unwrap_or(false),
            threshold,
        }
    }

    /// Definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricDefinition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Position of a metric in declaration order.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_builtin_families() {
        let registry = MetricRegistry::builtin();
        assert_eq!(
            registry.classify("response_toxicity"),
            Some(MetricFamily::ReferenceFree)
        );
        assert_eq!(
            registry.classify("factual_consistency"),
            Some(MetricFamily::SourceBased)
        );
        assert_eq!(
            registry.classify("rougeL"),
            Some(MetricFamily::ReferenceBased)
        );
        assert_eq!(registry.classify("bleu"), None);
        assert_eq!(registry.len(), 23);
    }

    #[test]
    fn lookup_is_exact() {
        let registry = MetricRegistry::builtin();
        assert_eq!(registry.classify("toxicity"), None);
        assert_eq!(registry.classify("response_toxicity_openai_v2"), None);
        assert_eq!(registry.classify("ROUGEL"), None);
    }

    #[test]
    fn low_direction_fails_above_threshold() {
        let registry = MetricRegistry::builtin();
        for v in [0.0, 0.25, 0.5, 0.50001, 0.75, 1.0] {
            assert_eq!(registry.evaluate("response_toxicity", v).fails, v > 0.5);
        }
    }

    #[test]
    fn high_direction_fails_below_threshold() {
        let registry = MetricRegistry::builtin();
        for v in [0.0, 0.49999, 0.5, 0.75, 1.0] {
            assert_eq!(registry.evaluate("response_fluency", v).fails, v < 0.5);
        }
    }

    #[test]
    fn null_threshold_and_unknown_never_fail() {
        let registry = MetricRegistry::builtin();
        for v in [-100.0, 0.0, 0.5, 120.0] {
            assert!(!registry.evaluate("request_readability", v).fails);
            assert!(!registry.evaluate("not_a_metric", v).fails);
        }
        assert_eq!(registry.get("request_readability").unwrap().direction(), None);
    }

    #[test]
    fn overrides_replace_and_remove_thresholds() {
        let mut overrides = ThresholdOverrides::new();
        overrides.insert("response_toxicity".into(), Some(Threshold::low(0.2)));
        overrides.insert("rouge1".into(), None);

        let registry = MetricRegistry::default().with_overrides(&overrides).unwrap();
        assert!(registry.evaluate("response_toxicity", 0.3).fails);
        assert!(!registry.evaluate("rouge1", 0.0).fails);
        // family unchanged, order unchanged
        assert_eq!(
            registry.classify("rouge1"),
            Some(MetricFamily::ReferenceBased)
        );
        assert_eq!(registry.iter().next().unwrap().0, "request_toxicity");
    }

    #[test]
    fn override_for_unknown_metric_is_config_error() {
        let mut overrides = ThresholdOverrides::new();
        overrides.insert("bleu".into(), Some(Threshold::high(0.3)));
        let err = MetricRegistry::default()
            .with_overrides(&overrides)
            .unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }
}
