//! Maps a metric snapshot into per-family display rows.
//!
//! The projector decides *what* a view shows (rows, rounded values, failure
//! flags); styling is left to the consumer.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{JobStatus, MetricSnapshot};
use crate::registry::{MetricFamily, MetricRegistry, Threshold};

/// Decimal places shown for metric values.
pub const DISPLAY_PLACES: u32 = 4;

/// Round to `places` decimals, ties to even.
///
/// Integral values pass through unchanged. A scaled value within
/// `f64::EPSILON` of a half is treated as a tie.
#[must_use]
pub fn round_half_even(value: f64, places: u32) -> f64 {
    if !value.is_finite() || value.fract() == 0.0 {
        return value;
    }
    let scale = 10f64.powi(places as i32);
    let scaled = value * scale;
    let rounded = if (scaled.abs().fract() - 0.5).abs() < f64::EPSILON {
        let floor = scaled.floor();
        if floor % 2.0 == 0.0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / scale
}

/// Escape text for an HTML view: `&`, `"`, `<`, `>` become entities and
/// newlines become `<br>`.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("<br>"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DisplayValue {
    Number(f64),
    Pending,
}

impl DisplayValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Pending => None,
        }
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Pending => f.write_str("…"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub name: String,
    pub value: DisplayValue,
    /// Consumers highlight failing rows.
    pub fails: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl DisplayRow {
    /// Explanation escaped for an HTML tooltip.
    pub fn explanation_html(&self) -> Option<String> {
        self.explanation.as_deref().map(escape_html)
    }
}

/// Display rows grouped by family.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Projection {
    pub status: JobStatus,
    pub reference_free: Vec<DisplayRow>,
    pub source_based: Vec<DisplayRow>,
    pub reference_based: Vec<DisplayRow>,
}

impl Projection {
    pub fn family(&self, family: MetricFamily) -> &[DisplayRow] {
        match family {
            MetricFamily::ReferenceFree => &self.reference_free,
            MetricFamily::SourceBased => &self.source_based,
            MetricFamily::ReferenceBased => &self.reference_based,
        }
    }

    fn family_mut(&mut self, family: MetricFamily) -> &mut Vec<DisplayRow> {
        match family {
            MetricFamily::ReferenceFree => &mut self.reference_free,
            MetricFamily::SourceBased => &mut self.source_based,
            MetricFamily::ReferenceBased => &mut self.reference_based,
        }
    }

    /// True while the backend is still computing; views show a pending
    /// placeholder for empty families.
    pub fn is_pending(&self) -> bool {
        !self.status.is_done()
    }

    pub fn is_empty(&self) -> bool {
        MetricFamily::ALL.iter().all(|f| self.family(*f).is_empty())
    }

    pub fn rows(&self) -> impl Iterator<Item = &DisplayRow> {
        self.reference_free
            .iter()
            .chain(&self.source_based)
            .chain(&self.reference_based)
    }

    pub fn failing(&self) -> impl Iterator<Item = &DisplayRow> {
        self.rows().filter(|r| r.fails)
    }
}

/// Builds [`Projection`]s from snapshots using a [`MetricRegistry`].
#[derive(Debug, Clone)]
pub struct ResultProjector {
    registry: Arc<MetricRegistry>,
}

impl Default for ResultProjector {
    fn default() -> Self {
        Self::new(Arc::new(MetricRegistry::default()))
    }
}

impl ResultProjector {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn project(&self, snapshot: &MetricSnapshot) -> Projection {
        let mut known: Vec<(usize, MetricFamily, DisplayRow)> = snapshot
            .metrics
            .iter()
            .filter_map(|(name, result)| {
                let position = self.registry.position(name)?;
                let family = self.registry.classify(name)?;
                let (value, evaluation) = match result.metric_value {
                    Some(v) => (
                        DisplayValue::Number(round_half_even(v, DISPLAY_PLACES)),
                        Some(self.registry.evaluate(name, v)),
                    ),
                    None => (DisplayValue::Pending, None),
                };
                Some((
                    position,
                    family,
                    DisplayRow {
                        name: name.clone(),
                        value,
                        fails: evaluation.is_some_and(|e| e.fails),
                        threshold: self.registry.get(name).and_then(|d| d.threshold),
                        explanation: result.explanation.clone(),
                    },
                ))
            })
            .collect();
        known.sort_by_key(|(position, _, _)| *position);

        let mut projection = Projection {
            status: snapshot.status,
            ..Projection::default()
        };
        for (_, family, row) in known {
            projection.family_mut(family).push(row);
        }
        projection
    }
}
