//! Plain-text rendering of projections and the registry.

use std::fmt::Write as _;

use checkchat_core::{DisplayRow, MetricFamily, MetricRegistry, Projection, Threshold};

const NAME_WIDTH: usize = 28;

fn threshold_label(threshold: Option<Threshold>) -> String {
    match threshold {
        Some(t) => format!("{} {}", t.direction, t.threshold),
        None => "-".to_string(),
    }
}

fn render_row(out: &mut String, row: &DisplayRow) {
    let marker = if row.fails { "✗" } else { " " };
    let _ = writeln!(
        out,
        "  {} {:<width$} {:>8}   {}",
        marker,
        row.name,
        row.value.to_string(),
        threshold_label(row.threshold),
        width = NAME_WIDTH
    );
    if let Some(explanation) = &row.explanation {
        for line in explanation.lines() {
            let _ = writeln!(out, "      {}", line);
        }
    }
}

/// One block per family. Empty families show a placeholder while the job
/// is still computing.
pub fn render_projection(projection: &Projection) -> String {
    let mut out = String::new();
    for family in MetricFamily::ALL {
        let rows = projection.family(family);
        let _ = writeln!(out, "{}", family.label());
        if rows.is_empty() {
            let placeholder = if projection.is_pending() {
                "(computing…)"
            } else {
                "(none)"
            };
            let _ = writeln!(out, "  {}", placeholder);
        }
        for row in rows {
            render_row(&mut out, row);
        }
    }

    let failing = projection.failing().count();
    if failing > 0 {
        let _ = writeln!(out, "\n{} metric(s) outside threshold", failing);
    }
    out
}

pub fn render_registry(registry: &MetricRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$} {:<16} THRESHOLD",
        "METRIC",
        "FAMILY",
        width = NAME_WIDTH
    );
    for (name, def) in registry.iter() {
        let _ = writeln!(
            out,
            "{:<width$} {:<16} {}",
            name,
            def.family.to_string(),
            threshold_label(def.threshold),
            width = NAME_WIDTH
        );
    }
    out
}

pub fn registry_json(registry: &MetricRegistry) -> serde_json::Value {
    serde_json::Value::Array(
        registry
            .iter()
            .map(|(name, def)| {
                serde_json::json!({
                    "name": name,
                    "family": def.family,
                    "threshold": def.threshold,
                })
            })
            .collect(),
    )
}
