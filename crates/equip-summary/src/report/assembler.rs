//! Report view assembly
//!
//! Denormalizes the latest upload and the retained history into the single
//! object consumed by both the PDF renderer and the client dashboard.

use serde::{Deserialize, Serialize};

use crate::types::UploadRecord;

/// Shown in place of an absent value
pub const PLACEHOLDER: &str = "-";

/// Identity of the most recent upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestUpload {
    pub id: i64,
    pub filename: String,
    pub uploaded_at: String,
}

/// One scalar line of the summary block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetric {
    pub label: String,
    /// Formatted value, or [`PLACEHOLDER`]
    pub display: String,
}

/// One retained upload on the trend axis
///
/// Absent averages stay `None` so renderers can skip them positionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub id: i64,
    /// Position label, `#1` being the most recent upload
    pub label: String,
    pub filename: String,
    pub uploaded_at: String,
    pub flowrate: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
}

/// Everything a renderer needs to draw the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    pub latest: Option<LatestUpload>,
    /// Total equipment and the three averages, in that order
    pub metrics: Vec<ReportMetric>,
    /// Type distribution of the latest upload, count descending
    pub type_distribution: Vec<(String, u64)>,
    /// Retained history, oldest to newest
    pub trend: Vec<TrendPoint>,
}

impl ReportView {
    /// Build the view from `latest()` and `list_recent(n)` (most recent first)
    pub fn assemble(latest: Option<&UploadRecord>, recent: &[UploadRecord]) -> Self {
        let summary = latest.map(|r| &r.summary);

        let metrics = vec![
            metric("Total equipment", summary.map(|s| s.total_equipment().to_string())),
            metric("Avg flowrate", summary.and_then(|s| s.avg_flowrate()).map(format_value)),
            metric("Avg pressure", summary.and_then(|s| s.avg_pressure()).map(format_value)),
            metric(
                "Avg temperature",
                summary.and_then(|s| s.avg_temperature()).map(format_value),
            ),
        ];

        let type_distribution = summary.map(|s| s.ranked_types()).unwrap_or_default();

        let trend = recent
            .iter()
            .enumerate()
            .rev()
            .map(|(position, record)| TrendPoint {
                id: record.id,
                label: format!("#{}", position + 1),
                filename: record.filename.clone(),
                uploaded_at: record.uploaded_at_display(),
                flowrate: record.summary.avg_flowrate(),
                pressure: record.summary.avg_pressure(),
                temperature: record.summary.avg_temperature(),
            })
            .collect();

        Self {
            latest: latest.map(|r| LatestUpload {
                id: r.id,
                filename: r.filename.clone(),
                uploaded_at: r.uploaded_at_display(),
            }),
            metrics,
            type_distribution,
            trend,
        }
    }

    /// True when no upload exists
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

fn metric(label: &str, value: Option<String>) -> ReportMetric {
    ReportMetric {
        label: label.to_string(),
        display: value.unwrap_or_else(|| PLACEHOLDER.to_string()),
    }
}

/// Two-decimal rendering used for averages
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

/// Two-decimal rendering, or [`PLACEHOLDER`] when absent
pub fn format_optional(value: Option<f64>) -> String {
    value.map(format_value).unwrap_or_else(|| PLACEHOLDER.to_string())
}
