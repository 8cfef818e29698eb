//! Plain-text rendering of report data for terminals

use std::fmt::Write;

use crate::report::assembler::{format_optional, ReportView, TrendPoint};
use crate::types::HistoryEntry;

const BAR_WIDTH: usize = 30;
const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Summary block of the latest upload
pub fn render_summary(view: &ReportView) -> String {
    let mut out = String::new();
    match &view.latest {
        Some(latest) => {
            let _ = writeln!(out, "Latest file: {} (#{})", latest.filename, latest.id);
            let _ = writeln!(out, "Uploaded at: {}", latest.uploaded_at);
        }
        None => {
            out.push_str("No uploads yet.\n");
            return out;
        }
    }

    let width = view.metrics.iter().map(|m| m.label.len()).max().unwrap_or(0);
    for metric in &view.metrics {
        let _ = writeln!(out, "  {:<width$}  {}", metric.label, metric.display, width = width);
    }
    out
}

/// Horizontal bar chart of the type distribution
pub fn render_distribution(view: &ReportView) -> String {
    if view.type_distribution.is_empty() {
        return "No type_distribution found.\n".to_string();
    }

    let max = view.type_distribution.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1);
    let width = view
        .type_distribution
        .iter()
        .map(|(name, _)| display_type(name).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (name, count) in &view.type_distribution {
        let len = ((*count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "  {:<width$}  {} {}",
            display_type(name),
            "█".repeat(len.max(1)),
            count,
            width = width
        );
    }
    out
}

/// Trend table, oldest to newest, with a sparkline per series
pub fn render_trend(view: &ReportView) -> String {
    if view.trend.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<4} {:<24} {:>10} {:>10} {:>12}",
        "#", "File", "Flowrate", "Pressure", "Temperature"
    );
    for point in &view.trend {
        let _ = writeln!(
            out,
            "  {:<4} {:<24} {:>10} {:>10} {:>12}",
            point.label,
            truncate(&point.filename, 24),
            format_optional(point.flowrate),
            format_optional(point.pressure),
            format_optional(point.temperature)
        );
    }

    let series: [(&str, fn(&TrendPoint) -> Option<f64>); 3] = [
        ("Flowrate", |p| p.flowrate),
        ("Pressure", |p| p.pressure),
        ("Temperature", |p| p.temperature),
    ];
    out.push('\n');
    for (name, select) in series {
        let values: Vec<Option<f64>> = view.trend.iter().map(select).collect();
        let _ = writeln!(out, "  {:<12} {}", name, sparkline(&values));
    }
    out
}

/// History table, newest first
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No uploads yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>4}  {:<24} {:<19} {:>6} {:>10} {:>10} {:>12}",
        "ID", "File", "Uploaded at", "Rows", "Flowrate", "Pressure", "Temperature"
    );
    for entry in entries {
        let summary = &entry.summary;
        let _ = writeln!(
            out,
            "  {:>4}  {:<24} {:<19} {:>6} {:>10} {:>10} {:>12}",
            entry.id,
            truncate(&entry.filename, 24),
            entry.uploaded_at,
            summary.total_equipment(),
            format_optional(summary.avg_flowrate()),
            format_optional(summary.avg_pressure()),
            format_optional(summary.avg_temperature())
        );
    }
    out
}

/// Sparkline over present values; gaps render as spaces
pub fn sparkline(values: &[Option<f64>]) -> String {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (min, max) = present
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;

    values
        .iter()
        .map(|value| match value {
            None => ' ',
            Some(_) if span <= 0.0 => SPARK[SPARK.len() / 2],
            Some(v) => {
                let idx = ((v - min) / span * (SPARK.len() - 1) as f64).round() as usize;
                SPARK[idx.min(SPARK.len() - 1)]
            }
        })
        .collect()
}

fn display_type(name: &str) -> &str {
    if name.is_empty() {
        "(blank)"
    } else {
        name
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{summarize, SummarySchema};
    use crate::types::UploadRecord;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, csv: &str) -> UploadRecord {
        UploadRecord {
            id,
            filename: format!("plant-{}.csv", id),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id as u32).unwrap(),
            summary: summarize("x.csv", csv.as_bytes(), &SummarySchema::default()).unwrap(),
        }
    }

    #[test]
    fn test_empty_view_renders_placeholders() {
        let view = ReportView::assemble(None, &[]);
        assert_eq!(render_summary(&view), "No uploads yet.\n");
        assert_eq!(render_distribution(&view), "No type_distribution found.\n");
        assert!(render_trend(&view).is_empty());
        assert_eq!(render_history(&[]), "No uploads yet.\n");
    }

    #[test]
    fn test_summary_and_distribution() {
        let latest = record(7, "Type,Flowrate,Pressure\npump,10,1\nvalve,20,2\npump,30,3\n,5,5\n");
        let view = ReportView::assemble(Some(&latest), std::slice::from_ref(&latest));

        let summary = render_summary(&view);
        assert!(summary.contains("plant-7.csv"));
        assert!(summary.contains("16.25"));
        assert!(summary.contains("Avg temperature"));

        let chart = render_distribution(&view);
        let lines: Vec<_> = chart.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("pump"));
        assert!(lines[0].ends_with(" 2"));
        assert!(chart.contains("(blank)"));
    }

    #[test]
    fn test_trend_keeps_gaps() {
        let newest = record(2, "Type,Flowrate\npump,4\n");
        let oldest = record(1, "Type,Pressure\npump,9\n");
        let view = ReportView::assemble(Some(&newest), &[newest.clone(), oldest]);

        let text = render_trend(&view);
        let rows: Vec<_> = text.lines().skip(1).take(2).collect();
        assert!(rows[0].starts_with("  #2"));
        assert!(rows[1].starts_with("  #1"));
        assert!(rows[0].contains("9.00"));
        assert!(rows[1].contains("4.00"));
    }

    #[test]
    fn test_history_table() {
        let entries: Vec<HistoryEntry> = vec![
            record(3, "Type,Temperature\npump,70\n").into(),
            record(2, "Type\npump\n").into(),
        ];
        let text = render_history(&entries);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("plant-3.csv"));
        assert!(lines[1].contains("70.00"));
        assert!(lines[2].contains(" - "));
    }

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[Some(0.0), None, Some(7.0)]), "▁ █");
        assert_eq!(sparkline(&[Some(3.0), Some(3.0)]), "▅▅");
        assert_eq!(sparkline(&[None]), " ");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short.csv", 24), "short.csv");
        assert_eq!(truncate("abcdef", 4).chars().count(), 4);
    }
}
