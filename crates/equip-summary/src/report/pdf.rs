//! PDF rendering of a [`ReportView`] with lopdf
//!
//! Produces an uncompressed A4 document using the standard Helvetica fonts.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::assembler::{format_optional, ReportView};
use crate::error::{Error, Result};

/// A4 in PDF points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const TOP: i64 = PAGE_HEIGHT - 60;
const BOTTOM_MARGIN: i64 = 80;
const LEFT: i64 = 50;

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

/// Accumulates text operations, starting a new page when the cursor runs low
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: TOP,
        }
    }

    fn ensure_room(&mut self) {
        if self.y < BOTTOM_MARGIN {
            self.pages.push(Vec::new());
            self.y = TOP;
        }
    }

    /// Draw one line of text and move the cursor down by `advance`
    fn text(&mut self, font: Font, size: i64, x: i64, text: &str, advance: i64) {
        self.row(font, size, &[(x, text.to_string())], advance);
    }

    /// Draw several cells on the same baseline
    fn row(&mut self, font: Font, size: i64, cells: &[(i64, String)], advance: i64) {
        self.ensure_room();
        let y = self.y;
        if let Some(ops) = self.pages.last_mut() {
            for (x, text) in cells {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(font.resource_name().to_vec()),
                        Object::Integer(size),
                    ],
                ));
                ops.push(Operation::new(
                    "Td",
                    vec![Object::Integer(*x), Object::Integer(y)],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(sanitize(text))],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
        }
        self.y -= advance;
    }

    fn gap(&mut self, points: i64) {
        self.y -= points;
    }
}

/// Helvetica with WinAnsi covers printable ASCII reliably
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// Render the report document
///
/// An empty view yields a single page stating that no uploads exist.
pub fn render_pdf(view: &ReportView) -> Result<Vec<u8>> {
    let mut writer = PageWriter::new();

    writer.text(Font::Bold, 16, LEFT, "CSV Report", 30);

    match &view.latest {
        None => {
            writer.text(Font::Regular, 12, LEFT, "No uploads yet.", 16);
        }
        Some(latest) => {
            writer.text(Font::Regular, 12, LEFT, &format!("Latest file: {}", latest.filename), 18);
            writer.text(Font::Regular, 12, LEFT, &format!("Uploaded at: {}", latest.uploaded_at), 28);

            writer.text(Font::Bold, 13, LEFT, "Latest Summary", 18);
            for metric in &view.metrics {
                writer.text(
                    Font::Regular,
                    12,
                    LEFT,
                    &format!("{}: {}", metric.label, metric.display),
                    16,
                );
            }
            writer.gap(10);

            writer.text(Font::Bold, 13, LEFT, "Type Distribution", 18);
            if view.type_distribution.is_empty() {
                writer.text(Font::Regular, 12, LEFT, "No type_distribution found.", 16);
            } else {
                for (value, count) in &view.type_distribution {
                    let label = if value.is_empty() { "(blank)" } else { value.as_str() };
                    writer.text(Font::Regular, 12, LEFT + 10, &format!("{}: {}", label, count), 16);
                }
            }
            writer.gap(10);

            writer.text(Font::Bold, 13, LEFT, "Recent Trend", 18);
            writer.row(
                Font::Bold,
                11,
                &trend_cells(["Upload", "Uploaded at", "Flowrate", "Pressure", "Temperature"]
                    .map(str::to_string)),
                15,
            );
            for point in &view.trend {
                writer.row(
                    Font::Regular,
                    11,
                    &trend_cells([
                        point.label.clone(),
                        point.uploaded_at.clone(),
                        format_optional(point.flowrate),
                        format_optional(point.pressure),
                        format_optional(point.temperature),
                    ]),
                    15,
                );
            }
        }
    }

    build_document(writer.pages)
}

fn trend_cells(values: [String; 5]) -> Vec<(i64, String)> {
    const COLUMNS: [i64; 5] = [LEFT, LEFT + 60, LEFT + 210, LEFT + 300, LEFT + 390];
    COLUMNS.into_iter().zip(values).collect()
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| Error::Pdf(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| Error::Pdf(format!("Failed to write PDF: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::assembler::{LatestUpload, ReportMetric, TrendPoint};

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn view_with_types(types: usize) -> ReportView {
        ReportView {
            latest: Some(LatestUpload {
                id: 7,
                filename: "plant.csv".to_string(),
                uploaded_at: "2024-03-01 08:00:00".to_string(),
            }),
            metrics: vec![
                ReportMetric { label: "Total equipment".to_string(), display: "12".to_string() },
                ReportMetric { label: "Avg flowrate".to_string(), display: "-".to_string() },
            ],
            type_distribution: (0..types).map(|i| (format!("type-{}", i), 1)).collect(),
            trend: vec![TrendPoint {
                id: 7,
                label: "#1".to_string(),
                filename: "plant.csv".to_string(),
                uploaded_at: "2024-03-01 08:00:00".to_string(),
                flowrate: Some(1.5),
                pressure: None,
                temperature: Some(20.0),
            }],
        }
    }

    #[test]
    fn test_empty_report_is_valid_pdf() {
        let view = ReportView::assemble(None, &[]);
        let bytes = render_pdf(&view).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, b"No uploads yet."));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_report_contains_summary_lines() {
        let bytes = render_pdf(&view_with_types(2)).unwrap();

        assert!(contains(&bytes, b"Latest file: plant.csv"));
        assert!(contains(&bytes, b"Total equipment: 12"));
        assert!(contains(&bytes, b"Avg flowrate: -"));
        assert!(contains(&bytes, b"type-1: 1"));
        assert!(contains(&bytes, b"1.50"));
    }

    #[test]
    fn test_long_distribution_spans_pages() {
        let bytes = render_pdf(&view_with_types(80)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn test_empty_distribution_message() {
        let bytes = render_pdf(&view_with_types(0)).unwrap();
        assert!(contains(&bytes, b"No type_distribution found."));
    }

    #[test]
    fn test_sanitize_non_ascii() {
        assert_eq!(sanitize("débit"), "d?bit");
    }
}
