//! Report assembly and rendering

pub mod assembler;
pub mod pdf;

pub use assembler::{
    format_optional, format_value, LatestUpload, ReportMetric, ReportView, TrendPoint,
    PLACEHOLDER,
};
pub use pdf::render_pdf;
