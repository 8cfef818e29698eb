//! Upload ingestion: CSV parsing and summarization

pub mod summarizer;

pub use summarizer::{
    summarize, SummarySchema, FLOWRATE_COLUMN, PRESSURE_COLUMN, TEMPERATURE_COLUMN, TYPE_COLUMN,
};
