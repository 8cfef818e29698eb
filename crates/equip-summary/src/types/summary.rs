//! Aggregate statistics computed from one uploaded equipment table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one uploaded table
///
/// Fields are private: a summary is produced once by the summarizer (or
/// decoded from storage/API payloads) and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of data rows (header excluded)
    total_equipment: u64,
    /// Mean of the `Flowrate` column, `None` when absent or empty
    avg_flowrate: Option<f64>,
    /// Mean of the `Pressure` column
    avg_pressure: Option<f64>,
    /// Mean of the `Temperature` column
    avg_temperature: Option<f64>,
    /// Occurrence count per distinct `Type` value
    #[serde(default)]
    type_distribution: BTreeMap<String, u64>,
}

impl Summary {
    pub(crate) fn new(
        total_equipment: u64,
        avg_flowrate: Option<f64>,
        avg_pressure: Option<f64>,
        avg_temperature: Option<f64>,
        type_distribution: BTreeMap<String, u64>,
    ) -> Self {
        Self {
            total_equipment,
            avg_flowrate,
            avg_pressure,
            avg_temperature,
            type_distribution,
        }
    }

    pub fn total_equipment(&self) -> u64 {
        self.total_equipment
    }

    pub fn avg_flowrate(&self) -> Option<f64> {
        self.avg_flowrate
    }

    pub fn avg_pressure(&self) -> Option<f64> {
        self.avg_pressure
    }

    pub fn avg_temperature(&self) -> Option<f64> {
        self.avg_temperature
    }

    pub fn type_distribution(&self) -> &BTreeMap<String, u64> {
        &self.type_distribution
    }

    /// Distribution entries ordered by count (descending), then value
    pub fn ranked_types(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(String, u64)> = self
            .type_distribution
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_average_serializes_as_null() {
        let summary = Summary::new(0, None, Some(2.0), None, BTreeMap::new());
        let json = serde_json::to_value(&summary).unwrap();

        assert!(json["avg_flowrate"].is_null());
        assert_eq!(json["avg_pressure"], 2.0);
        assert_eq!(json["total_equipment"], 0);
    }

    #[test]
    fn test_ranked_types() {
        let mut dist = BTreeMap::new();
        dist.insert("valve".to_string(), 2);
        dist.insert("pump".to_string(), 5);
        dist.insert("compressor".to_string(), 2);
        let summary = Summary::new(9, None, None, None, dist);

        let ranked = summary.ranked_types();
        assert_eq!(ranked[0], ("pump".to_string(), 5));
        assert_eq!(ranked[1], ("compressor".to_string(), 2));
        assert_eq!(ranked[2], ("valve".to_string(), 2));
    }
}
