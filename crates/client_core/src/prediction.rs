use std::collections::BTreeMap;

use serde::Serialize;
use shared::protocol::{CollegeInsights, CollegeMatch, PlacementRecord, PredictionResponse};

use crate::reconcile::{reconcile, HistoricalRow, PredictedMetrics, ReconciledSeries, SeriesBuilder};

/// Chart model for the prediction screen.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub college: String,
    pub series: ReconciledSeries,
    pub historical_rows: usize,
    pub predicted_years: usize,
}

impl PredictionView {
    pub fn build(query: &str, history: &[PlacementRecord], response: &PredictionResponse) -> Self {
        let historical: Vec<HistoricalRow> = history.iter().map(HistoricalRow::from).collect();
        let predicted: BTreeMap<String, PredictedMetrics> = response
            .predictions
            .iter()
            .map(|(label, year)| (label.clone(), PredictedMetrics::from(year)))
            .collect();

        Self {
            college: response
                .college
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| query.trim().to_string()),
            series: reconcile(&historical, &predicted),
            historical_rows: historical.len(),
            predicted_years: predicted.len(),
        }
    }
}

/// Historical rows from the insights payload; a year present in either the
/// placement or the salary trend yields one row.
pub fn insights_history(insights: &CollegeInsights) -> Vec<HistoricalRow> {
    let mut rows: BTreeMap<&str, HistoricalRow> = BTreeMap::new();
    for (year, placement) in &insights.placement_trends {
        rows.entry(year.as_str())
            .or_insert_with(|| HistoricalRow::new(year.clone()))
            .placement_rate = *placement;
    }
    for (year, salary) in &insights.salary_trends {
        rows.entry(year.as_str())
            .or_insert_with(|| HistoricalRow::new(year.clone()))
            .salary = salary.median;
    }
    rows.into_values().collect()
}

pub fn insights_series(insights: &CollegeInsights) -> ReconciledSeries {
    let mut builder = SeriesBuilder::new();
    for row in insights_history(insights) {
        builder.push_historical(&row);
    }
    builder.finish()
}

/// Placement trend of a finder result as a sorted series.
pub fn finder_trend_series(college: &CollegeMatch) -> ReconciledSeries {
    let mut builder = SeriesBuilder::new();
    for (year, placement) in &college.placement_trend {
        builder.push_historical(&HistoricalRow {
            placement_rate: *placement,
            ..HistoricalRow::new(year.clone())
        });
    }
    builder.finish()
}
