//! Merges historical placement rows and model predictions into a single
//! chart-ready timeline keyed by academic year.
//!
//! Points are identified by the `(year_key, year_label)` pair. Two labels that
//! normalise to the same key but differ textually (`"2023"` and `"2023-24"`)
//! stay separate points.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use shared::protocol::{PlacementRecord, PredictedYear};

const YEAR_SEPARATORS: [char; 3] = ['-', '\u{2013}', '/'];

/// Normalises an academic-year label to an integer used for ordering.
///
/// `"2023-24"` -> 2023, `"x-24"` -> 24, `"23"` -> 23, `""` -> 0. Each segment
/// is read by its leading digits, so `"2023 (batch)"` still yields 2023.
/// Labels with no usable digits normalise to 0.
pub fn year_key(label: &str) -> i32 {
    let label = label.trim();
    if label.contains(&YEAR_SEPARATORS[..]) {
        let mut segments = label.split(&YEAR_SEPARATORS[..]);
        let first = segments.next().and_then(leading_number);
        let second = segments.next().and_then(leading_number);
        return first.or(second).unwrap_or(0);
    }
    leading_number(label).unwrap_or(0)
}

fn leading_number(segment: &str) -> Option<i32> {
    let segment = segment.trim();
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    segment[..end].parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRow {
    pub year_label: String,
    pub placement_rate: Option<f64>,
    pub salary: Option<f64>,
    pub placed_students: Option<f64>,
}

impl HistoricalRow {
    pub fn new(year_label: impl Into<String>) -> Self {
        Self {
            year_label: year_label.into(),
            ..Self::default()
        }
    }

    pub fn with_placement_rate(mut self, value: f64) -> Self {
        self.placement_rate = Some(value);
        self
    }

    pub fn with_salary(mut self, value: f64) -> Self {
        self.salary = Some(value);
        self
    }
}

impl From<&PlacementRecord> for HistoricalRow {
    fn from(record: &PlacementRecord) -> Self {
        Self {
            year_label: record.year.clone().unwrap_or_default(),
            placement_rate: record.placement_percentage,
            salary: record.median_salary,
            placed_students: record.students_placed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedMetrics {
    pub placement_rate: Option<f64>,
    pub salary: Option<f64>,
    pub placed_students: Option<f64>,
}

impl PredictedMetrics {
    pub fn placement(value: f64) -> Self {
        Self {
            placement_rate: Some(value),
            ..Self::default()
        }
    }
}

impl From<&PredictedYear> for PredictedMetrics {
    fn from(year: &PredictedYear) -> Self {
        Self {
            placement_rate: year.placement_rate(),
            salary: year.salary(),
            placed_students: year.placed_students,
        }
    }
}

/// One entry of a reconciled series. Every metric is always serialised;
/// `null` means "not measured", which is distinct from a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub year_label: String,
    pub year_key: i32,
    pub placement_past: Option<f64>,
    pub salary_past: Option<f64>,
    pub placed_past: Option<f64>,
    pub placement_predicted: Option<f64>,
    pub salary_predicted: Option<f64>,
    pub placed_predicted: Option<f64>,
}

impl YearPoint {
    fn empty(year_label: String, year_key: i32) -> Self {
        Self {
            year_label,
            year_key,
            placement_past: None,
            salary_past: None,
            placed_past: None,
            placement_predicted: None,
            salary_predicted: None,
            placed_predicted: None,
        }
    }

    pub fn has_historical(&self) -> bool {
        self.placement_past.is_some() || self.salary_past.is_some() || self.placed_past.is_some()
    }

    pub fn has_predicted(&self) -> bool {
        self.placement_predicted.is_some()
            || self.salary_predicted.is_some()
            || self.placed_predicted.is_some()
    }

    fn set_historical(&mut self, row: &HistoricalRow) {
        self.placement_past = row.placement_rate;
        self.salary_past = row.salary;
        self.placed_past = row.placed_students;
    }

    fn set_predicted(&mut self, metrics: &PredictedMetrics) {
        self.placement_predicted = metrics.placement_rate;
        self.salary_predicted = metrics.salary;
        self.placed_predicted = metrics.placed_students;
    }
}

/// Points sorted ascending by `year_key`, ties broken by `year_label`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconciledSeries(Vec<YearPoint>);

impl ReconciledSeries {
    pub fn points(&self) -> &[YearPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, YearPoint> {
        self.0.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|p| p.year_label.as_str()).collect()
    }

    pub fn get(&self, year_label: &str) -> Option<&YearPoint> {
        self.0.iter().find(|p| p.year_label == year_label)
    }

    pub fn into_points(self) -> Vec<YearPoint> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ReconciledSeries {
    type Item = &'a YearPoint;
    type IntoIter = std::slice::Iter<'a, YearPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Accumulates points from either source; [`SeriesBuilder::finish`] sorts.
#[derive(Debug, Default)]
pub struct SeriesBuilder {
    points: Vec<YearPoint>,
    index: HashMap<(i32, String), usize>,
}

impl SeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn point_mut(&mut self, year_label: &str) -> &mut YearPoint {
        let key = (year_key(year_label), year_label.to_string());
        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let slot = self.points.len();
                self.points.push(YearPoint::empty(key.1.clone(), key.0));
                self.index.insert(key, slot);
                slot
            }
        };
        &mut self.points[slot]
    }

    /// A repeated label replaces the historical fields of its point.
    pub fn push_historical(&mut self, row: &HistoricalRow) -> &mut Self {
        self.point_mut(&row.year_label).set_historical(row);
        self
    }

    /// Overwrites the predicted fields of a matching point, or appends a new
    /// prediction-only point. Historical fields are never touched.
    pub fn merge_predicted(&mut self, year_label: &str, metrics: &PredictedMetrics) -> &mut Self {
        self.point_mut(year_label).set_predicted(metrics);
        self
    }

    pub fn finish(self) -> ReconciledSeries {
        let mut points = self.points;
        points.sort_by(|a, b| {
            a.year_key
                .cmp(&b.year_key)
                .then_with(|| a.year_label.cmp(&b.year_label))
        });
        ReconciledSeries(points)
    }
}

pub fn reconcile(
    historical: &[HistoricalRow],
    predicted: &BTreeMap<String, PredictedMetrics>,
) -> ReconciledSeries {
    let mut builder = SeriesBuilder::new();
    for row in historical {
        builder.push_historical(row);
    }
    for (year_label, metrics) in predicted {
        builder.merge_predicted(year_label, metrics);
    }
    builder.finish()
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
