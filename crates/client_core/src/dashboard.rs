//! Aggregates for the placement dashboard. Unlike the reconciler, missing
//! numbers count as zero here so the totals always add up.

use serde::Serialize;
use shared::protocol::PlacementRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub year: Option<String>,
    pub college: Option<String>,
}

impl DashboardFilter {
    /// `"All"` (any case) and blank values mean "no filter".
    pub fn new(year: Option<&str>, college: Option<&str>) -> Self {
        fn normalise(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
                .map(str::to_string)
        }
        Self {
            year: normalise(year),
            college: normalise(college),
        }
    }

    fn matches(&self, row: &PlacementRecord) -> bool {
        let year_ok = self
            .year
            .as_deref()
            .map_or(true, |year| row.year.as_deref() == Some(year));
        let college_ok = self
            .college
            .as_deref()
            .map_or(true, |college| row.college_name.as_deref() == Some(college));
        year_ok && college_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentTotal {
    pub department: &'static str,
    pub placed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTrendPoint {
    pub year: String,
    pub median_salary: f64,
    pub highest_package: f64,
    pub placement_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub rows: usize,
    pub total_eligible: f64,
    pub total_placed: f64,
    pub placement_percent: f64,
    pub average_median_salary: f64,
    pub departments: Vec<DepartmentTotal>,
    pub trend: Vec<YearTrendPoint>,
    pub years: Vec<String>,
    pub colleges: Vec<String>,
}

fn value(v: Option<f64>) -> f64 {
    v.unwrap_or(0.0)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        let value = value.unwrap_or("Unknown");
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

impl DashboardSummary {
    /// Filter choices (`years`, `colleges`) are drawn from every row; the
    /// figures only from rows passing `filter`.
    pub fn compute(rows: &[PlacementRecord], filter: &DashboardFilter) -> Self {
        let filtered: Vec<&PlacementRecord> = rows.iter().filter(|r| filter.matches(r)).collect();

        let total_eligible: f64 = filtered.iter().map(|r| value(r.students_eligible)).sum();
        let total_placed: f64 = filtered.iter().map(|r| value(r.students_placed)).sum();
        let placement_percent = if total_eligible > 0.0 {
            round2(total_placed / total_eligible * 100.0)
        } else {
            0.0
        };
        let salary_sum: f64 = filtered.iter().map(|r| value(r.median_salary)).sum();
        let average_median_salary = round2(salary_sum / filtered.len().max(1) as f64);

        let department = |name: &'static str, pick: fn(&PlacementRecord) -> Option<f64>| DepartmentTotal {
            department: name,
            placed: filtered.iter().map(|r| value(pick(r))).sum(),
        };
        let departments = vec![
            department("CSE", |r| r.cse_placed),
            department("ECE", |r| r.ece_placed),
            department("ME", |r| r.me_placed),
            department("EEE", |r| r.eee_placed),
        ];

        let trend = filtered
            .iter()
            .map(|r| YearTrendPoint {
                year: r.year.clone().unwrap_or_else(|| "Unknown".to_string()),
                median_salary: value(r.median_salary),
                highest_package: value(r.highest_package),
                placement_percent: value(r.placement_percentage),
            })
            .collect();

        Self {
            rows: filtered.len(),
            total_eligible,
            total_placed,
            placement_percent,
            average_median_salary,
            departments,
            trend,
            years: distinct(rows.iter().map(|r| r.year.as_deref())),
            colleges: distinct(rows.iter().map(|r| r.college_name.as_deref())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(college: &str, year: &str, eligible: f64, placed: f64, median: Option<f64>) -> PlacementRecord {
        PlacementRecord {
            college_name: Some(college.to_string()),
            year: Some(year.to_string()),
            students_eligible: Some(eligible),
            students_placed: Some(placed),
            median_salary: median,
            cse_placed: Some(placed / 2.0),
            ..PlacementRecord::default()
        }
    }

    #[test]
    fn totals_and_percent_over_all_rows() {
        let rows = vec![
            row("RVCE", "2022-23", 400.0, 300.0, Some(8.0)),
            row("BMSCE", "2022-23", 200.0, 100.0, None),
            row("RVCE", "2023-24", 300.0, 200.0, Some(9.0)),
        ];

        let summary = DashboardSummary::compute(&rows, &DashboardFilter::default());

        assert_eq!(summary.total_eligible, 900.0);
        assert_eq!(summary.total_placed, 600.0);
        assert_eq!(summary.placement_percent, 66.67);
        assert_eq!(summary.average_median_salary, 5.67);
        assert_eq!(summary.departments[0].placed, 300.0);
        assert_eq!(summary.departments[1].placed, 0.0);
        assert_eq!(summary.years, vec!["2022-23", "2023-24"]);
        assert_eq!(summary.colleges, vec!["RVCE", "BMSCE"]);
    }

    #[test]
    fn filter_narrows_figures_but_not_choices() {
        let rows = vec![
            row("RVCE", "2022-23", 400.0, 300.0, Some(8.0)),
            row("BMSCE", "2022-23", 200.0, 100.0, Some(6.0)),
        ];
        let filter = DashboardFilter::new(Some("All"), Some("BMSCE"));

        let summary = DashboardSummary::compute(&rows, &filter);

        assert_eq!(summary.rows, 1);
        assert_eq!(summary.placement_percent, 50.0);
        assert_eq!(summary.trend[0].median_salary, 6.0);
        assert_eq!(summary.colleges.len(), 2);
    }

    #[test]
    fn no_rows_is_empty_with_zero_figures() {
        let summary = DashboardSummary::compute(&[], &DashboardFilter::default());
        assert!(summary.is_empty());
        assert_eq!(summary.placement_percent, 0.0);
        assert_eq!(summary.average_median_salary, 0.0);
    }
}
