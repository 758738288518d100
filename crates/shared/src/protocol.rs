use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    domain::{Course, Profile},
    numeric::{lenient_f64, lenient_string, parse_number, parse_text},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionTokens {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub session: Option<SessionTokens>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<Profile>,
}

impl LoginResponse {
    /// The hosted auth session token wins over the legacy top-level `token`.
    pub fn bearer_token(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|s| s.access_token.as_deref())
            .or(self.token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub agreed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeNameRequest {
    pub college_name: String,
}

/// Model output for one academic year. The backend has shipped several
/// spellings for the same metric over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedYear {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub placement_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub placement: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub salary: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub median_salary: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_salary: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub placed_students: Option<f64>,
}

impl PredictedYear {
    pub fn placement_rate(&self) -> Option<f64> {
        self.placement_rate.or(self.placement)
    }

    pub fn salary(&self) -> Option<f64> {
        self.salary.or(self.median_salary).or(self.average_salary)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub predictions: BTreeMap<String, PredictedYear>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderRequest {
    pub location: String,
    pub course: Course,
    pub top_n: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollegeMatch {
    #[serde(rename = "College", default, deserialize_with = "lenient_string")]
    pub college: Option<String>,
    #[serde(rename = "NIRF Rank", default, deserialize_with = "lenient_string")]
    pub nirf_rank: Option<String>,
    #[serde(
        rename = "Average Placement (%)",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub average_placement: Option<f64>,
    #[serde(
        rename = "Average Salary (LPA)",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub average_salary: Option<f64>,
    #[serde(
        rename = "Highest Package (LPA)",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub highest_package: Option<f64>,
    #[serde(rename = "Placement Trend", default, deserialize_with = "trend_pairs")]
    pub placement_trend: Vec<(String, Option<f64>)>,
    #[serde(rename = "Top Recruiters", default, deserialize_with = "recruiter_list")]
    pub top_recruiters: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryTrend {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub median: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub highest: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeInsights {
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub college_image: Option<String>,
    #[serde(default, deserialize_with = "metric_map")]
    pub placement_trends: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub salary_trends: BTreeMap<String, SalaryTrend>,
    #[serde(default, deserialize_with = "recruiter_list")]
    pub top_recruiters: Vec<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_placement: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSummary {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
}

impl ResumeSummary {
    pub fn label(&self) -> &str {
        self.original_name
            .as_deref()
            .or(self.file_path.as_deref())
            .unwrap_or("Untitled resume")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResumeRequest {
    pub resume_path: String,
    pub job_role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(default)]
    pub skills_found: Vec<String>,
    #[serde(default)]
    pub skill_gaps: Vec<String>,
    #[serde(default)]
    pub job_role: Option<String>,
}

/// History row as stored by the backend. `result` is either a JSON document
/// or a string holding one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnalysisRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub job_role: Option<String>,
    #[serde(default)]
    pub resume_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResumeResponse {
    #[serde(default)]
    pub analysis: ResumeAnalysis,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub record: Option<RawAnalysisRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisHistoryResponse {
    #[serde(default)]
    pub analyses: Vec<RawAnalysisRow>,
}

/// One row of the hosted `College_Placements_Data` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    #[serde(rename = "College Name", default, deserialize_with = "lenient_string")]
    pub college_name: Option<String>,
    #[serde(rename = "Year", default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(
        rename = "Placement Percentage",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub placement_percentage: Option<f64>,
    #[serde(
        rename = "Median Salary (LPA)",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub median_salary: Option<f64>,
    #[serde(
        rename = "Highest Package (LPA)",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub highest_package: Option<f64>,
    #[serde(
        rename = "Total Students Placed",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub students_placed: Option<f64>,
    #[serde(
        rename = "Total Students Eligible",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub students_eligible: Option<f64>,
    #[serde(rename = "CSE(Placed)", default, deserialize_with = "lenient_f64")]
    pub cse_placed: Option<f64>,
    #[serde(rename = "ECE(Placed)", default, deserialize_with = "lenient_f64")]
    pub ece_placed: Option<f64>,
    #[serde(rename = "ME(Placed)", default, deserialize_with = "lenient_f64")]
    pub me_placed: Option<f64>,
    #[serde(rename = "EEE(Placed)", default, deserialize_with = "lenient_f64")]
    pub eee_placed: Option<f64>,
}

fn trend_pairs<'de, D>(deserializer: D) -> Result<Vec<(String, Option<f64>)>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Array(pair) if !pair.is_empty() => {
                let year = parse_text(&pair[0])?;
                Some((year, pair.get(1).and_then(parse_number)))
            }
            _ => None,
        })
        .collect())
}

fn recruiter_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().filter_map(parse_text).collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    })
}

fn metric_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .map(|(year, metric)| (year, parse_number(&metric)))
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn login_prefers_session_access_token() {
        let body: LoginResponse = serde_json::from_value(json!({
            "session": { "access_token": "jwt-session" },
            "token": "legacy",
            "user": { "user": { "id": "u-1", "email": "a@b.c" } }
        }))
        .unwrap();
        assert_eq!(body.bearer_token(), Some("jwt-session"));
        assert_eq!(body.user.unwrap().email(), Some("a@b.c"));

        let body: LoginResponse = serde_json::from_value(json!({ "token": "legacy" })).unwrap();
        assert_eq!(body.bearer_token(), Some("legacy"));
    }

    #[test]
    fn predicted_year_accepts_alternate_spellings() {
        let year: PredictedYear = serde_json::from_value(json!({
            "placement": 88,
            "median_salary": "7.5",
            "placed_students": null
        }))
        .unwrap();
        assert_eq!(year.placement_rate(), Some(88.0));
        assert_eq!(year.salary(), Some(7.5));
        assert_eq!(year.placed_students, None);
    }

    #[test]
    fn college_match_decodes_trend_pairs_and_recruiters() {
        let college: CollegeMatch = serde_json::from_value(json!({
            "College": "RVCE",
            "NIRF Rank": 96,
            "Average Placement (%)": "91.2",
            "Placement Trend": [[2021, 88.0], ["2022-23", "90"], ["bad"]],
            "Top Recruiters": "Google, Infosys ,"
        }))
        .unwrap();
        assert_eq!(college.nirf_rank.as_deref(), Some("96"));
        assert_eq!(college.average_placement, Some(91.2));
        assert_eq!(
            college.placement_trend,
            vec![
                ("2021".to_string(), Some(88.0)),
                ("2022-23".to_string(), Some(90.0)),
                ("bad".to_string(), None),
            ]
        );
        assert_eq!(college.top_recruiters, vec!["Google", "Infosys"]);
    }

    #[test]
    fn placement_record_reads_spaced_column_names() {
        let row: PlacementRecord = serde_json::from_value(json!({
            "College Name": "BMSCE",
            "Year": 2022,
            "Placement Percentage": 84.5,
            "Total Students Eligible": "400",
            "CSE(Placed)": 120
        }))
        .unwrap();
        assert_eq!(row.college_name.as_deref(), Some("BMSCE"));
        assert_eq!(row.year.as_deref(), Some("2022"));
        assert_eq!(row.students_eligible, Some(400.0));
        assert_eq!(row.cse_placed, Some(120.0));
        assert_eq!(row.median_salary, None);
    }
}
