use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::{
    numeric::parse_number,
    protocol::{RawAnalysisRow, ResumeAnalysis},
};
use tracing::debug;

const UNKNOWN_ROLE: &str = "Unknown Role";
const UNKNOWN_RESUME: &str = "Unknown Resume";
const TREND_WINDOW: usize = 10;

/// A history row with every optional field resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: Option<String>,
    pub analysis: ResumeAnalysis,
    pub score: f64,
    pub job_role: String,
    pub resume_path: String,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn normalize(raw: RawAnalysisRow, now: DateTime<Utc>) -> Self {
        let result = parse_result(raw.result.as_ref());
        let analysis: ResumeAnalysis = serde_json::from_value(result.clone()).unwrap_or_default();
        let score = result.get("score").and_then(parse_number).unwrap_or(0.0);
        let job_role = non_blank(raw.job_role)
            .or_else(|| non_blank(analysis.job_role.clone()))
            .unwrap_or_else(|| UNKNOWN_ROLE.to_string());
        let created_at = raw
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);

        Self {
            id: raw.id,
            analysis,
            score,
            job_role,
            resume_path: non_blank(raw.resume_path).unwrap_or_else(|| UNKNOWN_RESUME.to_string()),
            created_at,
        }
    }

    /// Last path segment of the stored resume.
    pub fn resume_name(&self) -> &str {
        self.resume_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.resume_path)
    }
}

fn parse_result(result: Option<&Value>) -> Value {
    match result {
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Object(_)) => parsed,
            Ok(_) | Err(_) => {
                debug!("resume: unparseable analysis result; treating as empty");
                Value::Object(Default::default())
            }
        },
        Some(object @ Value::Object(_)) => object.clone(),
        _ => Value::Object(Default::default()),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|ts| ts.and_utc())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    pub date: NaiveDate,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCell {
    pub skill: String,
    pub matched: u8,
    pub gap: u8,
}

/// Analysis history, newest first.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AnalysisHistory(Vec<AnalysisRecord>);

impl AnalysisHistory {
    pub fn from_rows(rows: Vec<RawAnalysisRow>, now: DateTime<Utc>) -> Self {
        Self(
            rows.into_iter()
                .map(|row| AnalysisRecord::normalize(row, now))
                .collect(),
        )
    }

    pub fn push_front(&mut self, record: AnalysisRecord) {
        self.0.insert(0, record);
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mean score to one decimal place; 0 for an empty history.
    pub fn average_score(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let mean = self.0.iter().map(|r| r.score).sum::<f64>() / self.0.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    /// The ten most recent scores, oldest first.
    pub fn score_trend(&self) -> Vec<ScorePoint> {
        let mut trend: Vec<ScorePoint> = self
            .0
            .iter()
            .take(TREND_WINDOW)
            .map(|r| ScorePoint {
                date: r.created_at.date_naive(),
                score: r.score,
            })
            .collect();
        trend.reverse();
        trend
    }
}

pub fn skill_matrix(analysis: &ResumeAnalysis) -> Vec<SkillCell> {
    let found = analysis.skills_found.iter().map(|skill| SkillCell {
        skill: skill.clone(),
        matched: 1,
        gap: 0,
    });
    let gaps = analysis.skill_gaps.iter().map(|skill| SkillCell {
        skill: skill.clone(),
        matched: 0,
        gap: 1,
    });
    found.chain(gaps).collect()
}

#[cfg(test)]
#[path = "tests/resume_tests.rs"]
mod tests;
