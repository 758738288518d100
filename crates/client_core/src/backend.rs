use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde_json::Value;
use shared::{
    domain::{Course, Profile, UserId},
    protocol::{
        AnalysisHistoryResponse, AnalyzeResumeRequest, AnalyzeResumeResponse, CollegeInsights,
        CollegeMatch, CollegeNameRequest, FinderRequest, LoginRequest, LoginResponse,
        PredictionResponse, RawAnalysisRow, RegisterRequest, ResumeSummary,
    },
};
use tracing::{info, warn};

use crate::{
    error::{check_status, decode_json, GatewayError},
    session::ProfileSource,
};

pub const DEFAULT_API_BASE_URL: &str = "https://path2placement-backend.onrender.com";
pub const MAX_FINDER_RESULTS: u32 = 20;
const ACCEPTED_RESUME_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct FinderQuery {
    pub location: String,
    pub course: Course,
    pub top_n: u32,
}

/// Client for the prediction/analysis backend.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(http, base_url))
    }

    pub fn with_http(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(|err| {
            warn!(what, error = %err, "backend: request failed");
            GatewayError::from(err)
        })?;
        let response = match check_status(response, what).await {
            Ok(response) => response,
            Err(err) => {
                warn!(what, error = %err, "backend: request rejected");
                return Err(err);
            }
        };
        decode_json(response).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, GatewayError> {
        let body: LoginResponse = self
            .send_json(
                self.http
                    .post(self.url("/api/auth/login"))
                    .json(&LoginRequest {
                        email: email.to_string(),
                        password: password.to_string(),
                    }),
                "login",
            )
            .await
            .map_err(|err| match err {
                GatewayError::Unauthorized { message: None } => GatewayError::Unauthorized {
                    message: Some("Invalid email or password.".to_string()),
                },
                other => other,
            })?;

        let token = body
            .bearer_token()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Rejected {
                status: 200,
                message: Some("Login failed".to_string()),
            })?;
        info!("backend: login succeeded");
        Ok(LoginOutcome {
            token,
            profile: body.user.unwrap_or_default(),
        })
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), GatewayError> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(request)
            .send()
            .await?;
        check_status(response, "registration").await?;
        info!("backend: registration accepted");
        Ok(())
    }

    pub async fn profile(&self, token: &str) -> Result<Profile, GatewayError> {
        self.send_json(
            self.http.get(self.url("/api/auth/profile")).bearer_auth(token),
            "profile",
        )
        .await
    }

    pub async fn predict(&self, college_name: &str) -> Result<PredictionResponse, GatewayError> {
        let college_name = require_text(college_name, "Enter a college name.")?;
        let response: PredictionResponse = self
            .send_json(
                self.http
                    .post(self.url("/api/ml/predict"))
                    .json(&CollegeNameRequest {
                        college_name: college_name.to_string(),
                    }),
                "prediction",
            )
            .await?;
        info!(
            college = college_name,
            years = response.predictions.len(),
            "backend: prediction received"
        );
        Ok(response)
    }

    pub async fn find_colleges(&self, query: &FinderQuery) -> Result<Vec<CollegeMatch>, GatewayError> {
        let location = require_text(&query.location, "Enter a location.")?;
        let request = FinderRequest {
            location: location.to_string(),
            course: query.course,
            top_n: query.top_n.clamp(1, MAX_FINDER_RESULTS),
        };
        let matches: Vec<CollegeMatch> = self
            .send_json(
                self.http
                    .post(self.url("/api/college-finder/finder"))
                    .json(&request),
                "college finder",
            )
            .await?;
        info!(
            location,
            course = %request.course,
            results = matches.len(),
            "backend: finder results received"
        );
        Ok(matches)
    }

    pub async fn college_insights(&self, college_name: &str) -> Result<CollegeInsights, GatewayError> {
        let college_name = require_text(college_name, "Enter a college name.")?;
        self.send_json(
            self.http
                .post(self.url("/api/college-insights/insights"))
                .json(&CollegeNameRequest {
                    college_name: college_name.to_string(),
                }),
            "college insights",
        )
        .await
    }

    pub async fn list_resumes(
        &self,
        token: &str,
        user_id: &UserId,
    ) -> Result<Vec<ResumeSummary>, GatewayError> {
        let body: Value = self
            .send_json(
                self.http
                    .get(self.url(&format!("/api/resume/{}", user_id.0)))
                    .bearer_auth(token),
                "resumes",
            )
            .await?;
        match body {
            Value::Array(_) => Ok(serde_json::from_value(body)?),
            other => {
                warn!(kind = json_kind(&other), "backend: resume list was not an array");
                Ok(Vec::new())
            }
        }
    }

    pub async fn upload_resume(
        &self,
        token: &str,
        user_id: &UserId,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<ResumeSummary, GatewayError> {
        let mime = resume_mime_type(file_name).ok_or_else(|| {
            GatewayError::InvalidInput("Resumes must be .pdf, .doc or .docx files.".to_string())
        })?;
        let part = multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new()
            .part("resume", part)
            .text("user_id", user_id.0.clone());

        let uploaded: ResumeSummary = self
            .send_json(
                self.http
                    .post(self.url("/api/resume/upload"))
                    .bearer_auth(token)
                    .multipart(form),
                "resume upload",
            )
            .await?;
        info!(file = file_name, "backend: resume uploaded");
        Ok(uploaded)
    }

    pub async fn analyze_resume(
        &self,
        token: &str,
        resume_path: &str,
        job_role: &str,
    ) -> Result<AnalyzeResumeResponse, GatewayError> {
        let resume_path = require_text(resume_path, "Select a resume first.")?;
        let job_role = require_text(job_role, "Enter a job role first.")?;
        self.send_json(
            self.http
                .post(self.url("/api/resume-analyzer/resume-analyzer"))
                .bearer_auth(token)
                .json(&AnalyzeResumeRequest {
                    resume_path: resume_path.to_string(),
                    job_role: job_role.to_string(),
                }),
            "resume analysis",
        )
        .await
    }

    pub async fn analysis_history(&self, token: &str) -> Result<Vec<RawAnalysisRow>, GatewayError> {
        let body: AnalysisHistoryResponse = self
            .send_json(
                self.http
                    .get(self.url("/api/resume-analysis/fetch-analysis"))
                    .bearer_auth(token),
                "analysis history",
            )
            .await?;
        Ok(body.analyses)
    }
}

#[async_trait]
impl ProfileSource for BackendClient {
    async fn fetch_profile(&self, token: &str) -> Result<Profile, GatewayError> {
        self.profile(token).await
    }
}

fn require_text<'a>(value: &'a str, message: &str) -> Result<&'a str, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::InvalidInput(message.to_string()));
    }
    Ok(value)
}

fn resume_mime_type(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    if !ACCEPTED_RESUME_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    Some(match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        _ => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
