use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{Profile, UserId},
    protocol::{CollegeInsights, CollegeMatch, RegisterRequest, ResumeAnalysis, ResumeSummary},
};
use tracing::{info, warn};

pub mod backend;
pub mod dashboard;
pub mod error;
pub mod prediction;
pub mod reconcile;
pub mod resume;
pub mod session;
pub mod table_store;

pub use backend::{BackendClient, FinderQuery, LoginOutcome, DEFAULT_API_BASE_URL};
pub use dashboard::{DashboardFilter, DashboardSummary};
pub use error::GatewayError;
pub use prediction::PredictionView;
pub use reconcile::{reconcile, year_key, HistoricalRow, PredictedMetrics, ReconciledSeries, YearPoint};
pub use resume::{AnalysisHistory, AnalysisRecord};
pub use session::{MemoryTokenStore, ProfileSource, Session, SessionStore, TokenStore};
pub use table_store::{TableStoreClient, DEFAULT_PLACEMENT_TABLE};

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: ResumeAnalysis,
    pub public_url: Option<String>,
    pub record: Option<AnalysisRecord>,
}

/// Everything a screen needs: the shared session plus both remote sources.
pub struct PlacementClient {
    session: Arc<SessionStore>,
    backend: Arc<BackendClient>,
    table_store: Option<TableStoreClient>,
}

impl PlacementClient {
    pub fn new(
        backend: BackendClient,
        table_store: Option<TableStoreClient>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let backend = Arc::new(backend);
        let session = Arc::new(SessionStore::new(tokens, backend.clone()));
        Self {
            session,
            backend,
            table_store,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    pub fn table_store(&self) -> Option<&TableStoreClient> {
        self.table_store.as_ref()
    }

    pub async fn restore(&self) -> Session {
        self.session.restore().await
    }

    /// Signs in, then resolves the canonical profile for the new token. The
    /// login payload is shown until that fetch lands; a failed fetch leaves
    /// the token in place with no profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<Profile>, GatewayError> {
        let outcome = self.backend.login(email, password).await?;
        self.session.login(outcome.token, outcome.profile).await;
        self.session.refresh_profile().await;
        Ok(self.session.profile().await)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), GatewayError> {
        self.backend.register(request).await
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    /// Predictions merged with whatever history the table store holds. A
    /// failed or empty history lookup still yields the predicted years.
    pub async fn predict(&self, college_name: &str) -> Result<PredictionView, GatewayError> {
        let response = self.backend.predict(college_name).await?;

        let history = match &self.table_store {
            Some(table_store) => match table_store.placements_for_institute(college_name).await {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(college = college_name.trim(), error = %err, "predict: continuing without history");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let view = PredictionView::build(college_name, &history, &response);
        info!(
            college = %view.college,
            points = view.series.len(),
            "predict: series reconciled"
        );
        Ok(view)
    }

    pub async fn find_colleges(&self, query: &FinderQuery) -> Result<Vec<CollegeMatch>, GatewayError> {
        self.backend.find_colleges(query).await
    }

    pub async fn college_insights(&self, college_name: &str) -> Result<CollegeInsights, GatewayError> {
        self.backend.college_insights(college_name).await
    }

    pub async fn dashboard(&self, filter: &DashboardFilter) -> Result<DashboardSummary, GatewayError> {
        let table_store = self
            .table_store
            .as_ref()
            .ok_or(GatewayError::NotConfigured("table store"))?;
        let rows = table_store.all_placements().await?;
        Ok(DashboardSummary::compute(&rows, filter))
    }

    async fn token(&self) -> Result<String, GatewayError> {
        self.session
            .token()
            .await
            .ok_or(GatewayError::NotAuthenticated)
    }

    async fn user(&self) -> Result<(String, UserId), GatewayError> {
        let token = self.token().await?;
        let user_id = self
            .session
            .profile()
            .await
            .and_then(|profile| profile.user_id().cloned())
            .ok_or(GatewayError::NotAuthenticated)?;
        Ok((token, user_id))
    }

    pub async fn resumes(&self) -> Result<Vec<ResumeSummary>, GatewayError> {
        let (token, user_id) = self.user().await?;
        self.backend.list_resumes(&token, &user_id).await
    }

    pub async fn upload_resume(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<ResumeSummary, GatewayError> {
        let (token, user_id) = self.user().await?;
        self.backend
            .upload_resume(&token, &user_id, file_name, contents)
            .await
    }

    pub async fn analyze_resume(
        &self,
        resume_path: &str,
        job_role: &str,
    ) -> Result<AnalysisOutcome, GatewayError> {
        let token = self.token().await?;
        let response = self
            .backend
            .analyze_resume(&token, resume_path, job_role)
            .await?;
        let record = response
            .record
            .map(|row| AnalysisRecord::normalize(row, Utc::now()));
        Ok(AnalysisOutcome {
            analysis: response.analysis,
            public_url: response.public_url,
            record,
        })
    }

    pub async fn analysis_history(&self) -> Result<AnalysisHistory, GatewayError> {
        let token = self.token().await?;
        let rows = self.backend.analysis_history(&token).await?;
        Ok(AnalysisHistory::from_rows(rows, Utc::now()))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
