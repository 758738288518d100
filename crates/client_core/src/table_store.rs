use std::time::Duration;

use reqwest::Client;
use shared::protocol::PlacementRecord;
use tracing::{info, warn};
use url::Url;

use crate::error::{check_status, decode_json, GatewayError};

pub const DEFAULT_PLACEMENT_TABLE: &str = "College_Placements_Data";
const INSTITUTE_COLUMN: &str = "College Name";

/// Read-only client for the hosted placement table (PostgREST dialect).
#[derive(Clone)]
pub struct TableStoreClient {
    http: Client,
    table_url: Url,
    api_key: String,
}

impl TableStoreClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_http(http, base_url, api_key, table)
    }

    pub fn with_http(
        http: Client,
        base_url: &str,
        api_key: impl Into<String>,
        table: &str,
    ) -> Result<Self, GatewayError> {
        let raw = format!("{}/rest/v1/{table}", base_url.trim().trim_end_matches('/'));
        let table_url = Url::parse(&raw).map_err(|err| {
            GatewayError::InvalidInput(format!("invalid table store url '{base_url}': {err}"))
        })?;
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured("table store key"));
        }
        Ok(Self {
            http,
            table_url,
            api_key,
        })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    async fn select(&self, filters: &[(&str, String)], what: &str) -> Result<Vec<PlacementRecord>, GatewayError> {
        let mut url = self.table_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, filter) in filters {
                query.append_pair(column, filter);
            }
        }

        let response = self
            .http
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| {
                warn!(what, error = %err, "table store: request failed");
                GatewayError::from(err)
            })?;
        let response = check_status(response, what).await?;
        decode_json(response).await
    }

    /// Every placement row in the table.
    pub async fn all_placements(&self) -> Result<Vec<PlacementRecord>, GatewayError> {
        let rows = self.select(&[], "placements").await?;
        info!(rows = rows.len(), "table store: placements loaded");
        Ok(rows)
    }

    /// Rows whose institute name contains `name`, ignoring case.
    pub async fn placements_for_institute(&self, name: &str) -> Result<Vec<PlacementRecord>, GatewayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidInput("Enter a college name.".to_string()));
        }
        let pattern = format!("ilike.*{}*", escape_pattern(name));
        let rows = self
            .select(&[(INSTITUTE_COLUMN, pattern)], "historical placements")
            .await?;
        if rows.is_empty() {
            info!(institute = name, "table store: no historical rows");
            return Err(GatewayError::EmptyResult(format!("'{name}'")));
        }
        info!(institute = name, rows = rows.len(), "table store: historical rows loaded");
        Ok(rows)
    }
}

/// PostgREST treats `*` as a wildcard and `,()` as syntax inside filters.
fn escape_pattern(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '*' | ',' | '(' | ')'))
        .collect()
}

#[cfg(test)]
#[path = "tests/table_store_tests.rs"]
mod tests;
