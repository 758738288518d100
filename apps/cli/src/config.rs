use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::{DEFAULT_API_BASE_URL, DEFAULT_PLACEMENT_TABLE};
use tracing::warn;

pub const CONFIG_FILE: &str = "path2placement.toml";
const ENV_PREFIX: &str = "P2P__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub table_store_url: Option<String>,
    pub table_store_key: Option<String>,
    pub table_name: String,
    pub session_db: String,
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            table_store_url: None,
            table_store_key: None,
            table_name: DEFAULT_PLACEMENT_TABLE.into(),
            session_db: "sqlite://./data/session.db".into(),
            request_timeout_seconds: 30,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }

    /// URL and key of the placement table, when both are set.
    pub fn table_store(&self) -> Option<(&str, &str)> {
        match (self.table_store_url.as_deref(), self.table_store_key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }

    fn apply(&mut self, key: &str, value: String) {
        match key {
            "api_base_url" => self.api_base_url = value,
            "table_store_url" => self.table_store_url = Some(value),
            "table_store_key" => self.table_store_key = Some(value),
            "table_name" => self.table_name = value,
            "session_db" => self.session_db = value,
            "request_timeout_seconds" => match value.parse::<u64>() {
                Ok(parsed) => self.request_timeout_seconds = parsed,
                Err(_) => warn!(value = %value, "config: ignoring invalid request_timeout_seconds"),
            },
            other => warn!(key = other, "config: ignoring unknown key"),
        }
    }
}

const KEYS: [&str; 6] = [
    "api_base_url",
    "table_store_url",
    "table_store_key",
    "table_name",
    "session_db",
    "request_timeout_seconds",
];

pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = path.unwrap_or(Path::new(CONFIG_FILE));
    let raw = fs::read_to_string(path).ok();
    resolve_settings(raw.as_deref(), |name| std::env::var(name).ok())
}

/// Defaults, then the file, then `SUPABASE_*`, then `P2P__*`. Blank values
/// are ignored at every layer.
pub(crate) fn resolve_settings(
    file: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => {
                for (key, value) in file_cfg {
                    let value = match value {
                        toml::Value::String(text) => text,
                        other => other.to_string(),
                    };
                    if let Some(value) = non_blank(value) {
                        settings.apply(&key, value);
                    }
                }
            }
            Err(err) => warn!(error = %err, "config: ignoring unreadable config file"),
        }
    }

    let env = |name: &str| lookup(name).and_then(non_blank);

    if let Some(v) = env("SUPABASE_URL") {
        settings.table_store_url = Some(v);
    }
    if let Some(v) = env("SUPABASE_ANON_KEY") {
        settings.table_store_key = Some(v);
    }
    for key in KEYS {
        if let Some(v) = env(&format!("{ENV_PREFIX}{}", key.to_ascii_uppercase())) {
            settings.apply(key, v);
        }
    }

    settings.session_db = normalize_database_url(&settings.session_db);
    settings
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().session_db;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    format!("sqlite://{path}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
