use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use hacksync_core::HackathonSource;
use hacksync_storage::{BackoffPolicy, HttpClientConfig};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatastoreKind {
    #[default]
    Rest,
    Postgres,
    Memory,
}

impl FromStr for DatastoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(DatastoreKind::Rest),
            "postgres" | "postgresql" => Ok(DatastoreKind::Postgres),
            "memory" => Ok(DatastoreKind::Memory),
            other => Err(format!("unknown datastore {other:?}")),
        }
    }
}

impl fmt::Display for DatastoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DatastoreKind::Rest => "rest",
            DatastoreKind::Postgres => "postgres",
            DatastoreKind::Memory => "memory",
        })
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub datastore: DatastoreKind,
    pub supabase_url: Option<String>,
    pub service_role_key: Option<String>,
    pub database_url: Option<String>,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub http_max_retries: usize,
    pub scheduler_enabled: bool,
    pub sync_cron: String,
    pub web_port: u16,
    pub workspace_root: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let datastore = match non_empty("HACKSYNC_DATASTORE") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(%err, "falling back to the rest datastore");
                DatastoreKind::Rest
            }),
            None => DatastoreKind::Rest,
        };

        Self {
            datastore,
            supabase_url: non_empty("SUPABASE_URL"),
            service_role_key: non_empty("SUPABASE_SERVICE_ROLE_KEY"),
            database_url: non_empty("DATABASE_URL"),
            user_agent: non_empty("HACKSYNC_USER_AGENT")
                .unwrap_or_else(|| "hacksync-bot/0.1".to_string()),
            http_timeout_secs: non_empty("HACKSYNC_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            http_max_retries: non_empty("HACKSYNC_HTTP_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            scheduler_enabled: non_empty("HACKSYNC_SCHEDULER_ENABLED")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(false),
            sync_cron: non_empty("SYNC_CRON").unwrap_or_else(|| "0 0 */6 * * *".to_string()),
            web_port: non_empty("HACKSYNC_WEB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            workspace_root: non_empty("HACKSYNC_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            user_agent: Some(self.user_agent.clone()),
            backoff: BackoffPolicy {
                max_retries: self.http_max_retries,
                ..BackoffPolicy::default()
            },
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.workspace_root.join("sources.yaml")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: HackathonSource,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

/// Ordered list of sources a run pulls from. Order decides the merge order of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        let entry = |source, enabled| SourceConfig {
            source,
            enabled,
            endpoint: None,
        };
        Self {
            sources: vec![
                entry(HackathonSource::Devfolio, true),
                entry(HackathonSource::Devpost, true),
                entry(HackathonSource::Unstop, true),
                entry(HackathonSource::Community, true),
                entry(HackathonSource::Mlh, false),
            ],
        }
    }
}

impl SourceRegistry {
    /// Reads `sources.yaml`; a missing file means the built-in registry.
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no source registry file; using built-in sources");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SyncError::RegistryRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self, SyncError> {
        let registry: Self = serde_yaml::from_str(text).map_err(|source| SyncError::RegistryParse {
            path: origin.to_path_buf(),
            source,
        })?;
        registry.check_unique()?;
        Ok(registry)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    fn check_unique(&self) -> Result<(), SyncError> {
        let mut seen = Vec::with_capacity(self.sources.len());
        for entry in &self.sources {
            if seen.contains(&entry.source) {
                return Err(SyncError::DuplicateSource(entry.source));
            }
            seen.push(entry.source);
        }
        Ok(())
    }
}
