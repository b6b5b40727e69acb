//! Sync orchestration: adapters fan out, records are validated and upserted,
//! then expired listings are swept.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use hacksync_adapters::{adapter_for_source, AdapterContext, SourceAdapter};
use hacksync_core::{validate_record, HackathonSource, Validation};
use hacksync_storage::{
    HackathonStore, HttpFetcher, MemoryStore, PgStore, RestStore, StoreError, UpsertOutcome,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub mod config;

pub use config::{DatastoreKind, SourceConfig, SourceRegistry, SyncConfig};

pub const CRATE_NAME: &str = "hacksync-sync";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reading {}: {source}", .path.display())]
    RegistryRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    RegistryParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("source {0} is listed more than once")]
    DuplicateSource(HackathonSource),
    #[error("building http client: {0:#}")]
    HttpClient(anyhow::Error),
}

/// Counters for one run. `total` counts every record the adapters produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub total: usize,
    pub deactivated: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub per_source: BTreeMap<HackathonSource, usize>,
    pub stats: SyncStats,
}

impl SyncSummary {
    pub fn message(&self) -> String {
        format!(
            "Sync completed. Inserted: {}, Updated: {}, Skipped: {}",
            self.stats.inserted, self.stats.updated, self.stats.skipped
        )
    }
}

pub struct SyncEngine {
    adapters: Vec<Box<dyn SourceAdapter>>,
    http: HttpFetcher,
    store: Arc<dyn HackathonStore>,
    run_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        config: &SyncConfig,
        registry: &SourceRegistry,
        store: Arc<dyn HackathonStore>,
    ) -> Result<Self, SyncError> {
        let http = HttpFetcher::new(config.http_client_config()).map_err(SyncError::HttpClient)?;
        let adapters = registry
            .enabled()
            .map(|entry| adapter_for_source(entry.source, entry.endpoint.as_deref()))
            .collect();
        Ok(Self::with_adapters(adapters, http, store))
    }

    pub fn with_adapters(
        adapters: Vec<Box<dyn SourceAdapter>>,
        http: HttpFetcher,
        store: Arc<dyn HackathonStore>,
    ) -> Self {
        Self {
            adapters,
            http,
            store,
            run_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> Arc<dyn HackathonStore> {
        Arc::clone(&self.store)
    }

    pub fn sources(&self) -> Vec<HackathonSource> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    pub async fn run_once(&self) -> SyncSummary {
        self.run_at(Utc::now()).await
    }

    /// One full pass against the clock `now`. Runs in the same process never overlap.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SyncSummary {
        let _guard = self.run_lock.lock().await;
        let ctx = AdapterContext::new(now);
        let span = info_span!("sync_run", run_id = %ctx.run_id, backend = self.store.backend());
        self.run_locked(ctx, now).instrument(span).await
    }

    async fn run_locked(&self, ctx: AdapterContext, now: DateTime<Utc>) -> SyncSummary {
        let started_at = Utc::now();
        info!(sources = self.adapters.len(), "starting hackathon sync");

        let batches =
            join_all(self.adapters.iter().map(|adapter| adapter.fetch(&self.http, &ctx))).await;

        let mut stats = SyncStats::default();
        let mut per_source = BTreeMap::new();
        let mut valid = Vec::new();
        for (adapter, records) in self.adapters.iter().zip(batches) {
            *per_source.entry(adapter.source()).or_insert(0) += records.len();
            stats.total += records.len();
            for record in records {
                match validate_record(record) {
                    Validation::Valid(record) => valid.push(record),
                    Validation::Rejected { record, reason } => {
                        stats.rejected += 1;
                        warn!(
                            title = %record.title,
                            source = %record.source,
                            %reason,
                            "rejected hackathon record"
                        );
                    }
                }
            }
        }

        for record in &valid {
            match self.store.upsert(record, now).await {
                Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
                Ok(UpsertOutcome::Updated) => stats.updated += 1,
                Err(err) => {
                    stats.skipped += 1;
                    warn!(
                        title = %record.title,
                        source = %record.source,
                        error = %err,
                        "upsert failed; skipping record"
                    );
                }
            }
        }

        stats.deactivated = match self.store.deactivate_expired(now).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "deactivating expired hackathons failed");
                0
            }
        };

        info!(
            inserted = stats.inserted,
            updated = stats.updated,
            skipped = stats.skipped,
            rejected = stats.rejected,
            deactivated = stats.deactivated,
            total = stats.total,
            "hackathon sync finished"
        );

        SyncSummary {
            run_id: ctx.run_id,
            started_at,
            finished_at: Utc::now(),
            per_source,
            stats,
        }
    }
}

/// Opens the datastore named by the configuration.
pub async fn build_store(config: &SyncConfig) -> Result<Arc<dyn HackathonStore>, SyncError> {
    let store: Arc<dyn HackathonStore> = match config.datastore {
        DatastoreKind::Rest => {
            let url = config
                .supabase_url
                .as_deref()
                .ok_or(SyncError::MissingSetting("SUPABASE_URL"))?;
            let key = config
                .service_role_key
                .as_deref()
                .ok_or(SyncError::MissingSetting("SUPABASE_SERVICE_ROLE_KEY"))?;
            Arc::new(RestStore::new(url, key, config.http_client_config().timeout)?)
        }
        DatastoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(SyncError::MissingSetting("DATABASE_URL"))?;
            Arc::new(PgStore::connect(url).await?)
        }
        DatastoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    info!(backend = store.backend(), "datastore ready");
    Ok(store)
}

/// Loads the registry and opens the datastore, yielding a ready engine.
pub async fn engine_from_config(config: &SyncConfig) -> Result<SyncEngine, SyncError> {
    let registry = SourceRegistry::load(&config.registry_path()).await?;
    let store = build_store(config).await?;
    SyncEngine::new(config, &registry, store)
}

pub async fn run_sync_once_from_env() -> anyhow::Result<SyncSummary> {
    let config = SyncConfig::from_env();
    let engine = engine_from_config(&config).await.context("preparing sync engine")?;
    Ok(engine.run_once().await)
}

/// Registers the cron job that runs the same sync as the HTTP trigger.
pub async fn maybe_build_scheduler(
    config: &SyncConfig,
    engine: Arc<SyncEngine>,
) -> anyhow::Result<Option<JobScheduler>> {
    if !config.scheduler_enabled {
        return Ok(None);
    }

    let sched = JobScheduler::new().await.context("creating scheduler")?;
    let cron = config.sync_cron.as_str();
    let job = Job::new_async(cron, move |_uuid, _l| {
        let engine = Arc::clone(&engine);
        Box::pin(async move {
            let summary = engine.run_once().await;
            info!(run_id = %summary.run_id, "{}", summary.message());
        })
    })
    .with_context(|| format!("creating scheduler job for cron {cron}"))?;
    sched.add(job).await.context("adding scheduler job")?;
    Ok(Some(sched))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use hacksync_adapters::{AdapterKind, MlhAdapter};
    use hacksync_core::{DateConfidence, HackathonMode, HackathonRecord, StoredHackathon};
    use hacksync_storage::{ActiveQuery, BackoffPolicy, HttpClientConfig};

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).single().unwrap()
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(HttpClientConfig {
            timeout: std::time::Duration::from_secs(2),
            user_agent: None,
            backoff: BackoffPolicy::none(),
        })
        .unwrap()
    }

    fn record(title: &str, source: HackathonSource, deadline: DateTime<Utc>) -> HackathonRecord {
        HackathonRecord {
            title: title.to_string(),
            description: Some(format!("{title} description")),
            start_date: deadline + Duration::days(5),
            end_date: deadline + Duration::days(7),
            registration_deadline: deadline,
            registration_url: "https://example.org/register".into(),
            source,
            mode: HackathonMode::Online,
            location: None,
            prize_pool: Some("$1,000".into()),
            image_url: None,
            skills: vec!["Rust".into()],
            date_confidence: DateConfidence::Parsed,
        }
    }

    struct FixedAdapter {
        source: HackathonSource,
        records: std::sync::Mutex<Vec<HackathonRecord>>,
    }

    impl FixedAdapter {
        fn boxed(source: HackathonSource, records: Vec<HackathonRecord>) -> Box<dyn SourceAdapter> {
            Box::new(Self {
                source,
                records: std::sync::Mutex::new(records),
            })
        }
    }

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn source(&self) -> HackathonSource {
            self.source
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::Static
        }

        async fn fetch(&self, _http: &HttpFetcher, _ctx: &AdapterContext) -> Vec<HackathonRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    /// Fails every upsert whose title starts with "broken".
    struct FlakyStore(MemoryStore);

    #[async_trait]
    impl HackathonStore for FlakyStore {
        fn backend(&self) -> &'static str {
            "flaky"
        }

        async fn upsert(
            &self,
            record: &HackathonRecord,
            now: DateTime<Utc>,
        ) -> Result<UpsertOutcome, StoreError> {
            if record.title.starts_with("broken") {
                return Err(StoreError::Status {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.0.upsert(record, now).await
        }

        async fn deactivate_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
            Err(StoreError::InvalidRow("sweep refused".into()))
        }

        async fn list_active(
            &self,
            query: &ActiveQuery,
            now: DateTime<Utc>,
        ) -> Result<Vec<StoredHackathon>, StoreError> {
            self.0.list_active(query, now).await
        }
    }

    #[tokio::test]
    async fn inserts_then_updates_on_second_run() {
        let now = fixed_now();
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::with_adapters(
            vec![
                FixedAdapter::boxed(
                    HackathonSource::Devfolio,
                    vec![
                        record("Alpha", HackathonSource::Devfolio, now + Duration::days(10)),
                        record("Beta", HackathonSource::Devfolio, now + Duration::days(12)),
                    ],
                ),
                FixedAdapter::boxed(
                    HackathonSource::Devpost,
                    vec![record("Alpha", HackathonSource::Devpost, now + Duration::days(3))],
                ),
            ],
            fetcher(),
            store.clone(),
        );

        let first = engine.run_at(now).await;
        assert_eq!(
            first.stats,
            SyncStats {
                inserted: 3,
                updated: 0,
                skipped: 0,
                rejected: 0,
                total: 3,
                deactivated: 0
            }
        );
        assert_eq!(first.per_source[&HackathonSource::Devfolio], 2);
        assert_eq!(first.message(), "Sync completed. Inserted: 3, Updated: 0, Skipped: 0");

        let second = engine.run_at(now + Duration::minutes(1)).await;
        assert_eq!(second.stats.inserted, 0);
        assert_eq!(second.stats.updated, 3);
        assert_eq!(store.rows().await.len(), 3);

        let alpha = store.get("Alpha", HackathonSource::Devfolio).await.unwrap();
        assert_eq!(alpha.updated_at, now + Duration::minutes(1));
        assert_eq!(alpha.created_at, now);
    }

    #[tokio::test]
    async fn updates_replace_mutable_fields_but_keep_activity_flag() {
        let now = fixed_now();
        let store = Arc::new(MemoryStore::new());
        let mut stale = record("Gamma", HackathonSource::Devpost, now + Duration::days(2));
        stale.prize_pool = Some("$10".into());
        store
            .seed(StoredHackathon {
                id: Uuid::new_v4(),
                record: stale,
                is_active: false,
                created_at: now - Duration::days(1),
                updated_at: now - Duration::days(1),
            })
            .await;

        let mut fresh = record("Gamma", HackathonSource::Devpost, now + Duration::days(20));
        fresh.mode = HackathonMode::Hybrid;
        fresh.skills = vec!["Go".into(), "Go".into()];
        let engine = SyncEngine::with_adapters(
            vec![FixedAdapter::boxed(HackathonSource::Devpost, vec![fresh.clone()])],
            fetcher(),
            store.clone(),
        );

        let summary = engine.run_at(now).await;
        assert_eq!(summary.stats.updated, 1);
        let row = store.get("Gamma", HackathonSource::Devpost).await.unwrap();
        assert_eq!(row.record, fresh);
        assert!(!row.is_active);
    }

    #[tokio::test]
    async fn past_deadline_record_is_inserted_then_swept() {
        let now = fixed_now();
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::with_adapters(
            vec![FixedAdapter::boxed(
                HackathonSource::Devfolio,
                vec![record("Yesterday Hack", HackathonSource::Devfolio, now - Duration::days(1))],
            )],
            fetcher(),
            store.clone(),
        );

        let summary = engine.run_at(now).await;
        assert_eq!(
            (summary.stats.inserted, summary.stats.updated, summary.stats.skipped),
            (1, 0, 0)
        );
        assert_eq!(summary.stats.deactivated, 1);
        let row = store.get("Yesterday Hack", HackathonSource::Devfolio).await.unwrap();
        assert!(!row.is_active);

        let again = engine.run_at(now).await;
        assert_eq!(again.stats.updated, 1);
        assert_eq!(again.stats.deactivated, 0);
    }

    #[tokio::test]
    async fn rejected_records_are_counted_and_never_written() {
        let now = fixed_now();
        let store = Arc::new(MemoryStore::new());
        let mut blank = record("   ", HackathonSource::Devpost, now + Duration::days(4));
        blank.description = None;
        let mut bad_url = record("No Link", HackathonSource::Devpost, now + Duration::days(4));
        bad_url.registration_url = "javascript:void(0)".into();

        let engine = SyncEngine::with_adapters(
            vec![FixedAdapter::boxed(
                HackathonSource::Devpost,
                vec![
                    blank,
                    bad_url,
                    record("Kept", HackathonSource::Devpost, now + Duration::days(4)),
                ],
            )],
            fetcher(),
            store.clone(),
        );

        let summary = engine.run_at(now).await;
        assert_eq!(summary.stats.rejected, 2);
        assert_eq!(summary.stats.inserted, 1);
        assert_eq!(summary.stats.total, 3);
        let rows = store.rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.title, "Kept");
    }

    #[tokio::test]
    async fn write_and_sweep_failures_do_not_abort_the_run() {
        let now = fixed_now();
        let store = Arc::new(FlakyStore(MemoryStore::new()));
        let engine = SyncEngine::with_adapters(
            vec![FixedAdapter::boxed(
                HackathonSource::Community,
                vec![
                    record("broken listing", HackathonSource::Community, now + Duration::days(4)),
                    record("Healthy", HackathonSource::Community, now + Duration::days(4)),
                ],
            )],
            fetcher(),
            store.clone(),
        );

        let summary = engine.run_at(now).await;
        assert_eq!(summary.stats.skipped, 1);
        assert_eq!(summary.stats.inserted, 1);
        assert_eq!(summary.stats.deactivated, 0);
        assert_eq!(summary.message(), "Sync completed. Inserted: 1, Updated: 0, Skipped: 1");
    }

    #[tokio::test]
    async fn unreachable_source_contributes_nothing() {
        let now = fixed_now();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::with_adapters(
            vec![
                Box::new(MlhAdapter::new(format!("http://{dead}/events"))),
                FixedAdapter::boxed(
                    HackathonSource::Unstop,
                    vec![record("Static One", HackathonSource::Unstop, now + Duration::days(9))],
                ),
            ],
            fetcher(),
            store.clone(),
        );

        let summary = engine.run_at(now).await;
        assert_eq!(summary.per_source[&HackathonSource::Mlh], 0);
        assert_eq!(summary.stats.total, 1);
        assert_eq!(summary.stats.inserted, 1);
    }

    #[tokio::test]
    async fn engine_follows_registry_order_and_enablement() {
        let registry = SourceRegistry::default();
        let engine = SyncEngine::new(
            &SyncConfig::default(),
            &registry,
            Arc::new(MemoryStore::new()),
        )
        .unwrap();
        assert_eq!(
            engine.sources(),
            vec![
                HackathonSource::Devfolio,
                HackathonSource::Devpost,
                HackathonSource::Unstop,
                HackathonSource::Community
            ]
        );
    }

    #[tokio::test]
    async fn store_selection_reports_missing_settings() {
        let rest = SyncConfig::default();
        assert!(matches!(
            build_store(&rest).await,
            Err(SyncError::MissingSetting("SUPABASE_URL"))
        ));

        let mut keyless = SyncConfig::default();
        keyless.supabase_url = Some("https://project.example.co".into());
        assert!(matches!(
            build_store(&keyless).await,
            Err(SyncError::MissingSetting("SUPABASE_SERVICE_ROLE_KEY"))
        ));

        let mut pg = SyncConfig::default();
        pg.datastore = DatastoreKind::Postgres;
        assert!(matches!(build_store(&pg).await, Err(SyncError::MissingSetting("DATABASE_URL"))));

        let mut memory = SyncConfig::default();
        memory.datastore = DatastoreKind::Memory;
        assert_eq!(build_store(&memory).await.unwrap().backend(), "memory");
    }

    #[tokio::test]
    async fn scheduler_is_skipped_unless_enabled() {
        let engine = Arc::new(SyncEngine::with_adapters(
            Vec::new(),
            fetcher(),
            Arc::new(MemoryStore::new()),
        ));
        let sched = maybe_build_scheduler(&SyncConfig::default(), engine).await.unwrap();
        assert!(sched.is_none());
    }
}
