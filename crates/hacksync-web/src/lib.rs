//! Axum surface for hacksync: the sync trigger and the read-only listing.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use chrono::Utc;
use hacksync_core::{HackathonMode, HackathonSource, StoredHackathon};
use hacksync_storage::ActiveQuery;
use hacksync_sync::{engine_from_config, maybe_build_scheduler, SyncConfig, SyncEngine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const CRATE_NAME: &str = "hacksync-web";

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Shared handler state. A startup failure (for example missing datastore
/// credentials) is kept so every request can report it.
#[derive(Clone)]
pub struct AppState {
    engine: Result<Arc<SyncEngine>, Arc<str>>,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine: Ok(engine) }
    }

    pub fn unavailable(reason: impl fmt::Display) -> Self {
        Self {
            engine: Err(reason.to_string().into()),
        }
    }

    pub fn engine(&self) -> Option<Arc<SyncEngine>> {
        self.engine.as_ref().ok().cloned()
    }

    fn ready(&self) -> Result<&Arc<SyncEngine>, Response> {
        self.engine.as_ref().map_err(server_error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SortOrder {
    #[default]
    Deadline,
    Newest,
    Prize,
}

#[derive(Debug, Deserialize, Default)]
struct HackathonsQuery {
    source: Option<String>,
    mode: Option<String>,
    search: Option<String>,
    skill: Option<String>,
    online_only: Option<bool>,
    sort: Option<SortOrder>,
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HackathonsPage {
    items: Vec<StoredHackathon>,
    page: usize,
    total_pages: usize,
    total: usize,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/sync-hackathons", any(sync_handler))
        .route("/hackathons", get(hackathons_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}

pub async fn serve(config: SyncConfig) -> anyhow::Result<()> {
    let state = match engine_from_config(&config).await {
        Ok(engine) => AppState::new(Arc::new(engine)),
        Err(err) => {
            error!(error = %err, "sync engine unavailable; requests will report the failure");
            AppState::unavailable(err)
        }
    };

    let scheduler = match state.engine() {
        Some(engine) => maybe_build_scheduler(&config, engine).await?,
        None => None,
    };
    if let Some(sched) = &scheduler {
        sched.start().await?;
        info!(cron = %config.sync_cron, "sync scheduler started");
    }

    let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
    info!(port = config.web_port, "listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "installing ctrl-c handler failed");
            }
        })
        .await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(SyncConfig::from_env()).await
}

async fn sync_handler(method: Method, State(state): State<AppState>) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    let engine = match state.ready() {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };

    let summary = engine.run_once().await;
    Json(json!({
        "success": true,
        "message": summary.message(),
        "stats": summary.stats,
    }))
    .into_response()
}

async fn hackathons_handler(
    State(state): State<AppState>,
    Query(query): Query<HackathonsQuery>,
) -> Response {
    let engine = match state.ready() {
        Ok(engine) => engine,
        Err(resp) => return resp,
    };

    let source = match parse_filter::<HackathonSource>(query.source.as_deref()) {
        Ok(source) => source,
        Err(resp) => return resp,
    };
    let mode = match parse_filter::<HackathonMode>(query.mode.as_deref()) {
        Ok(mode) => mode,
        Err(resp) => return resp,
    };

    match engine.store().list_active(&ActiveQuery { source, mode }, Utc::now()).await {
        Ok(rows) => Json(filtered_paginated_hackathons(rows, &query)).into_response(),
        Err(err) => server_error(err),
    }
}

fn parse_filter<T>(raw: Option<&str>) -> Result<Option<T>, Response>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|err: T::Err| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": err.to_string() })),
            )
                .into_response()
        }),
    }
}

fn server_error(err: impl fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}

fn matches_query(
    row: &StoredHackathon,
    search: Option<&str>,
    skills: &[String],
    online_only: bool,
) -> bool {
    let record = &row.record;
    if online_only && record.mode != HackathonMode::Online {
        return false;
    }
    if let Some(needle) = search {
        let in_title = record.title.to_lowercase().contains(needle);
        let in_description = record
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle));
        if !in_title && !in_description {
            return false;
        }
    }
    skills.is_empty()
        || record
            .skills
            .iter()
            .any(|have| skills.iter().any(|want| have.eq_ignore_ascii_case(want)))
}

fn compare_prize(a: &StoredHackathon, b: &StoredHackathon) -> Ordering {
    match (a.record.prize_value(), b.record.prize_value()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn filtered_paginated_hackathons(
    rows: Vec<StoredHackathon>,
    query: &HackathonsQuery,
) -> HackathonsPage {
    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let skills = query
        .skill
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    let online_only = query.online_only.unwrap_or(false);

    let mut filtered = rows
        .into_iter()
        .filter(|row| matches_query(row, search.as_deref(), &skills, online_only))
        .collect::<Vec<_>>();

    match query.sort.unwrap_or_default() {
        SortOrder::Deadline => filtered.sort_by_key(|row| row.record.registration_deadline),
        SortOrder::Newest => filtered.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Prize => filtered.sort_by(compare_prize),
    }

    let total = filtered.len();
    let per_page = query.per_page.unwrap_or(20).max(1);
    let total_pages = total.max(1).div_ceil(per_page);
    let page = query.page.unwrap_or(1).clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let items = filtered.into_iter().skip(start).take(per_page).collect();

    HackathonsPage {
        items,
        page,
        total_pages,
        total,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use hacksync_adapters::StaticAdapter;
    use hacksync_core::{DateConfidence, HackathonRecord};
    use hacksync_storage::{BackoffPolicy, HttpClientConfig, HttpFetcher, MemoryStore};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(HttpClientConfig {
            timeout: StdDuration::from_secs(2),
            user_agent: None,
            backoff: BackoffPolicy::none(),
        })
        .unwrap()
    }

    fn state_with(store: Arc<MemoryStore>) -> AppState {
        let engine = SyncEngine::with_adapters(
            vec![Box::new(StaticAdapter::unstop()), Box::new(StaticAdapter::community())],
            fetcher(),
            store,
        );
        AppState::new(Arc::new(engine))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    fn row(
        title: &str,
        source: HackathonSource,
        mode: HackathonMode,
        days: i64,
        prize: Option<&str>,
    ) -> StoredHackathon {
        let now = Utc::now();
        StoredHackathon {
            id: Uuid::new_v4(),
            record: HackathonRecord {
                title: title.to_string(),
                description: Some(format!("{title} for builders")),
                start_date: now + Duration::days(days + 5),
                end_date: now + Duration::days(days + 7),
                registration_deadline: now + Duration::days(days),
                registration_url: "https://example.org".into(),
                source,
                mode,
                location: None,
                prize_pool: prize.map(str::to_string),
                image_url: None,
                skills: vec!["Rust".into(), "AI/ML".into()],
                date_confidence: DateConfidence::Parsed,
            },
            is_active: true,
            created_at: now - Duration::days(days),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn options_returns_no_content_with_cors_headers() {
        let resp = app(state_with(Arc::new(MemoryStore::new())))
            .oneshot(request("OPTIONS", "/sync-hackathons"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOWED_HEADERS);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn post_runs_sync_and_reports_stats() {
        let store = Arc::new(MemoryStore::new());
        let app = app(state_with(store.clone()));

        let resp = app.clone().oneshot(request("POST", "/sync-hackathons")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Sync completed. Inserted: 6, Updated: 0, Skipped: 0");
        assert_eq!(body["stats"]["total"], 6);
        assert_eq!(body["stats"]["rejected"], 0);
        assert_eq!(store.rows().await.len(), 6);

        let body = body_json(app.oneshot(request("GET", "/sync-hackathons")).await.unwrap()).await;
        assert_eq!(body["stats"]["inserted"], 0);
        assert_eq!(body["stats"]["updated"], 6);
    }

    #[tokio::test]
    async fn unavailable_engine_reports_error_as_500() {
        let app = app(AppState::unavailable("missing required setting SUPABASE_SERVICE_ROLE_KEY"));
        let resp = app.clone().oneshot(request("POST", "/sync-hackathons")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "missing required setting SUPABASE_SERVICE_ROLE_KEY");

        let resp = app.oneshot(request("OPTIONS", "/sync-hackathons")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_paginates() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed(row(
                "Rust Rally",
                HackathonSource::Devpost,
                HackathonMode::Online,
                3,
                Some("$5,000"),
            ))
            .await;
        store
            .seed(row(
                "Chain Camp",
                HackathonSource::Devfolio,
                HackathonMode::Offline,
                10,
                Some("₹50,00,000"),
            ))
            .await;
        store
            .seed(row("Data Derby", HackathonSource::Devpost, HackathonMode::Hybrid, 6, None))
            .await;
        store
            .seed(row("Old Jam", HackathonSource::Devpost, HackathonMode::Online, -2, None))
            .await;
        let app = app(state_with(store.clone()));

        let resp = app.clone().oneshot(request("GET", "/hackathons")).await.unwrap();
        let body = body_json(resp).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["items"][0]["title"], "Rust Rally");
        assert_eq!(body["items"][2]["title"], "Chain Camp");

        let body = body_json(
            app.clone()
                .oneshot(request("GET", "/hackathons?source=devpost&sort=prize"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["title"], "Rust Rally");
        assert_eq!(body["items"][1]["title"], "Data Derby");

        let body = body_json(
            app.clone()
                .oneshot(request("GET", "/hackathons?search=CHAIN&skill=go,%20rust"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["source"], "devfolio");

        let body = body_json(
            app.clone()
                .oneshot(request("GET", "/hackathons?online_only=true"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["total"], 1);

        let body = body_json(
            app.clone()
                .oneshot(request("GET", "/hackathons?per_page=2&page=9&sort=newest"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["page"], 2);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["title"], "Chain Camp");

        let resp = app.oneshot(request("GET", "/hackathons?mode=underwater")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn prize_sort_ranks_unpriced_rows_last() {
        let rows = vec![
            row(
                "None",
                HackathonSource::Unstop,
                HackathonMode::Online,
                1,
                Some("Pre-placement Interview"),
            ),
            row("Small", HackathonSource::Unstop, HackathonMode::Online, 2, Some("$500")),
            row("Large", HackathonSource::Unstop, HackathonMode::Online, 3, Some("₹3,00,000")),
        ];
        let page = filtered_paginated_hackathons(
            rows,
            &HackathonsQuery {
                sort: Some(SortOrder::Prize),
                ..Default::default()
            },
        );
        let titles = page.items.iter().map(|r| r.record.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["Large", "Small", "None"]);
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = app(state_with(Arc::new(MemoryStore::new())))
            .oneshot(request("GET", "/healthz"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }
}
