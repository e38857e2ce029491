//! HTTP API.
//!
//! - `GET  /health`: liveness and store backend
//! - `GET  /api/hype`: API info
//! - `POST /api/hype`: submit a daily entry
//! - `GET  /api/recent-wins?limit=N`: newest entries
//! - `POST /api/generate-weekly-report?withAI=true`: build this week's report
//! - `GET  /api/store-check`: store connectivity test
//!
//! Every `/api` route requires an allow-listed identity.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::require_allowed;
use crate::context::AppContext;
use crate::error::{ErrorClass, ReportError, SubmitError};
use crate::models::{AiOutcome, CategoryCounts, LogEntry, ReportSummary};
use crate::pipeline;
use crate::week;

const DEFAULT_RECENT_LIMIT: usize = 5;
const MAX_RECENT_LIMIT: usize = 100;

// ── Errors ────────────────────────────────────────────────────────────────

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        let status = match class {
            ErrorClass::Validation | ErrorClass::EmptyResult => StatusCode::BAD_REQUEST,
            ErrorClass::Dependency => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(ErrorClass::Validation, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(ErrorClass::Validation, rejection.body_text())
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        if e.class() == ErrorClass::Dependency {
            tracing::error!("failed to store entry: {e}");
        }
        ApiError::new(e.class(), e.to_string())
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        if e.class() == ErrorClass::Dependency {
            tracing::error!("failed to generate weekly report: {e}");
        }
        ApiError::new(e.class(), e.to_string())
    }
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitRequest {
    content: Option<String>,
    category: Option<String>,
    impact: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    success: bool,
    message: &'static str,
    page_id: String,
}

#[derive(Deserialize)]
struct RecentQuery {
    limit: Option<String>,
}

#[derive(Serialize)]
struct RecentResponse {
    success: bool,
    wins: Vec<LogEntry>,
    count: usize,
}

#[derive(Deserialize)]
struct ReportQuery {
    #[serde(default, rename = "withAI")]
    with_ai: bool,
}

#[derive(Serialize)]
struct ReportResponse {
    success: bool,
    report: ReportView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportView {
    page_id: String,
    report_created: bool,
    week: String,
    date_range: String,
    total_logs: usize,
    total_impact: i64,
    average_impact: f64,
    categories: CategoryCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    resume_analysis: Option<AiOutcome>,
}

impl From<ReportSummary> for ReportView {
    fn from(summary: ReportSummary) -> Self {
        ReportView {
            page_id: summary.report_id,
            report_created: summary.report_created,
            week: summary.week.label(),
            date_range: summary.week.date_range(),
            total_logs: summary.aggregate.entry_count,
            total_impact: summary.aggregate.total_impact,
            average_impact: summary.aggregate.average_impact,
            categories: summary.aggregate.category_counts,
            resume_analysis: summary.resume_analysis,
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "store": ctx.store.backend(),
    }))
}

async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "Daily wins API is running",
        "endpoints": {
            "POST /api/hype": "Submit a daily achievement",
            "GET /api/recent-wins": "List recent achievements",
            "POST /api/generate-weekly-report": "Build this week's report",
        },
    }))
}

async fn submit(
    State(ctx): State<AppContext>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(body) = body?;
    let id = pipeline::submit_entry(
        ctx.store.as_ref(),
        body.content.as_deref(),
        body.category.as_deref(),
        body.impact.as_ref(),
        week::today(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: "Daily log created successfully!",
            page_id: id,
        }),
    ))
}

fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_RECENT_LIMIT);
    };
    match raw.trim().parse::<usize>() {
        Ok(limit) if (1..=MAX_RECENT_LIMIT).contains(&limit) => Ok(limit),
        _ => Err(ApiError::new(
            ErrorClass::Validation,
            format!("limit must be an integer between 1 and {MAX_RECENT_LIMIT}"),
        )),
    }
}

async fn recent_wins(
    State(ctx): State<AppContext>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<RecentResponse>, ApiError> {
    let Query(query) = query?;
    let limit = parse_limit(query.limit.as_deref())?;
    let wins = pipeline::recent_entries(ctx.store.as_ref(), limit)
        .await
        .map_err(|e| {
            tracing::error!("failed to fetch recent entries: {e}");
            ApiError::new(ErrorClass::Dependency, format!("Failed to fetch recent logs: {e}"))
        })?;

    Ok(Json(RecentResponse {
        success: true,
        count: wins.len(),
        wins,
    }))
}

async fn generate_weekly_report(
    State(ctx): State<AppContext>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Query(query) = query?;
    let summary = pipeline::generate_weekly_report(&ctx, query.with_ai, week::today()).await?;
    Ok(Json(ReportResponse {
        success: true,
        report: summary.into(),
    }))
}

async fn store_check(State(ctx): State<AppContext>) -> Result<Json<Value>, ApiError> {
    ctx.store.check().await.map_err(|e| {
        tracing::error!(backend = ctx.store.backend(), "store check failed: {e}");
        ApiError::new(ErrorClass::Dependency, e.to_string())
    })?;
    Ok(Json(json!({
        "success": true,
        "message": "Store connection successful!",
        "backend": ctx.store.backend(),
    })))
}

// ── Router ────────────────────────────────────────────────────────────────

pub fn router(ctx: AppContext) -> Router {
    let api = Router::new()
        .route("/api/hype", get(api_info).post(submit))
        .route("/api/recent-wins", get(recent_wins))
        .route("/api/generate-weekly-report", post(generate_weekly_report))
        .route("/api/store-check", get(store_check))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_allowed));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

pub async fn serve(ctx: AppContext, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("daily-wins listening on {bind}");
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::ai::TextGenerator;
    use crate::auth::{AllowList, IDENTITY_HEADER};
    use crate::pipeline::tests::{BrokenStore, FailingGenerator};
    use crate::store::{MemoryStore, RecordStore};

    const USER: &str = "me@example.com";

    fn app(store: Arc<MemoryStore>, generator: Option<Arc<dyn TextGenerator>>) -> Router {
        router(AppContext::new(store, generator, AllowList::new([USER])))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        };
        send(app, method, uri, body).await
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(IDENTITY_HEADER, USER)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn submitted_entry_is_listed_first() {
        let app = app(Arc::new(MemoryStore::new()), None);

        let (status, created) = call(
            &app,
            "POST",
            "/api/hype",
            Some(json!({ "content": "Shipped X", "category": "Project", "impact": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["success"], true);

        let (status, listed) = call(&app, "GET", "/api/recent-wins?limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["count"], 1);
        let win = &listed["wins"][0];
        assert_eq!(win["id"], created["pageId"]);
        assert_eq!(win["content"], "Shipped X");
        assert_eq!(win["category"], "Project");
        assert_eq!(win["impact"], 5);
        assert!(win["createdAt"].is_string());
    }

    #[tokio::test]
    async fn invalid_submission_is_a_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), None);

        let (status, body) = call(
            &app,
            "POST",
            "/api/hype",
            Some(json!({ "content": "x", "category": "Project", "impact": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("between 1 and 5"));

        let (_, listed) = call(&app, "GET", "/api/recent-wins", None).await;
        assert_eq!(listed["count"], 0);
    }

    #[tokio::test]
    async fn bad_limit_is_rejected() {
        let app = app(Arc::new(MemoryStore::new()), None);
        for uri in ["/api/recent-wins?limit=abc", "/api/recent-wins?limit=0"] {
            let (status, body) = call(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn empty_week_report_is_a_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone(), None);

        let (status, body) = call(&app, "POST", "/api/generate-weekly-report", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No logs found for this week");
        assert!(store.reports().is_empty());
    }

    #[tokio::test]
    async fn report_survives_generator_failure() {
        let store = Arc::new(MemoryStore::new());
        let generator: Arc<dyn TextGenerator> = Arc::new(FailingGenerator);
        let app = app(store.clone(), Some(generator));

        call(
            &app,
            "POST",
            "/api/hype",
            Some(json!({ "content": "Fixed the deploy", "category": "Firefighting", "impact": 4 })),
        )
        .await;

        let uri = "/api/generate-weekly-report?withAI=true";
        let (status, body) = call(&app, "POST", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let report = &body["report"];
        assert_eq!(report["totalLogs"], 1);
        assert_eq!(report["totalImpact"], 4);
        assert_eq!(report["averageImpact"], 4.0);
        assert_eq!(report["categories"]["Firefighting"], 1);
        assert_eq!(report["week"], week::compute_week(week::today()).label());
        assert!(report["resumeAnalysis"]["error"].as_str().unwrap().contains("overloaded"));
        assert_eq!(report["resumeAnalysis"]["bulletsCreated"], 0);
        assert_eq!(store.reports().len(), 1);
    }

    #[tokio::test]
    async fn malformed_requests_use_the_error_envelope() {
        let app = app(Arc::new(MemoryStore::new()), None);

        let (status, body) = call(
            &app,
            "POST",
            "/api/hype",
            Some(json!({ "content": 5, "category": "Project", "impact": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, "POST", "/api/hype", Body::from("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let uri = "/api/generate-weekly-report?withAI=yes";
        let (status, body) = call(&app, "POST", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn store_outage_is_a_server_error() {
        let broken: Arc<dyn RecordStore> = Arc::new(BrokenStore);
        let app = router(AppContext::new(broken, None, AllowList::new([USER])));

        let (status, body) = call(&app, "POST", "/api/generate-weekly-report", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("service unavailable"));

        let (status, body) = call(
            &app,
            "POST",
            "/api/hype",
            Some(json!({ "content": "x", "category": "Project", "impact": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn report_without_ai_omits_analysis() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store, None);
        call(
            &app,
            "POST",
            "/api/hype",
            Some(json!({ "content": "Gave a talk", "category": "Communication", "impact": 3 })),
        )
        .await;

        let (status, body) = call(&app, "POST", "/api/generate-weekly-report", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["report"].get("resumeAnalysis").is_none());
        assert_eq!(body["report"]["reportCreated"], true);
    }

    #[tokio::test]
    async fn api_requires_allow_listed_identity() {
        let app = app(Arc::new(MemoryStore::new()), None);

        let anonymous = Request::builder()
            .uri("/api/recent-wins")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let stranger = Request::builder()
            .uri("/api/recent-wins")
            .header(IDENTITY_HEADER, "mallory@example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(stranger).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(health).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
