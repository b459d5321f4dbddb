//! API route definitions

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, patch},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

use tracklet::commands::{CommandExecutor, IssueSubmission};
use tracklet::domain::{Issue, IssueFilter, Priority, Status};
use tracklet::errors::TrackerError;
use tracklet::identity::{Identity, StaticIdentity};
use tracklet::output::JsonError;
use tracklet::snapshot::{IssueFeed, IssueSnapshot};
use tracklet::storage::IssueStore;

/// Header carrying the caller's identity on create requests.
pub const USER_HEADER: &str = "x-tracklet-user";

/// Shared application state
pub struct AppState<S: IssueStore> {
    executor: Arc<CommandExecutor<S>>,
    feed: IssueFeed,
    store_timeout: Duration,
}

impl<S: IssueStore> AppState<S> {
    /// Wrap an executor, subscribing to its store's change feed.
    pub fn new(executor: CommandExecutor<S>, store_timeout: Duration) -> Self {
        let feed = executor.storage().subscribe();
        Self {
            executor: Arc::new(executor),
            feed,
            store_timeout,
        }
    }

    /// Latest issue list pushed by the store.
    pub fn snapshot(&self) -> IssueSnapshot {
        self.feed.borrow().clone()
    }
}

impl<S: IssueStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            feed: self.feed.clone(),
            store_timeout: self.store_timeout,
        }
    }
}

/// Create API routes
pub fn create_routes<S: IssueStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/issues", get(list_issues).post(create_issue))
        .route("/issues/similar", get(similar_issues))
        .route("/issues/stream", get(stream_issues))
        .route("/issues/:id", get(get_issue))
        .route("/issues/:id/status", patch(change_status))
        .with_state(state)
}

/// Error returned by handlers, rendered as a JSON error body.
#[derive(Debug)]
pub enum ApiError {
    Tracker(TrackerError),
    /// The store did not answer within the configured timeout.
    Timeout,
    BadRequest(String),
    Internal(String),
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        ApiError::Tracker(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Tracker(err) => {
                let status = match &err {
                    TrackerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    TrackerError::DuplicatesFound { .. } => StatusCode::CONFLICT,
                    TrackerError::TransitionRejected { .. } => StatusCode::CONFLICT,
                    TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
                    TrackerError::Store { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, JsonError::from_tracker_error(&err, "api"))
            }
            ApiError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                JsonError::new("STORE_TIMEOUT", "The store did not respond in time", "api")
                    .with_suggestion("Retry the request; nothing was confirmed"),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                JsonError::new("INVALID_ARGUMENT", message, "api"),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                JsonError::new("INTERNAL_ERROR", message, "api"),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Run a blocking store operation off the async runtime, bounded by the
/// configured timeout.
///
/// A timed-out call is abandoned, not cancelled; its outcome is unknown to the
/// client.
async fn with_store<S, T, F>(state: &AppState<S>, op: F) -> Result<T, ApiError>
where
    S: IssueStore + 'static,
    T: Send + 'static,
    F: FnOnce(&CommandExecutor<S>) -> Result<T, TrackerError> + Send + 'static,
{
    let executor = Arc::clone(&state.executor);
    let call = tokio::task::spawn_blocking(move || op(&executor));

    match tokio::time::timeout(state.store_timeout, call).await {
        Err(_) => {
            tracing::error!(timeout_ms = state.store_timeout.as_millis() as u64, "store call timed out");
            Err(ApiError::Timeout)
        }
        Ok(Err(join_error)) => {
            tracing::error!("store task failed: {}", join_error);
            Err(ApiError::Internal(join_error.to_string()))
        }
        Ok(Ok(result)) => result.map_err(ApiError::from),
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tracklet-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Filter parameters for the issue list and stream
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    priority: Option<String>,
}

impl ListQuery {
    fn to_filter(&self) -> Result<IssueFilter, ApiError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()
            .map_err(ApiError::BadRequest)?;
        let priority = self
            .priority
            .as_deref()
            .map(str::parse::<Priority>)
            .transpose()
            .map_err(ApiError::BadRequest)?;
        Ok(IssueFilter { status, priority })
    }
}

/// List issues from the current snapshot, newest first
async fn list_issues<S: IssueStore + 'static>(
    Query(query): Query<ListQuery>,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    let filter = query.to_filter()?;
    Ok(Json(state.snapshot().filtered(&filter)))
}

/// Get single issue by ID or unique prefix
async fn get_issue<S: IssueStore + 'static>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<Json<Issue>, ApiError> {
    with_store(&state, move |executor| executor.show_issue(&id))
        .await
        .map(Json)
}

/// Create an issue. The creator is taken from the `X-Tracklet-User` header.
async fn create_issue<S: IssueStore + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(submission): Json<IssueSubmission>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let user = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let identity = Identity::resolve(&StaticIdentity(user));
    let snapshot = state.snapshot();

    let issue = with_store(&state, move |executor| {
        executor.submit_issue(&submission, &identity, &snapshot)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Body of a status change request
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusChange {
    /// The status the client saw
    pub current: Status,
    pub requested: Status,
}

/// Move an issue to a new status
async fn change_status<S: IssueStore + 'static>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Issue>, ApiError> {
    with_store(&state, move |executor| {
        executor.change_status(&id, change.current, change.requested)
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    title: String,
}

/// Existing issues whose titles look like `title`
async fn similar_issues<S: IssueStore + 'static>(
    Query(query): Query<SimilarQuery>,
    State(state): State<AppState<S>>,
) -> Json<Vec<Issue>> {
    let snapshot = state.snapshot();
    Json(state.executor.find_similar(&query.title, &snapshot))
}

/// Server-sent events: one `snapshot` event with the filtered list now, then
/// one after every change.
async fn stream_issues<S: IssueStore + 'static>(
    Query(query): Query<ListQuery>,
    State(state): State<AppState<S>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let filter = query.to_filter()?;
    let events = snapshot_stream(state.feed.clone(), filter)
        .map(|issues| Event::default().event("snapshot").json_data(issues));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// The filtered issue list as it is now, then again after every change.
fn snapshot_stream(feed: IssueFeed, filter: IssueFilter) -> impl Stream<Item = Vec<Issue>> {
    WatchStream::new(feed).map(move |snapshot| snapshot.filtered(&filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tracklet::domain::NewIssueRecord;
    use tracklet::storage::InMemoryStorage;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn create_test_app() -> (TestServer, InMemoryStorage) {
        let storage = InMemoryStorage::new();
        storage.init().unwrap();
        let state = AppState::new(CommandExecutor::new(storage.clone()), TIMEOUT);
        (TestServer::new(create_routes(state)).unwrap(), storage)
    }

    fn seed(storage: &InMemoryStorage, title: &str) -> Issue {
        let fields = tracklet::NewIssue::new(title, "Seeded for route tests");
        storage
            .create_issue(NewIssueRecord::from_submission(&fields, "seed"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (server, _) = create_test_app();
        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "status": "ok",
            "service": "tracklet-api",
            "version": env!("CARGO_PKG_VERSION")
        }));
    }

    #[tokio::test]
    async fn test_list_issues_empty() {
        let (server, _) = create_test_app();
        let response = server.get("/issues").await;
        response.assert_status_ok();
        let issues: Vec<Issue> = response.json();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_create_issue_uses_header_identity() {
        let (server, _) = create_test_app();
        let response = server
            .post("/issues")
            .add_header(
                HeaderName::from_static(USER_HEADER),
                HeaderValue::from_static("dana@example.com"),
            )
            .json(&json!({
                "title": "Export to CSV fails",
                "description": "The export button returns a 500 error",
                "priority": "High"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let issue: Issue = response.json();
        assert_eq!(issue.created_by, "dana@example.com");
        assert_eq!(issue.status, Status::Open);

        let listed: Vec<Issue> = server.get("/issues").await.json();
        assert_eq!(listed, vec![issue]);
    }

    #[tokio::test]
    async fn test_create_without_header_is_anonymous() {
        let (server, _) = create_test_app();
        let response = server
            .post("/issues")
            .json(&json!({
                "title": "Profile picture upload",
                "description": "Uploading a PNG never finishes"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let issue: Issue = response.json();
        assert_eq!(issue.created_by, tracklet::domain::ANONYMOUS);
    }

    #[tokio::test]
    async fn test_invalid_fields_return_422() {
        let (server, storage) = create_test_app();
        let response = server
            .post("/issues")
            .json(&json!({ "title": "Hi", "description": "short" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert!(body["error"]["details"]["fields"]["title"].is_string());
        assert!(body["error"]["details"]["fields"]["description"].is_string());
        assert!(storage.list_issues().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_return_409_until_overridden() {
        let (server, storage) = create_test_app();
        seed(&storage, "Safari login button does not work");

        let body = json!({
            "title": "Login button broken on Safari",
            "description": "The login button is unresponsive"
        });
        let response = server.post("/issues").json(&body).await;
        response.assert_status(StatusCode::CONFLICT);
        let error: Value = response.json();
        assert_eq!(error["error"]["code"], "DUPLICATES_FOUND");
        assert_eq!(
            error["error"]["details"]["matches"][0]["title"],
            "Safari login button does not work"
        );

        let mut confirmed = body.clone();
        confirmed["overrideDuplicates"] = json!(true);
        server
            .post("/issues")
            .json(&confirmed)
            .await
            .assert_status(StatusCode::CREATED);
        assert_eq!(storage.list_issues().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_status_change_rules() {
        let (server, storage) = create_test_app();
        let issue = seed(&storage, "Password reset email");
        let path = format!("/issues/{}/status", issue.id);

        let rejected = server
            .patch(&path)
            .json(&json!({ "current": "Open", "requested": "Done" }))
            .await;
        rejected.assert_status(StatusCode::CONFLICT);
        let body: Value = rejected.json();
        assert_eq!(body["error"]["code"], "TRANSITION_REJECTED");

        let accepted = server
            .patch(&path)
            .json(&json!({ "current": "Open", "requested": "In Progress" }))
            .await;
        accepted.assert_status_ok();
        let updated: Issue = accepted.json();
        assert_eq!(updated.status, Status::InProgress);

        server
            .patch(&path)
            .json(&json!({ "current": "In Progress", "requested": "Done" }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_status_change_unknown_issue() {
        let (server, _) = create_test_app();
        server
            .patch("/issues/missing/status")
            .json(&json!({ "current": "Open", "requested": "In Progress" }))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_get_issue_by_prefix() {
        let (server, storage) = create_test_app();
        let issue = seed(&storage, "Search results empty");

        let response = server.get(&format!("/issues/{}", &issue.id[..8])).await;
        response.assert_status_ok();
        let loaded: Issue = response.json();
        assert_eq!(loaded.id, issue.id);

        server
            .get("/issues/nonexistent")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (server, storage) = create_test_app();
        let issue = seed(&storage, "Checkout total wrong");
        seed(&storage, "Avatar upload stalls");
        storage
            .update_issue_status(&issue.id, Status::InProgress)
            .unwrap();

        let issues: Vec<Issue> = server.get("/issues?status=in_progress").await.json();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, issue.id);

        server
            .get("/issues?priority=urgent")
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_snapshot_stream_follows_store() {
        let storage = InMemoryStorage::new();
        storage.init().unwrap();
        seed(&storage, "Checkout total wrong");

        let mut stream = Box::pin(snapshot_stream(
            storage.subscribe(),
            IssueFilter::default(),
        ));
        let first = tokio::time::timeout(TIMEOUT, stream.next()).await.unwrap();
        assert_eq!(first.unwrap().len(), 1);

        let added = seed(&storage, "Avatar upload stalls");
        let second = tokio::time::timeout(TIMEOUT, stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, added.id);
    }

    #[tokio::test]
    async fn test_similar_lookup() {
        let (server, storage) = create_test_app();
        seed(&storage, "Dark mode toggle missing");

        let matches: Vec<Issue> = server
            .get("/issues/similar?title=Dark%20mode%20toggle%20gone")
            .await
            .json();
        assert_eq!(matches.len(), 1);

        let none: Vec<Issue> = server
            .get("/issues/similar?title=Unrelated%20crash")
            .await
            .json();
        assert!(none.is_empty());
    }
}
