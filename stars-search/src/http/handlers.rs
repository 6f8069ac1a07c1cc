//! Route handlers.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{debug, error};

use crate::http::response::ApiError;
use crate::http::AppState;
use stars_search_repository::SearchContext;
use stars_search_shared::{SearchQuery, SearchResponse, DEFAULT_SEARCH_SIZE};

/// Fields returned with every hit, before the ones requested with `fields`.
const BASE_RESPONSE_FIELDS: [&str; 5] = [
    "name_with_owner",
    "description",
    "url",
    "primary_language_name",
    "primary_language_color",
];

/// Query string of `GET /search`.
///
/// Values are kept as raw strings so malformed numbers fall back to their
/// default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub from: Option<String>,
    pub size: Option<String>,
    /// Comma separated extra fields.
    pub fields: Option<String>,
}

impl SearchParams {
    /// Build the index query, or fail when `q` is missing.
    pub fn to_query(&self) -> Result<SearchQuery, ApiError> {
        let q = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::bad_request("missing q query param"))?;

        Ok(SearchQuery::new(q)
            .with_from(parse_query_param_positive(self.from.as_deref(), 0))
            .with_size(parse_query_param_positive(
                self.size.as_deref(),
                DEFAULT_SEARCH_SIZE,
            ))
            .with_fields(response_fields(self.fields.as_deref())))
    }
}

/// Parse `value` as a positive integer, `default` if absent, malformed or
/// not positive.
pub fn parse_query_param_positive(value: Option<&str>, default: usize) -> usize {
    match value.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) if n > 0 => usize::try_from(n).unwrap_or(default),
        _ => default,
    }
}

/// The base fields plus the comma separated `extra` ones, without duplicates.
///
/// Nested names may use dots (`primary_language.id`); they are matched
/// against the flattened index fields.
fn response_fields(extra: Option<&str>) -> Vec<String> {
    let mut fields: Vec<String> = BASE_RESPONSE_FIELDS.iter().map(|f| f.to_string()).collect();

    for field in extra.unwrap_or_default().split(',') {
        let field = field.trim().replace('.', "_");
        if !field.is_empty() && !fields.contains(&field) {
            fields.push(field);
        }
    }
    fields
}

/// Handler for `GET /search`.
///
/// Runs the query under the configured search timeout. Returns `400` when
/// `q` is missing and `500` for every index failure, cancellation included.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.to_query()?;
    debug!(query = %query.query, from = query.from, size = query.size, "Searching");

    let ctx = SearchContext::with_timeout(state.search_timeout);
    match state.search.search(&ctx, &query).await {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is_client_error() => Err(ApiError::bad_request(e.to_string())),
        Err(e) => {
            error!(error = %e, query = %query.query, "Search failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}

/// Handler for `GET /health`.
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Handler for `OPTIONS` on every route.
pub async fn options_handler() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(header::ALLOW, "GET, OPTIONS")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};
    use stars_search_repository::{IndexSchema, SearchIndexClient, TantivyProvider};
    use stars_search_shared::{PrimaryLanguage, Repository};
    use std::sync::Arc;
    use std::time::Duration;

    async fn state_with(repos: &[Repository]) -> AppState {
        let provider = Arc::new(TantivyProvider::in_memory(IndexSchema::repository()).unwrap());
        let search = SearchIndexClient::new(provider);
        search.batch_index(repos, 100).await.unwrap();
        AppState::new(search, Duration::from_secs(5))
    }

    fn params(q: Option<&str>, from: Option<&str>, size: Option<&str>, fields: Option<&str>) -> SearchParams {
        SearchParams {
            q: q.map(String::from),
            from: from.map(String::from),
            size: size.map(String::from),
            fields: fields.map(String::from),
        }
    }

    async fn body_json(error: ApiError) -> Value {
        let response = error.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_parse_query_param_positive() {
        assert_eq!(parse_query_param_positive(Some("25"), 10), 25);
        assert_eq!(parse_query_param_positive(Some("0"), 10), 10);
        assert_eq!(parse_query_param_positive(Some("-3"), 10), 10);
        assert_eq!(parse_query_param_positive(Some("ten"), 10), 10);
        assert_eq!(parse_query_param_positive(None, 0), 0);
    }

    #[test]
    fn test_query_from_params() {
        let query = params(Some("tokio"), Some("20"), Some("5"), Some("id, primary_language.id,url"))
            .to_query()
            .unwrap();

        assert_eq!(query.query, "tokio");
        assert_eq!(query.from, 20);
        assert_eq!(query.size, 5);
        assert_eq!(
            query.fields,
            vec![
                "name_with_owner",
                "description",
                "url",
                "primary_language_name",
                "primary_language_color",
                "id",
                "primary_language_id",
            ]
        );
    }

    #[test]
    fn test_defaults_from_params() {
        let query = params(Some("tokio"), None, Some("nope"), None).to_query().unwrap();

        assert_eq!(query.from, 0);
        assert_eq!(query.size, 10);
        assert_eq!(query.fields.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_q_is_bad_request() {
        let state = state_with(&[]).await;

        for q in [None, Some(""), Some("   ")] {
            let error = search_handler(State(state.clone()), Query(params(q, None, None, None)))
                .await
                .unwrap_err();

            assert_eq!(error.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(error).await,
                json!({ "code": 400, "status": "Bad Request", "message": "missing q query param" })
            );
        }
    }

    #[tokio::test]
    async fn test_search_returns_projected_hits() {
        let state = state_with(&[Repository::new("R_1", "tokio-rs/tokio", "https://github.com/tokio-rs/tokio")
            .with_description("An asynchronous runtime")
            .with_primary_language(PrimaryLanguage {
                id: "L_1".to_string(),
                name: "Rust".to_string(),
                color: Some("#dea584".to_string()),
            })])
        .await;

        let Json(response) = search_handler(State(state), Query(params(Some("runtime"), None, None, None)))
            .await
            .unwrap();

        assert_eq!(response.total_hits, 1);
        let fields = &response.hits[0].fields;
        assert_eq!(fields["name_with_owner"], json!("tokio-rs/tokio"));
        assert_eq!(fields["primary_language_name"], json!("Rust"));
        assert!(!fields.contains_key("primary_language_id"));
    }

    #[tokio::test]
    async fn test_query_failure_is_server_error() {
        let state = state_with(&[]).await;

        let error = search_handler(
            State(state),
            Query(params(Some("no_such_field:value"), None, None, None)),
        )
        .await
        .unwrap_err();

        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(error).await;
        assert_eq!(body["code"], json!(500));
        assert_eq!(body["status"], json!("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health_handler().await, "OK");
    }
}
