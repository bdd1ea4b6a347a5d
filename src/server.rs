//! HTTP adapter around [`Pipeline`].
//!
//! - `POST /knn_graph?words=&n_neighbors=&lang=&weighting=&metric=` with the
//!   text as the raw request body, answered with the JSON node array.
//! - `GET /healthz`.
//!
//! Each request runs on the blocking pool. Errors, including malformed query
//! strings and non-UTF-8 bodies, come back as `{ "kind": ..., "message": ... }`
//! with a status chosen per [`ErrorKind`].

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::PipelineConfig;
use crate::distance::Metric;
use crate::embedding::EmbeddingStore;
use crate::error::{Error, ErrorKind};
use crate::hierarchy::OutputNode;
use crate::pipeline::{CancelToken, Pipeline};
use crate::text::Tokenizer;
use crate::weighting::WeightingMode;

/// Server-wide defaults applied to every request.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Parameters used where the query string is silent.
    pub defaults: PipelineConfig,
    /// Language used when `lang` is absent.
    pub default_lang: String,
    /// Per-request deadline; `None` lets a run take as long as it needs.
    pub request_timeout: Option<Duration>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            defaults: PipelineConfig::default(),
            default_lang: "en".to_string(),
            request_timeout: None,
        }
    }
}

/// Query-string parameters of `POST /knn_graph`.
///
/// Mode and metric names stay strings here so a bad value surfaces as a
/// `configuration` error body rather than a bare extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct KnnGraphParams {
    /// Maximum number of words.
    pub words: Option<usize>,
    /// Neighbors per word.
    pub n_neighbors: Option<usize>,
    /// Language code.
    pub lang: Option<String>,
    /// Weighting mode name.
    pub weighting: Option<String>,
    /// Distance metric name.
    pub metric: Option<String>,
    /// Modularity resolution.
    pub resolution: Option<f64>,
    /// Node-order seed.
    pub seed: Option<u64>,
}

impl KnnGraphParams {
    /// Overlay the parameters on `defaults`.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for unknown weighting or metric names.
    pub fn resolve(self, defaults: &PipelineConfig) -> Result<PipelineConfig, Error> {
        let mut config = defaults.clone();
        if let Some(words) = self.words {
            config.max_words = words;
        }
        if let Some(k) = self.n_neighbors {
            config.k = k;
        }
        if let Some(name) = self.weighting.as_deref() {
            config.weighting = WeightingMode::from_str(name)?;
        }
        if let Some(name) = self.metric.as_deref() {
            config.metric = Metric::from_str(name)?;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

/// Error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error kind, e.g. `insufficient_data`.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Configuration => StatusCode::BAD_REQUEST,
        ErrorKind::UnsupportedLanguage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::InsufficientData => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::UnknownWord => StatusCode::FAILED_DEPENDENCY,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::EmbeddingLookup => StatusCode::BAD_GATEWAY,
        ErrorKind::DimensionMismatch => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: &Error) -> ApiError {
    let kind = err.kind();
    (
        status_for(kind),
        Json(ErrorBody {
            kind: kind.as_str(),
            message: err.to_string(),
        }),
    )
}

struct AppState<T, S> {
    pipeline: Arc<Pipeline<T, S>>,
    settings: Arc<ServerSettings>,
}

impl<T, S> Clone for AppState<T, S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Trips the token when the request future is dropped (client went away).
struct CancelOnDrop(Option<CancelToken>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.0.take() {
            token.cancel();
        }
    }
}

/// Build the router.
pub fn router<T, S>(pipeline: Arc<Pipeline<T, S>>, settings: ServerSettings) -> Router
where
    T: Tokenizer + 'static,
    S: EmbeddingStore + 'static,
{
    let state = AppState {
        pipeline,
        settings: Arc::new(settings),
    };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/knn_graph", post(knn_graph_handler::<T, S>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn start_server<T, S>(
    pipeline: Arc<Pipeline<T, S>>,
    settings: ServerSettings,
    addr: SocketAddr,
) -> anyhow::Result<()>
where
    T: Tokenizer + 'static,
    S: EmbeddingStore + 'static,
{
    let app = router(pipeline, settings);
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn knn_graph_handler<T, S>(
    State(state): State<AppState<T, S>>,
    query: Result<Query<KnnGraphParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<Vec<OutputNode>>, ApiError>
where
    T: Tokenizer + 'static,
    S: EmbeddingStore + 'static,
{
    let Query(params) =
        query.map_err(|rejection| api_error(&Error::config("query", rejection.body_text())))?;
    let body = String::from_utf8(body.to_vec())
        .map_err(|e| api_error(&Error::config("body", format!("text is not valid UTF-8: {e}"))))?;
    let lang = params
        .lang
        .clone()
        .unwrap_or_else(|| state.settings.default_lang.clone());
    let config = params
        .resolve(&state.settings.defaults)
        .map_err(|e| api_error(&e))?;

    let mut cancel = CancelToken::new();
    if let Some(timeout) = state.settings.request_timeout {
        cancel = cancel.with_timeout(timeout);
    }
    let guard = CancelOnDrop(Some(cancel.clone()));

    let pipeline = Arc::clone(&state.pipeline);
    let result =
        tokio::task::spawn_blocking(move || pipeline.run_with(&body, &lang, &config, &cancel))
            .await
            .map_err(|err| {
                tracing::error!("pipeline task failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        kind: "internal",
                        message: format!("pipeline task failed: {err}"),
                    }),
                )
            })?;
    guard.disarm();

    match result {
        Ok(nodes) => Ok(Json(nodes)),
        Err(err) => {
            tracing::warn!(kind = err.kind().as_str(), "request failed: {err}");
            Err(api_error(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::InMemoryStore;
    use crate::text::SimpleTokenizer;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(settings: ServerSettings) -> Router {
        let store = InMemoryStore::new()
            .with_word("en", "cat", vec![1.0, 0.0], Some(1000))
            .unwrap()
            .with_word("en", "dog", vec![0.9, 0.1], Some(3000))
            .unwrap()
            .with_word("en", "bird", vec![0.0, 1.0], Some(400))
            .unwrap();
        router(
            Arc::new(Pipeline::new(SimpleTokenizer::new(), store)),
            settings,
        )
    }

    async fn post(
        app: Router,
        uri: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(body.into())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_knn_graph_returns_tree() {
        let (status, json) = post(
            app(ServerSettings::default()),
            "/knn_graph?weighting=raw-count&n_neighbors=1",
            "cat cat dog dog dog bird",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let nodes = json.as_array().unwrap();
        assert_eq!(nodes.len(), 6);
        assert_eq!(
            nodes[0],
            serde_json::json!({"id": "0-0", "parentId": "1-0", "word": "dog", "weight": 3.0})
        );
        assert_eq!(nodes[5], serde_json::json!({"id": "2-0", "parentId": null}));
    }

    #[tokio::test]
    async fn test_knn_graph_error_kinds() {
        let cases = [
            ("/knn_graph?n_neighbors=1", "cat", 422, "insufficient_data"),
            ("/knn_graph?lang=la", "cat dog", 415, "unsupported_language"),
            ("/knn_graph?words=0", "cat dog", 400, "configuration"),
            ("/knn_graph?n_neighbors=abc", "cat dog", 400, "configuration"),
            ("/knn_graph?words=-1", "cat dog", 400, "configuration"),
            ("/knn_graph?metric=hamming", "cat dog", 400, "configuration"),
        ];
        for (uri, body, expected_status, expected_kind) in cases {
            let (status, json) = post(app(ServerSettings::default()), uri, body).await;
            assert_eq!(status.as_u16(), expected_status, "{uri}");
            assert_eq!(json["kind"], expected_kind, "{uri}");
            assert!(
                json["message"].as_str().is_some_and(|m| !m.is_empty()),
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_configuration() {
        let (status, json) = post(
            app(ServerSettings::default()),
            "/knn_graph",
            vec![0xff_u8, 0xfe, b'c'],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "configuration");
    }

    #[tokio::test]
    async fn test_expired_deadline_is_service_unavailable() {
        let settings = ServerSettings {
            request_timeout: Some(Duration::ZERO),
            ..ServerSettings::default()
        };
        let (status, json) =
            post(app(settings), "/knn_graph?n_neighbors=1", "cat dog").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["kind"], "cancelled");
    }

    #[tokio::test]
    async fn test_healthz() {
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();
        let response = app(ServerSettings::default())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_cancel_on_drop_trips_token() {
        let token = CancelToken::new();
        drop(CancelOnDrop(Some(token.clone())));
        assert!(token.is_cancelled());

        let token = CancelToken::new();
        CancelOnDrop(Some(token.clone())).disarm();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_statuses_are_distinct() {
        let kinds = [
            ErrorKind::Configuration,
            ErrorKind::UnsupportedLanguage,
            ErrorKind::InsufficientData,
            ErrorKind::UnknownWord,
            ErrorKind::Cancelled,
            ErrorKind::EmbeddingLookup,
            ErrorKind::DimensionMismatch,
        ];
        let statuses: std::collections::HashSet<u16> =
            kinds.iter().map(|&k| status_for(k).as_u16()).collect();
        assert_eq!(statuses.len(), kinds.len());
        assert_eq!(status_for(ErrorKind::Configuration), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorKind::InsufficientData),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_params_overlay_defaults() {
        let params = KnnGraphParams {
            words: Some(20),
            n_neighbors: Some(3),
            weighting: Some("tf".to_string()),
            ..Default::default()
        };
        let config = params.resolve(&PipelineConfig::default()).unwrap();
        assert_eq!(config.max_words, 20);
        assert_eq!(config.k, 3);
        assert_eq!(config.weighting, WeightingMode::RawCount);
        assert_eq!(config.metric, Metric::Cosine);
    }

    #[test]
    fn test_bad_metric_is_configuration() {
        let params = KnnGraphParams {
            metric: Some("hamming".to_string()),
            ..Default::default()
        };
        let err = params.resolve(&PipelineConfig::default()).unwrap_err();
        let (status, body) = api_error(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.kind, "configuration");
    }
}
