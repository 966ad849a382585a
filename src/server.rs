//! HTTP surface: highlight a cited PDF, or list the lines a response cites.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::citation;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::BlobStore;
use crate::pdf::PdfiumLayouts;
use crate::pipeline::Pipeline;
use crate::types::LineRef;

#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn from_config(config: &Config) -> Self {
        let fetcher = BlobStore::new(&config.blob_url, config.fetch_timeout, config.max_pdf_bytes);
        let layouts = PdfiumLayouts::new(config.pdfium_path.clone());
        Self::new(Pipeline::new(Arc::new(fetcher), Arc::new(layouts), config.color))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/view-pdf", get(view_pdf))
        .route("/process-response", post(process_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let app = router(AppState::from_config(&config));
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("citemark listening on {}", config.bind);
    tracing::info!("fetching documents from {}", config.blob_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct ViewPdfQuery {
    #[serde(default)]
    response: String,
}

async fn view_pdf(
    State(state): State<AppState>,
    Query(query): Query<ViewPdfQuery>,
) -> Result<Response> {
    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.highlight(&query.response))
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"highlighted_pdf.pdf\""),
        ],
        outcome.pdf,
    )
        .into_response())
}

#[derive(Deserialize)]
struct ProcessRequest {
    response: Option<String>,
}

async fn process_response(Json(request): Json<ProcessRequest>) -> (StatusCode, Json<Vec<LineRef>>) {
    match request.response.filter(|text| !text.is_empty()) {
        Some(text) => (StatusCode::OK, Json(citation::parse_references(&text))),
        None => (StatusCode::BAD_REQUEST, Json(Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::annotate::AnnotatedDocument;
    use crate::annotate::tests::blank_pdf;
    use crate::pipeline::tests::{FixedFetcher, UniformLayouts};
    use crate::types::Rgb;

    fn app(fetcher: FixedFetcher, lines: usize) -> Router {
        let pipeline = Pipeline::new(Arc::new(fetcher), Arc::new(UniformLayouts { lines }), Rgb::YELLOW);
        router(AppState::new(pipeline))
    }

    async fn view(app: Router, response: &str) -> (StatusCode, Vec<u8>, Option<String>) {
        let uri = format!("/view-pdf?response={}", urlencoding::encode(response));
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, body, content_type)
    }

    async fn post_json(app: Router, json: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/process-response")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn view_pdf_returns_highlighted_document() {
        let app = app(FixedFetcher::serving(blank_pdf(1)), 10);
        let (status, body, content_type) = view(app, "Answer (doc.pdf, Lines 5-7)").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/pdf"));
        let doc = AnnotatedDocument::load(&body).unwrap();
        assert_eq!(doc.annotation_count(1).unwrap(), 3);
    }

    #[tokio::test]
    async fn view_pdf_without_lines_is_bad_request() {
        let app = app(FixedFetcher::serving(blank_pdf(1)), 10);
        let (status, body, _) = view(app, "no citation here").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(String::from_utf8(body).unwrap(), "No document name found in the response.");
    }

    #[tokio::test]
    async fn view_pdf_with_reversed_range_is_bad_request() {
        let app = app(FixedFetcher::serving(blank_pdf(1)), 10);
        let (status, body, _) = view(app, "(doc.pdf, Lines 9-2)").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(String::from_utf8(body).unwrap(), "No lines to highlight.");
    }

    #[tokio::test]
    async fn view_pdf_fetch_failure_is_server_error() {
        let app = app(FixedFetcher::failing(), 10);
        let (status, body, _) = view(app, "(doc.pdf, Lines 1-2)").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(String::from_utf8(body).unwrap(), "Unable to fetch the PDF.");
    }

    #[tokio::test]
    async fn view_pdf_beyond_last_line_returns_unmodified_page() {
        let app = app(FixedFetcher::serving(blank_pdf(1)), 4);
        let (status, body, _) = view(app, "(doc.pdf, Lines 12-13)").await;
        assert_eq!(status, StatusCode::OK);
        let doc = AnnotatedDocument::load(&body).unwrap();
        assert_eq!(doc.annotation_count(1).unwrap(), 0);
    }

    #[tokio::test]
    async fn oversized_range_is_rejected_on_both_endpoints() {
        let citation = "(doc.pdf, Lines 1-4000000000)";
        let (status, body, _) = view(app(FixedFetcher::serving(blank_pdf(1)), 3), citation).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(String::from_utf8(body).unwrap(), "No lines to highlight.");

        let json = serde_json::json!({ "response": citation }).to_string();
        let (status, body) = post_json(app(FixedFetcher::failing(), 0), &json).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn process_response_lists_page_line_pairs() {
        let app = app(FixedFetcher::failing(), 0);
        let (status, body) = post_json(app, r#"{"response": "(doc.pdf, Lines 3-4)"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[[1,3],[1,4]]");
    }

    #[tokio::test]
    async fn process_response_without_lines_is_empty() {
        let app = app(FixedFetcher::failing(), 0);
        let (status, body) = post_json(app, r#"{"response": "nothing cited"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn process_response_missing_field_is_bad_request() {
        for json in [r#"{}"#, r#"{"response": null}"#, r#"{"response": ""}"#] {
            let app = app(FixedFetcher::failing(), 0);
            let (status, body) = post_json(app, json).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
            assert_eq!(body, "[]");
        }
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = app(FixedFetcher::failing(), 0);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
