use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::annotate::DocumentError;
use crate::citation::CitationError;
use crate::fetch::FetchError;
use crate::highlight::HighlightError;
use crate::pdf::LayoutError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can end a highlight request.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    CitationParse(#[from] CitationError),
    #[error("unable to fetch the PDF: {0}")]
    UpstreamFetch(#[from] FetchError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Highlight(#[from] HighlightError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("highlight task failed: {0}")]
    Task(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::CitationParse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors become plain-text bodies. Fetch failure details are logged only.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Error::CitationParse(e) => e.to_string(),
            Error::UpstreamFetch(e) => {
                tracing::error!("upstream fetch failed: {e}");
                "Unable to fetch the PDF.".to_string()
            }
            other => {
                tracing::error!("highlight failed: {other}");
                format!("An error occurred: {other}")
            }
        };
        (status, body).into_response()
    }
}
