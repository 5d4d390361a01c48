use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use deckcast_core::{DeckError, EmbedError};
use thiserror::Error;

/// Request failures, rendered as plain-text responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing PPT URL or slides data")]
    MissingFields,

    #[error("Invalid slides data")]
    InvalidSlides,

    #[error("Invalid slide info at index {0}")]
    InvalidSlideInfo(usize),

    #[error("Invalid slide number {0}")]
    InvalidSlideNumber(String),

    #[error("Failed to download PPTX")]
    PresentationDownload,

    #[error("Invalid PPTX file")]
    InvalidPresentation,

    #[error("Presentation has no slides")]
    EmptyPresentation,

    #[error("Failed to download video for slide {0}")]
    VideoDownload(usize),

    #[error("Failed to process video for slide {slide}: {reason}")]
    Processing { slide: usize, reason: String },

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<DeckError> for ApiError {
    fn from(err: DeckError) -> Self {
        match err {
            DeckError::EmptyPresentation => ApiError::EmptyPresentation,
            DeckError::InvalidSlideIndex { slide_index, .. } => {
                ApiError::InvalidSlideNumber(slide_index.to_string())
            }
            DeckError::Archive(_) | DeckError::MalformedDocument(_) => ApiError::InvalidPresentation,
            DeckError::Embed {
                slide_index,
                source: EmbedError::MalformedDocument(_),
            } => ApiError::Processing {
                slide: slide_index,
                reason: "slide is malformed".to_string(),
            },
            DeckError::Embed {
                slide_index,
                source,
            } => ApiError::Processing {
                slide: slide_index,
                reason: source.to_string(),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => tracing::error!(%detail, "Request failed"),
            other => tracing::warn!(%status, "{}", other),
        }
        (status, self.to_string()).into_response()
    }
}
