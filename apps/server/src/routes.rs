//! HTTP routes

use crate::error::ApiError;
use crate::fetch::{self, resolve_video_mime};
use crate::request::UploadRequest;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use deckcast_core::{EmbedEntry, EmbedPipeline, Presentation, VideoAsset};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
const DOWNLOAD_DISPOSITION: &str = "attachment; filename=\"modified.pptx\"";

/// Shared across requests
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<EmbedPipeline>,
    client: reqwest::Client,
}

impl AppState {
    pub fn new(pipeline: EmbedPipeline, client: reqwest::Client) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            client,
        }
    }
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn upload(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    handle_upload(state, body)
        .instrument(tracing::info_span!("upload", %request_id))
        .await
}

async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))
}

async fn handle_upload(state: AppState, body: Bytes) -> Result<Response, ApiError> {
    let request = UploadRequest::parse(&body)?;
    tracing::info!(slides = request.slides.len(), "Upload received");

    let pptx = fetch::fetch(&state.client, &request.ppt)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, url = %request.ppt, "Presentation download failed");
            ApiError::PresentationDownload
        })?;

    let doc = blocking(move || Presentation::from_bytes(&pptx.bytes)).await??;
    if doc.slide_count() == 0 {
        return Err(ApiError::EmptyPresentation);
    }
    request.check_slide_numbers(doc.slide_count())?;

    let mut entries = Vec::with_capacity(request.slides.len());
    for slide in &request.slides {
        let fetched = fetch::fetch(&state.client, &slide.video_link)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, url = %slide.video_link, "Video download failed");
                ApiError::VideoDownload(slide.number)
            })?;

        let mime = resolve_video_mime(
            slide.mime_type.as_deref(),
            fetched.content_type.as_deref(),
            &slide.video_link,
        );
        tracing::debug!(slide = slide.number, %mime, bytes = fetched.bytes.len(), "Video downloaded");
        entries.push(EmbedEntry::new(slide.number, VideoAsset::new(fetched.bytes, mime)));
    }

    let pipeline = Arc::clone(&state.pipeline);
    let output = blocking(move || pipeline.run_document(doc, entries)).await??;

    Ok((
        [
            (header::CONTENT_TYPE, PPTX_MIME),
            (header::CONTENT_DISPOSITION, DOWNLOAD_DISPOSITION),
        ],
        output.document,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ServerConfig;
    use axum::http::StatusCode;
    use deckcast_core::testing::{corrupt_after, sample_pptx, video_mp4};
    use deckcast_core::EmbedConfig;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Static origin serving a two-slide deck and some videos
    async fn origin() -> SocketAddr {
        let deck = sample_pptx(2);
        let damaged = corrupt_after(&sample_pptx(1), "<p:cSld>");
        let clip = video_mp4(1280, 720);
        let portrait = video_mp4(1080, 1920);
        let app = Router::new()
            .route("/deck.pptx", get(move || std::future::ready(deck.clone())))
            .route("/clip.mp4", get(move || std::future::ready(clip.clone())))
            .route(
                "/portrait",
                get(move || {
                    std::future::ready(([(header::CONTENT_TYPE, "video/quicktime")], portrait.clone()))
                }),
            )
            .route("/broken.pptx", get(|| async { "not a zip" }))
            .route("/damaged.pptx", get(move || std::future::ready(damaged.clone())));
        serve(app).await
    }

    async fn app() -> SocketAddr {
        let pipeline = EmbedPipeline::new(&EmbedConfig::default()).unwrap();
        let client = fetch::client(&ServerConfig::default()).unwrap();
        serve(router(AppState::new(pipeline, client), 1024 * 1024)).await
    }

    async fn post_upload(app: SocketAddr, body: String) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("http://{app}/upload"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let body = reqwest::get(format!("http://{app}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_upload_embeds_videos() {
        let origin = origin().await;
        let app = app().await;
        let body = format!(
            r#"{{"ppt":"http://{origin}/deck.pptx","slides":[
                {{"number":2,"videoLink":"http://{origin}/clip.mp4"}},
                {{"number":1,"videoLink":"http://{origin}/portrait"}}
            ]}}"#
        );

        let response = post_upload(app, body).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PPTX_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            DOWNLOAD_DISPOSITION
        );

        let bytes = response.bytes().await.unwrap();
        let doc = Presentation::from_bytes(&bytes).unwrap();
        assert_eq!(doc.slide_count(), 2);
        assert!(doc.has_part("ppt/media/media1.mp4"));
        assert!(doc.has_part("ppt/media/media2.mov"));
        assert!(doc.has_part("ppt/media/image2.png"));
    }

    #[tokio::test]
    async fn test_upload_validation_messages() {
        let origin = origin().await;
        let app = app().await;

        let cases = [
            ("{}".to_string(), "Missing PPT URL or slides data"),
            (r#"{"ppt":"x","slides":[]}"#.to_string(), "Invalid slides data"),
            (
                r#"{"ppt":"x","slides":[{"videoLink":"v"}]}"#.to_string(),
                "Invalid slide info at index 0",
            ),
            (
                format!(
                    r#"{{"ppt":"http://{origin}/deck.pptx","slides":[{{"number":3,"videoLink":"http://{origin}/clip.mp4"}}]}}"#
                ),
                "Invalid slide number 3",
            ),
            (
                format!(r#"{{"ppt":"http://{origin}/missing.pptx","slides":[{{"number":1,"videoLink":"v"}}]}}"#),
                "Failed to download PPTX",
            ),
            (
                format!(r#"{{"ppt":"http://{origin}/broken.pptx","slides":[{{"number":1,"videoLink":"v"}}]}}"#),
                "Invalid PPTX file",
            ),
            (
                format!(r#"{{"ppt":"http://{origin}/damaged.pptx","slides":[{{"number":1,"videoLink":"v"}}]}}"#),
                "Invalid PPTX file",
            ),
            (
                format!(
                    r#"{{"ppt":"http://{origin}/deck.pptx","slides":[{{"number":2,"videoLink":"http://{origin}/gone.mp4"}}]}}"#
                ),
                "Failed to download video for slide 2",
            ),
        ];

        for (body, expected) in cases {
            let response = post_upload(app, body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", expected);
            assert_eq!(response.text().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_unsupported_mime_is_rejected() {
        let origin = origin().await;
        let app = app().await;
        let body = format!(
            r#"{{"ppt":"http://{origin}/deck.pptx","slides":[{{"number":1,"videoLink":"http://{origin}/clip.mp4","mimeType":"audio/mpeg"}}]}}"#
        );

        let response = post_upload(app, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.text().await.unwrap(),
            "Failed to process video for slide 1: unsupported MIME type: audio/mpeg"
        );
    }
}
