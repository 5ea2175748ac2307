use super::*;
use crate::fakes::RecordingView;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{domain::UserId, error::ErrorKind};
use std::{collections::HashMap, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex};

const CONTENT_BASE: &str = "https://contents.test";

#[derive(Clone, Default)]
struct MockState {
    base_url: Arc<Mutex<String>>,
    fail_signed_url: Arc<Mutex<bool>>,
    reject_put: Arc<Mutex<bool>>,
    fail_submit: Arc<Mutex<bool>>,
    fail_proxy: Arc<Mutex<bool>>,
    fail_direct: Arc<Mutex<bool>>,
    processing_polls: Arc<Mutex<u32>>,
    stored: Arc<Mutex<Vec<(String, Option<String>, Vec<u8>)>>>,
    submissions: Arc<Mutex<Vec<(String, Value)>>>,
    status_paths: Arc<Mutex<Vec<(String, String)>>>,
    proxy_urls: Arc<Mutex<Vec<String>>>,
    direct_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

#[derive(Deserialize)]
struct SignedUrlQuery {
    #[serde(rename = "fileName")]
    file_name: String,
}

async fn signed_url(
    State(state): State<MockState>,
    Query(q): Query<SignedUrlQuery>,
) -> Result<String, StatusCode> {
    if *state.fail_signed_url.lock().await {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let base = state.base_url.lock().await.clone();
    Ok(format!("{base}/storage/{}\n", q.file_name))
}

async fn store_object(
    State(state): State<MockState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if *state.reject_put.lock().await {
        return StatusCode::FORBIDDEN;
    }
    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .stored
        .lock()
        .await
        .push((name, content_type, body.to_vec()));
    StatusCode::OK
}

async fn record_submission(state: &MockState, endpoint: &str, body: Value) -> Response {
    if *state.fail_submit.lock().await {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    state
        .submissions
        .lock()
        .await
        .push((endpoint.to_string(), body));
    Json(json!({ "jobId": "job-42", "status": "queued" })).into_response()
}

async fn submit_image(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    record_submission(&state, "image-gen", body).await
}

async fn submit_video(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    record_submission(&state, "video-gen", body).await
}

async fn job_status_handler(
    State(state): State<MockState>,
    Path((user_id, job_id)): Path<(String, String)>,
) -> Json<Value> {
    state.status_paths.lock().await.push((user_id, job_id));
    let mut remaining = state.processing_polls.lock().await;
    if *remaining > 0 {
        *remaining -= 1;
        return Json(json!({ "status": "processing" }));
    }
    let base = state.base_url.lock().await.clone();
    Json(json!({
        "status": "completed",
        "result": { "mediaUrl": format!("{base}/media/out.png") }
    }))
}

#[derive(Deserialize)]
struct ProxyQuery {
    url: String,
}

async fn download_proxy(State(state): State<MockState>, Query(q): Query<ProxyQuery>) -> Response {
    state.proxy_urls.lock().await.push(q.url);
    if *state.fail_proxy.lock().await {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    ([("content-type", "image/jpeg")], b"proxied-bytes".to_vec()).into_response()
}

async fn direct_media(
    State(state): State<MockState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    state.direct_queries.lock().await.push(q);
    if *state.fail_direct.lock().await {
        return StatusCode::FORBIDDEN.into_response();
    }
    ([("content-type", "image/png")], b"direct-bytes".to_vec()).into_response()
}

async fn spawn_service() -> std::io::Result<(String, MockState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let base_url = format!("http://{addr}");
    let state = MockState::default();
    *state.base_url.lock().await = base_url.clone();

    let app = Router::new()
        .route("/get-emd-upload-url", get(signed_url))
        .route("/storage/:name", put(store_object))
        .route("/image-gen", post(submit_image))
        .route("/video-gen", post(submit_video))
        .route("/image-gen/:user_id/:job_id/status", get(job_status_handler))
        .route("/video-gen/:user_id/:job_id/status", get(job_status_handler))
        .route("/download-proxy", get(download_proxy))
        .route("/media/out.png", get(direct_media))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((base_url, state))
}

fn settings_for(base_url: &str) -> Settings {
    Settings {
        api_base_url: base_url.to_string(),
        content_base_url: CONTENT_BASE.to_string(),
        user_id: UserId::from("user-7"),
        poll_interval_ms: 1,
        max_polls: 10,
        ..Settings::default()
    }
}

#[tokio::test]
async fn upload_puts_bytes_at_signed_url_and_returns_content_url() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    let client = StudioClient::new(settings_for(&base_url));

    let url = client
        .upload_file(&SourceFile::new("photo.png", b"png-bytes".to_vec()))
        .await
        .expect("upload");

    let file_name = url
        .strip_prefix(&format!("{CONTENT_BASE}/"))
        .expect("content domain prefix");
    let (stem, ext) = file_name.split_once('.').expect("extension");
    assert_eq!(stem.len(), naming::UPLOAD_ID_LEN);
    assert_eq!(ext, "png");

    let stored = state.stored.lock().await.clone();
    assert_eq!(
        stored,
        vec![(
            file_name.to_string(),
            Some("image/png".to_string()),
            b"png-bytes".to_vec()
        )]
    );
}

#[test]
fn upload_body_shares_the_source_buffer() {
    let file = SourceFile::new("photo.png", vec![7; 4096]);
    let body = file.bytes.clone();
    assert_eq!(body.as_ptr(), file.bytes.as_ptr());
    assert_eq!(body.len(), 4096);
}

#[test]
fn client_exposes_loaded_settings() {
    let client = StudioClient::new(settings_for("http://127.0.0.1:9"));
    assert_eq!(client.settings().api_base_url, "http://127.0.0.1:9");
    assert_eq!(client.settings().user_id, UserId::from("user-7"));
}

#[tokio::test]
async fn upload_without_extension_defaults_to_jpg() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    let client = StudioClient::new(settings_for(&base_url));

    let url = client
        .upload_file(&SourceFile::new("snapshot", vec![1, 2, 3]).with_content_type("image/jpeg"))
        .await
        .expect("upload");

    assert!(url.starts_with(CONTENT_BASE));
    assert!(url.ends_with(".jpg"));
    let stored = state.stored.lock().await.clone();
    assert_eq!(stored[0].1.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn upload_fails_when_signed_url_is_refused() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.fail_signed_url.lock().await = true;
    let client = StudioClient::new(settings_for(&base_url));

    let err = client
        .upload_file(&SourceFile::new("photo.png", Vec::new()))
        .await
        .expect_err("must fail");

    assert_eq!(
        err.to_string(),
        "failed to get signed URL: 500 Internal Server Error"
    );
    assert!(state.stored.lock().await.is_empty());
}

#[tokio::test]
async fn upload_fails_when_storage_rejects_bytes() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.reject_put.lock().await = true;
    let client = StudioClient::new(settings_for(&base_url));

    let err = client
        .upload_file(&SourceFile::new("photo.png", vec![9]))
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.to_string(), "failed to upload file: 403 Forbidden");
}

#[tokio::test]
async fn submit_job_posts_image_effect_body() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    let client = StudioClient::new(settings_for(&base_url));

    let submitted = client
        .submit_job("https://contents.test/src.png")
        .await
        .expect("submit");
    assert_eq!(submitted.job_id, JobId::from("job-42"));

    let submissions = state.submissions.lock().await.clone();
    assert_eq!(submissions.len(), 1);
    let (endpoint, body) = &submissions[0];
    assert_eq!(endpoint, "image-gen");
    assert_eq!(
        body,
        &json!({
            "model": "image-effects",
            "toolType": "image-effects",
            "effectId": "mugshot",
            "imageUrl": "https://contents.test/src.png",
            "userId": "user-7",
            "removeWatermark": true,
            "isPrivate": true
        })
    );
}

#[tokio::test]
async fn video_mode_uses_video_endpoint_and_list_source() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    let settings = Settings {
        mode: EffectMode::Video,
        model: "video-effects".into(),
        ..settings_for(&base_url)
    };
    let client = StudioClient::new(settings);

    client
        .submit_job("https://contents.test/src.png")
        .await
        .expect("submit");
    client
        .job_status(&JobId::from("job-42"))
        .await
        .expect("status");

    let submissions = state.submissions.lock().await.clone();
    let (endpoint, body) = &submissions[0];
    assert_eq!(endpoint, "video-gen");
    assert_eq!(body["imageUrl"], json!(["https://contents.test/src.png"]));
    assert_eq!(body["model"], "video-effects");
    assert!(body.get("toolType").is_none());
    assert_eq!(
        state.status_paths.lock().await.clone(),
        vec![("user-7".to_string(), "job-42".to_string())]
    );
}

#[tokio::test]
async fn submit_job_reports_http_status() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.fail_submit.lock().await = true;
    let client = StudioClient::new(settings_for(&base_url));

    let err = client
        .submit_job("https://contents.test/src.png")
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "failed to submit job: 503 Service Unavailable");
}

#[tokio::test]
async fn poll_job_hits_status_endpoint_until_completed() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.processing_polls.lock().await = 2;
    let client = StudioClient::new(settings_for(&base_url));

    let url = poll_job(
        &client,
        &JobId::from("job-42"),
        &tokio_util::sync::CancellationToken::new(),
        |_| {},
    )
    .await
    .expect("completed");

    assert_eq!(url, format!("{base_url}/media/out.png"));
    assert_eq!(state.status_paths.lock().await.len(), 3);
}

#[tokio::test]
async fn download_prefers_proxy() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    let client = StudioClient::new(settings_for(&base_url));
    let result_url = format!("{base_url}/media/out.png");

    let media = client.download(&result_url).await.expect("download");

    assert_eq!(media.bytes, b"proxied-bytes");
    assert_eq!(media.extension, "jpg");
    assert!(media.file_name.starts_with("result_"));
    assert_eq!(state.proxy_urls.lock().await.clone(), vec![result_url]);
    assert!(state.direct_queries.lock().await.is_empty());
}

#[tokio::test]
async fn download_falls_back_to_cache_busted_direct_fetch() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.fail_proxy.lock().await = true;
    let client = StudioClient::new(settings_for(&base_url));

    let media = client
        .download(&format!("{base_url}/media/out.png"))
        .await
        .expect("download");

    assert_eq!(media.bytes, b"direct-bytes");
    assert_eq!(media.extension, "png");
    let queries = state.direct_queries.lock().await.clone();
    assert_eq!(queries.len(), 1);
    assert!(queries[0]
        .get("t")
        .is_some_and(|stamp| stamp.parse::<i64>().is_ok()));
}

#[tokio::test]
async fn download_reports_manual_save_when_both_tiers_fail() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.fail_proxy.lock().await = true;
    *state.fail_direct.lock().await = true;
    let client = StudioClient::new(settings_for(&base_url));

    let err = client
        .download(&format!("{base_url}/media/out.png"))
        .await
        .expect_err("must fail");

    assert!(matches!(err, StudioError::DownloadUnavailable));
    assert_eq!(err.kind(), ErrorKind::Download);
    assert_eq!(state.proxy_urls.lock().await.len(), 1);
    assert_eq!(state.direct_queries.lock().await.len(), 1);
}

#[tokio::test]
async fn photo_upload_to_downloaded_result_end_to_end() {
    let (base_url, state) = spawn_service().await.expect("spawn server");
    *state.processing_polls.lock().await = 3;
    let client = StudioClient::new(settings_for(&base_url));
    let mut controller = WorkflowController::new(client, RecordingView::default());

    let source_url = controller
        .select_file(SourceFile::new("photo.png", b"subject".to_vec()))
        .await
        .expect("uploaded");
    assert!(source_url.starts_with(CONTENT_BASE) && source_url.ends_with(".png"));
    assert_eq!(
        controller.view().last().preview_url.as_deref(),
        Some(source_url.as_str())
    );

    let result_url = controller.generate().await.expect("generated");
    assert_eq!(result_url, format!("{base_url}/media/out.png"));
    assert_eq!(state.status_paths.lock().await.len(), 4);
    assert_eq!(controller.state(), &UiState::Complete);

    let frame = controller.view().last().clone();
    assert!(frame.surface.image.visible);
    assert!(frame.surface.image.src.starts_with(&result_url));
    assert_eq!(frame.download_url.as_deref(), Some(result_url.as_str()));
    assert!(frame.download_enabled);

    let submissions = state.submissions.lock().await.clone();
    assert_eq!(submissions[0].1["imageUrl"], json!(source_url));

    let dir = tempfile::tempdir().expect("tempdir");
    let saved = controller.download(dir.path()).await.expect("saved");
    assert_eq!(std::fs::read(saved).expect("read"), b"proxied-bytes");
}
