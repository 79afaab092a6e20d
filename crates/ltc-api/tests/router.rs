use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ltc_api::{create_router, ApiConfig, AppState, WorkflowRegistry};
use ltc_media::{AssemblyOutput, AssemblyRequest, MediaError, MediaResult};
use ltc_pipeline::{ImageGenerator, PipelineConfig, PipelineOrchestrator, PipelineServices, RunCoordinator, VideoRenderer};
use ltc_providers::{
    LlmClient, LlmResponse, ProviderResult, ResponseFormat, SpeechPlan, SpeechSynthesizer,
};
use ltc_sheets::{InMemoryTable, TopicStore};
use ltc_storage::{AssetUploader, LocalOnlyUploader, LocalStore};

const TOPICS: &str = r#"[{"title": "Ownership", "main_points": ["Move"], "transition_note": ""}]"#;

struct TopicsLlm;

#[async_trait]
impl LlmClient for TopicsLlm {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(&self, _prompt: &str, _format: ResponseFormat) -> ProviderResult<LlmResponse> {
        Ok(LlmResponse {
            text: TOPICS.to_string(),
            total_tokens: 10,
        })
    }
}

struct SilentTts;

#[async_trait]
impl SpeechSynthesizer for SilentTts {
    fn name(&self) -> &'static str {
        "Google TTS"
    }

    async fn synthesize(&self, _plan: &SpeechPlan) -> ProviderResult<Vec<u8>> {
        let mut audio = b"ID3".to_vec();
        audio.resize(4096, 0);
        Ok(audio)
    }
}

struct NoVideo;

#[async_trait]
impl VideoRenderer for NoVideo {
    async fn render(&self, _request: &AssemblyRequest<'_>, _uploader: &dyn AssetUploader) -> MediaResult<AssemblyOutput> {
        Err(MediaError::NoImages)
    }
}

struct TestApp {
    router: Router,
    store: Arc<TopicStore>,
    workflows: Arc<WorkflowRegistry>,
    _dir: tempfile::TempDir,
}

async fn app(secret: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let root: PathBuf = dir.path().to_path_buf();

    let store = Arc::new(TopicStore::new(Arc::new(InMemoryTable::new())));
    store.ensure_schema(false).await.unwrap();
    let workflows = Arc::new(WorkflowRegistry::new(Duration::from_secs(60), 100));
    let uploader: Arc<dyn AssetUploader> = Arc::new(LocalOnlyUploader);
    let local = LocalStore::new(root.clone());

    let services = PipelineServices {
        llm: Arc::new(TopicsLlm),
        tts: Arc::new(SilentTts),
        images: Arc::new(ImageGenerator::new(
            Vec::new(),
            uploader.clone(),
            local.clone(),
            Duration::from_secs(5),
        )),
        video: Arc::new(NoVideo),
        uploader,
        local,
        store: store.clone(),
        notifier: workflows.clone(),
    };
    let pipeline_config = PipelineConfig {
        generated_content_dir: root,
        webhook_secret: secret.map(str::to_string),
        ..PipelineConfig::default()
    };
    let coordinator = Arc::new(RunCoordinator::new(Arc::new(PipelineOrchestrator::new(
        services,
        pipeline_config,
    ))));

    let config = ApiConfig {
        webhook_secret: secret.map(str::to_string),
        ..ApiConfig::default()
    };
    let state = AppState::from_parts(config, coordinator, store.clone(), workflows.clone());

    TestApp {
        router: create_router(state, None),
        store,
        workflows,
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn wait_until_finished(workflows: &WorkflowRegistry, id: &str) {
    for _ in 0..200 {
        if workflows.get(id).await.map(|e| e.is_finished()).unwrap_or(false) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workflow {} did not finish", id);
}

#[tokio::test]
async fn test_health() {
    let app = app(None).await;
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_webhook_accepts_and_status_reports_completion() {
    let app = app(None).await;
    let (status, body) = send(
        &app.router,
        post_json(
            "/webhook/learning-to-content",
            json!({"raw_notes": "Rust ownership rules", "full_pipeline": false}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    assert_eq!(body["input_preview"], "Rust ownership rules");
    assert_eq!(body["language"], "English");
    let workflow_id = body["workflow_id"].as_str().unwrap().to_string();
    assert_eq!(body["status_url"], format!("/api/workflow/status/{}", workflow_id));

    wait_until_finished(&app.workflows, &workflow_id).await;

    let (status, body) = send(&app.router, get(&format!("/api/workflow/status/{}", workflow_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflow_id"], workflow_id);
    assert_eq!(body["status"], "Completed");
    assert_eq!(body["response"]["topicsCount"], 1);
    assert_eq!(body["response"]["topics"][0]["Title"], "Ownership");
    assert_eq!(app.store.topic_rows().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_webhook_validation_errors() {
    let app = app(None).await;

    let (status, body) = send(
        &app.router,
        post_json("/webhook/learning-to-content", json!({"input_type": "notes", "raw_notes": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "raw_notes field cannot be empty for input_type=notes");

    let (status, body) = send(
        &app.router,
        post_json("/webhook/learning-to-content", json!({"input_type": "script"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Missing required field: script_text for input_type=script");

    let (status, body) = send(
        &app.router,
        post_json("/webhook/learning-to-content", json!({"input_type": "prompt", "context_notes": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Provide custom_prompt (preferred) or raw_notes for input_type=prompt"
    );

    let (status, _) = send(
        &app.router,
        Request::builder()
            .method("POST")
            .uri("/webhook/learning-to-content")
            .body(Body::from("not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.workflows.is_empty().await);
}

#[tokio::test]
async fn test_wrong_secret_fails_workflow() {
    let app = app(Some("s3cret")).await;
    let (status, body) = send(
        &app.router,
        post_json(
            "/webhook/learning-to-content?webhook_secret=nope",
            json!({"raw_notes": "notes", "full_pipeline": false}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let workflow_id = body["workflow_id"].as_str().unwrap().to_string();

    wait_until_finished(&app.workflows, &workflow_id).await;
    let entry = app.workflows.get(&workflow_id).await.unwrap();
    assert_eq!(entry.status, "Failed");
    assert_eq!(entry.status_code, Some(401));
    assert_eq!(entry.error.as_deref(), Some("Unauthorized - Invalid webhook secret"));
    assert!(app.store.topic_rows().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_secret_from_query_param() {
    let app = app(Some("s3cret")).await;
    let (_, body) = send(
        &app.router,
        post_json(
            "/webhook/learning-to-content?webhook_secret=s3cret",
            json!({"raw_notes": "notes", "full_pipeline": false}),
        ),
    )
    .await;
    let workflow_id = body["workflow_id"].as_str().unwrap().to_string();

    wait_until_finished(&app.workflows, &workflow_id).await;
    assert_eq!(app.workflows.get(&workflow_id).await.unwrap().status, "Completed");
}

#[tokio::test]
async fn test_unknown_workflow_is_404() {
    let app = app(None).await;
    let (status, body) = send(&app.router, get("/api/workflow/status/workflow_0_missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Workflow not found");
}

#[tokio::test]
async fn test_admin_db_endpoints() {
    let app = app(None).await;
    tokio_test::assert_ok!(app.store.log_error("run_1", "topic_1_1", "boom").await);

    let (status, body) = send(&app.router, get("/admin/db-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"]["ErrorLog"], 1);
    assert_eq!(body["tables"]["EssentialContent"], 0);
    assert_eq!(body["total_records"], 1);

    let (status, body) = send(
        &app.router,
        Request::builder()
            .method("POST")
            .uri("/admin/ensure-db?reset=true")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["reset"], true);

    let (_, body) = send(&app.router, get("/admin/db-status")).await;
    assert_eq!(body["total_records"], 0);
}
