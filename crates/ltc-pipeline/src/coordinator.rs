//! Request entry point: authorise, build the run's topics, insert them and
//! optionally drive each one through the orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use ltc_models::workflow::{STATUS_EXTRACTING_TOPICS, STATUS_TOPICS_EXTRACTED};
use ltc_models::{InputMode, Run, Topic, TopicId, WebhookPayload};
use ltc_providers::ResponseFormat;

use crate::error::{PipelineError, PipelineResult};
use crate::metrics::record_run;
use crate::orchestrator::{PipelineOrchestrator, TopicOutcome};
use crate::prompts::topic_extraction_prompt;
use crate::topics::{parse_topics, TopicDraft};

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Title of the single topic of a script-mode run without a title.
pub const SCRIPT_MODE_TITLE: &str = "User Provided Script";
/// Title of the single topic of a prompt-mode run without a title.
pub const PROMPT_MODE_TITLE: &str = "Custom Prompt Script";

pub struct RunCoordinator {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl RunCoordinator {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handle one webhook call. Returns the response body and HTTP status.
    ///
    /// `headers` keys are matched case-insensitively.
    pub async fn process_request(
        &self,
        headers: &HashMap<String, String>,
        payload: &Value,
        workflow_id: Option<&str>,
    ) -> (Value, u16) {
        let mode = payload
            .get("input_type")
            .and_then(Value::as_str)
            .map(InputMode::parse)
            .unwrap_or_default();

        let (body, status) = match self.handle(headers, payload, workflow_id).await {
            Ok(body) => (body, 200),
            Err(PipelineError::Unauthorized) => {
                warn!("Rejected webhook call with invalid secret");
                (
                    json!({"ok": false, "error": PipelineError::Unauthorized.to_string()}),
                    401,
                )
            }
            Err(e) => {
                let status = e.status_code();
                if status >= 500 {
                    warn!(workflow_id = ?workflow_id, "Run failed: {}", e);
                }
                (
                    json!({
                        "ok": false,
                        "error": e.to_string(),
                        "timestamp": Utc::now().to_rfc3339(),
                    }),
                    status,
                )
            }
        };
        record_run(mode.as_str(), status);
        (body, status)
    }

    async fn handle(
        &self,
        headers: &HashMap<String, String>,
        raw: &Value,
        workflow_id: Option<&str>,
    ) -> PipelineResult<Value> {
        self.authorize(headers, raw)?;

        let payload = WebhookPayload::from_value(raw).map_err(PipelineError::validation)?;
        payload.validate().map_err(PipelineError::validation)?;

        let run = Run::start(payload, workflow_id);
        info!(
            run_id = %run.run_id,
            mode = run.payload.input_mode().as_str(),
            full_pipeline = run.payload.full_pipeline,
            "Run started"
        );

        let mut topics = self.build_topics(&run).await?;
        self.notify(workflow_id, STATUS_TOPICS_EXTRACTED).await;

        self.orchestrator
            .services()
            .store
            .insert_topics(&topics)
            .await?;

        let full_pipeline = run.payload.full_pipeline;
        let mut processed: Vec<TopicOutcome> = Vec::new();
        if full_pipeline {
            for topic in topics.iter_mut() {
                processed.push(self.orchestrator.process_topic(topic, workflow_id).await);
            }
        }

        let summaries: Vec<Value> = topics
            .iter()
            .map(|t| json!({"TopicID": t.topic_id, "Title": t.title, "Status": t.status.as_str()}))
            .collect();

        let mut body = json!({
            "ok": true,
            "runId": run.run_id,
            "topicRunId": run.topic_run_id,
            "topicsCount": topics.len(),
            "topics": summaries,
            "timestamp": Utc::now().to_rfc3339(),
            "full_pipeline": full_pipeline,
        });
        if full_pipeline {
            body["message"] = json!(format!(
                "Successfully processed {} topics through full pipeline",
                topics.len()
            ));
            body["processed_results"] = serde_json::to_value(&processed).unwrap_or(Value::Null);
        } else {
            body["message"] = json!(format!(
                "Successfully extracted {} topics and added to backlog",
                topics.len()
            ));
        }
        Ok(body)
    }

    /// Accept the `X-Webhook-Secret` header or a `webhook_secret` field.
    fn authorize(&self, headers: &HashMap<String, String>, raw: &Value) -> PipelineResult<()> {
        let Some(expected) = self.orchestrator.config().webhook_secret.as_deref() else {
            return Ok(());
        };
        let from_header = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(WEBHOOK_SECRET_HEADER))
            .map(|(_, value)| value.as_str());
        let from_body = raw.get("webhook_secret").and_then(Value::as_str);

        if [from_header, from_body].into_iter().flatten().any(|s| s == expected) {
            Ok(())
        } else {
            Err(PipelineError::Unauthorized)
        }
    }

    async fn build_topics(&self, run: &Run) -> PipelineResult<Vec<Topic>> {
        let payload = &run.payload;
        let topics = match payload.input_mode() {
            InputMode::Notes => {
                self.notify(run.workflow_id.as_deref(), STATUS_EXTRACTING_TOPICS).await;
                self.extract_topics(run)
                    .await?
                    .into_iter()
                    .enumerate()
                    .map(|(i, draft)| {
                        let mut topic = self.topic_for(run, i as u32 + 1, draft.order, &draft.title);
                        topic.main_points = draft.main_points;
                        topic.transition_note = draft.transition_note;
                        topic.context_notes = payload.raw_notes.trim().to_string();
                        topic
                    })
                    .collect()
            }
            InputMode::Script => {
                let title = payload_title(payload).unwrap_or(SCRIPT_MODE_TITLE);
                let mut topic = self.topic_for(run, 1, 1, title);
                topic.script = payload.direct_script().unwrap_or_default();
                topic.context_notes = payload.context_text();
                vec![topic]
            }
            InputMode::Prompt => {
                let title = payload_title(payload).unwrap_or(PROMPT_MODE_TITLE);
                let mut topic = self.topic_for(run, 1, 1, title);
                topic.context_notes = payload.context_text();
                vec![topic]
            }
        };
        Ok(topics)
    }

    /// Ask the LLM for topics; unusable output gives the placeholder topic.
    async fn extract_topics(&self, run: &Run) -> PipelineResult<Vec<TopicDraft>> {
        let payload = &run.payload;
        let count = payload.topic_count();
        let prompt = topic_extraction_prompt(&payload.raw_notes, count, payload.language(), payload.tone());

        let services = self.orchestrator.services();
        let llm = &services.llm;
        let response = match llm.generate(&prompt, ResponseFormat::Json).await {
            Ok(response) => response,
            Err(failure) => {
                let status = failure.error().status_code();
                if let Err(e) = services
                    .store
                    .log_api_usage(run.run_id.as_str(), "", llm.name(), status, 0)
                    .await
                {
                    warn!("Failed to log API usage: {}", e);
                }
                return Err(failure.into());
            }
        };
        if let Err(e) = services
            .store
            .log_api_usage(run.run_id.as_str(), "", llm.name(), 200, response.total_tokens)
            .await
        {
            warn!("Failed to log API usage: {}", e);
        }

        match parse_topics(&response.text, count as usize) {
            Ok(drafts) => {
                info!(run_id = %run.run_id, topics = drafts.len(), "Topics extracted");
                Ok(drafts)
            }
            Err(e) => {
                warn!(run_id = %run.run_id, "Unusable topic response, using placeholder topic: {}", e);
                Ok(vec![TopicDraft::fallback()])
            }
        }
    }

    /// Pending topic carrying every request-level setting.
    fn topic_for(&self, run: &Run, position: u32, order: u32, title: &str) -> Topic {
        let payload = &run.payload;
        let config = self.orchestrator.config();
        let mut topic = Topic::new(
            TopicId::for_batch(run.unix_start(), &run.run_id, position),
            run.run_id.clone(),
            order,
            title,
        );
        topic.language = payload.language().to_string();
        topic.tone = payload.tone().to_string();
        topic.voice_gender = payload.voice_gender().to_string();
        topic.platforms = payload.platforms_or_default();
        topic.input_mode = payload.input_mode();
        topic.custom_prompt = Some(payload.custom_prompt.trim().to_string()).filter(|s| !s.is_empty());
        topic.target_duration_seconds = payload.target_duration_seconds.filter(|secs| *secs > 0);
        topic.audio_speaking_rate = payload.speaking_rate_override();
        topic.image_width = payload.image_width.filter(|w| *w > 0).unwrap_or(config.image_width);
        topic.image_height = payload.image_height.filter(|h| *h > 0).unwrap_or(config.image_height);
        topic.image_prompts = payload
            .image_prompts
            .iter()
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        topic
    }

    async fn notify(&self, workflow_id: Option<&str>, status: &str) {
        if let Some(workflow_id) = workflow_id {
            self.orchestrator
                .services()
                .notifier
                .notify(workflow_id, status)
                .await;
        }
    }
}

fn payload_title(payload: &WebhookPayload) -> Option<&str> {
    payload.title.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, FakeImageProvider, FakeTts, FakeVideo, Harness, ScriptedLlm};
    use ltc_providers::ImageProvider;
    use std::path::Path;

    const TOPICS_REPLY: &str = r#"[
        {"title": "Ownership", "main_points": ["Move", "Drop"], "transition_note": "Next"},
        {"title": "Borrowing", "main_points": ["&T"], "transition_note": ""}
    ]"#;
    const SCRIPT_REPLY: &str = r#"{"script": "Borrowing lets you use a value without owning it.", "image_prompts": ["a", "b", "c", "d"]}"#;
    const DRIVE_LINK: &str = "https://drive.google.com/file/d/xyz/view";

    async fn setup(root: &Path, llm: ScriptedLlm) -> (RunCoordinator, Harness) {
        let providers: Vec<Arc<dyn ImageProvider>> = vec![FakeImageProvider::png("Cloudflare")];
        let h = harness(
            root,
            Arc::new(llm),
            Arc::new(FakeTts::ok()),
            providers,
            Arc::new(FakeVideo::uploaded(DRIVE_LINK)),
        )
        .await;
        (RunCoordinator::new(h.orchestrator.clone()), h)
    }

    fn no_headers() -> HashMap<String, String> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_notes_without_pipeline_inserts_pending_topics() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, h) = setup(dir.path(), ScriptedLlm::with_json(&[TOPICS_REPLY])).await;
        let payload = json!({
            "input_type": "notes",
            "raw_notes": "Rust ownership and borrowing",
            "posts_per_day": "2",
            "full_pipeline": false
        });

        let (body, status) = coordinator.process_request(&no_headers(), &payload, Some("wf_1")).await;

        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        assert_eq!(body["topicsCount"], 2);
        assert_eq!(body["full_pipeline"], false);
        assert_eq!(body["message"], "Successfully extracted 2 topics and added to backlog");
        assert!(body.get("processed_results").is_none());
        assert_eq!(body["topics"][1]["Title"], "Borrowing");
        assert_eq!(body["topics"][0]["Status"], "Pending");

        let rows = h.store.topic_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["StatusProgress"], "Topics Created");
        assert_eq!(rows[0]["FinalStatus"], "Pending");
        assert!(rows[0]["Script"].is_empty());
        assert_eq!(h.notifier.statuses(), vec!["Extracting Topics", "Topics Extracted"]);
    }

    #[tokio::test]
    async fn test_notes_full_pipeline_processes_each_topic() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::with_json(&[TOPICS_REPLY, SCRIPT_REPLY, SCRIPT_REPLY]);
        let (coordinator, h) = setup(dir.path(), llm).await;
        let payload = json!({"raw_notes": "Rust", "posts_per_day": 2});

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;

        assert_eq!(status, 200);
        assert_eq!(body["message"], "Successfully processed 2 topics through full pipeline");
        let results = body["processed_results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["status"], "Completed");
        assert_eq!(body["topics"][1]["Status"], "Completed");

        let rows = h.store.topic_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row["FinalStatus"] == "Completed"));
    }

    #[tokio::test]
    async fn test_malformed_topics_fall_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _h) = setup(dir.path(), ScriptedLlm::with_json(&["I cannot help with that"])).await;
        let payload = json!({"raw_notes": "notes", "full_pipeline": "false"});

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;

        assert_eq!(status, 200);
        assert_eq!(body["topicsCount"], 1);
        assert_eq!(body["topics"][0]["Title"], "Educational content from notes");
    }

    #[tokio::test]
    async fn test_error_object_from_model_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::with_json(&[r#"{"message": "quota exceeded"}"#]);
        let (coordinator, h) = setup(dir.path(), llm).await;
        let payload = json!({"raw_notes": "notes", "full_pipeline": false});

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;

        assert_eq!(status, 200);
        assert_eq!(body["topicsCount"], 1);
        assert_eq!(body["topics"][0]["Title"], "Educational content from notes");
        assert_eq!(h.store.topic_rows().await.unwrap()[0]["Title"], "Educational content from notes");
    }

    #[tokio::test]
    async fn test_empty_notes_rejected_before_insert() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::with_json(&[TOPICS_REPLY]);
        let (coordinator, h) = setup(dir.path(), llm).await;
        let payload = json!({"input_type": "notes", "raw_notes": "   "});

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;

        assert_eq!(status, 400);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "raw_notes field cannot be empty for input_type=notes");
        assert!(h.store.topic_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_script_mode_skips_llm() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, h) = setup(dir.path(), ScriptedLlm::default()).await;
        let payload = json!({
            "input_type": "script",
            "script_text": "Hook: a sunrise\nImage 1: a road\nEvery journey starts with one step.",
            "language": "Hindi",
            "voice_gender": "Male",
            "image_width": "720"
        });

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;

        assert_eq!(status, 200);
        assert_eq!(body["topics"][0]["Title"], SCRIPT_MODE_TITLE);
        assert_eq!(body["processed_results"][0]["status"], "Completed");
        let rows = h.store.topic_rows().await.unwrap();
        assert_eq!(rows[0]["Script"], "Every journey starts with one step.");
        assert_eq!(rows[0]["Language"], "Hindi");
        assert_eq!(rows[0]["Gender"], "Male");
    }

    #[tokio::test]
    async fn test_prompt_mode_passes_instruction_through() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedLlm::with_json(&[SCRIPT_REPLY]));
        let providers: Vec<Arc<dyn ImageProvider>> = vec![FakeImageProvider::png("Cloudflare")];
        let h = harness(
            dir.path(),
            llm.clone(),
            Arc::new(FakeTts::ok()),
            providers,
            Arc::new(FakeVideo::uploaded(DRIVE_LINK)),
        )
        .await;
        let coordinator = RunCoordinator::new(h.orchestrator.clone());
        let payload = json!({
            "input_type": "prompt",
            "custom_prompt": "Write a limerick about lifetimes",
            "context_notes": "Keep it kind",
            "title": "Lifetimes"
        });

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;

        assert_eq!(status, 200);
        assert_eq!(body["topics"][0]["Title"], "Lifetimes");
        let prompts = llm.prompts.lock().unwrap().clone();
        assert_eq!(prompts[0], "Write a limerick about lifetimes\n\nKeep it kind");
    }

    #[tokio::test]
    async fn test_secret_checked_from_header_or_body() {
        let dir = tempfile::tempdir().unwrap();
        let llm = ScriptedLlm::with_json(&[TOPICS_REPLY, TOPICS_REPLY]);
        let providers: Vec<Arc<dyn ImageProvider>> = vec![FakeImageProvider::png("Cloudflare")];
        let h = harness(
            dir.path(),
            Arc::new(llm),
            Arc::new(FakeTts::ok()),
            providers,
            Arc::new(FakeVideo::uploaded(DRIVE_LINK)),
        )
        .await;
        let services = h.orchestrator.services().clone();
        let config = crate::config::PipelineConfig {
            webhook_secret: Some("s3cret".into()),
            ..h.orchestrator.config().clone()
        };
        let coordinator = RunCoordinator::new(Arc::new(PipelineOrchestrator::new(services, config)));
        let payload = json!({"raw_notes": "notes", "full_pipeline": false});

        let (body, status) = coordinator.process_request(&no_headers(), &payload, None).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], "Unauthorized - Invalid webhook secret");
        assert!(h.store.topic_rows().await.unwrap().is_empty());

        let headers = HashMap::from([("X-Webhook-Secret".to_string(), "s3cret".to_string())]);
        let (_, status) = coordinator.process_request(&headers, &payload, None).await;
        assert_eq!(status, 200);

        let payload = json!({"raw_notes": "notes", "full_pipeline": false, "webhook_secret": "s3cret"});
        let (_, status) = coordinator.process_request(&no_headers(), &payload, None).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_llm_outage_during_extraction_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, h) = setup(dir.path(), ScriptedLlm::default()).await;
        let payload = json!({"raw_notes": "notes"});

        let (body, status) = coordinator.process_request(&no_headers(), &payload, Some("wf")).await;

        assert_eq!(status, 500);
        assert_eq!(body["ok"], false);
        assert!(body["timestamp"].is_string());
        assert!(h.store.topic_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_back_to_back_runs_keep_their_own_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, h) = setup(dir.path(), ScriptedLlm::with_json(&[SCRIPT_REPLY])).await;
        let first = json!({
            "input_type": "script",
            "title": "A",
            "script_text": "Alpha narration text.",
            "full_pipeline": false
        });
        let second = json!({
            "input_type": "prompt",
            "title": "B",
            "custom_prompt": "Explain borrowing"
        });

        let (a, status_a) = coordinator.process_request(&no_headers(), &first, None).await;
        let (b, status_b) = coordinator.process_request(&no_headers(), &second, None).await;

        assert_eq!(status_a, 200);
        assert_eq!(status_b, 200);
        assert_ne!(a["topics"][0]["TopicID"], b["topics"][0]["TopicID"]);

        let rows = h.store.topic_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["TopicID"], a["topics"][0]["TopicID"].as_str().unwrap());
        assert_eq!(rows[0]["RunID"], a["runId"].as_str().unwrap());
        assert_eq!(rows[0]["Title"], "A");
        assert_eq!(rows[0]["FinalStatus"], "Pending");
        assert!(rows[0]["Script"].is_empty());

        assert_eq!(rows[1]["TopicID"], b["topics"][0]["TopicID"].as_str().unwrap());
        assert_eq!(rows[1]["RunID"], b["runId"].as_str().unwrap());
        assert_eq!(rows[1]["Title"], "B");
        assert_eq!(rows[1]["FinalStatus"], "Completed");
        assert_eq!(rows[1]["Script"], "Borrowing lets you use a value without owning it.");
    }
}
