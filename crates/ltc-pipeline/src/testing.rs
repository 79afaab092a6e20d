//! Scripted collaborators shared by the pipeline tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ltc_media::{AssemblyOutput, AssemblyRequest, MediaError, MediaResult};
use ltc_providers::{
    GeneratedImage, ImageProvider, LlmClient, LlmResponse, ProviderError, ProviderFailure, ProviderResult,
    ResponseFormat, SpeechPlan, SpeechSynthesizer,
};
use ltc_sheets::{InMemoryTable, TopicStore};
use ltc_storage::{AssetUploader, LocalOnlyUploader, LocalStore};

use crate::config::PipelineConfig;
use crate::images::ImageGenerator;
use crate::notifier::StatusNotifier;
use crate::orchestrator::{PipelineOrchestrator, PipelineServices};
use crate::video::VideoRenderer;

/// LLM answering JSON-mode calls from a queue; an empty queue fails.
#[derive(Default)]
pub struct ScriptedLlm {
    json_replies: Mutex<VecDeque<String>>,
    text_reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn with_json(replies: &[&str]) -> Self {
        Self {
            json_replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, reply: &str) -> Self {
        self.text_reply = Some(reply.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str, format: ResponseFormat) -> ProviderResult<LlmResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = match format {
            ResponseFormat::Json => self.json_replies.lock().unwrap().pop_front(),
            ResponseFormat::Text => self.text_reply.clone(),
        };
        reply
            .map(|text| LlmResponse { text, total_tokens: 42 })
            .ok_or_else(|| ProviderFailure::Retryable(ProviderError::status(503, "overloaded")))
    }
}

pub struct FakeTts {
    pub calls: AtomicUsize,
    fail: bool,
}

impl FakeTts {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    fn name(&self) -> &'static str {
        "Google TTS"
    }

    async fn synthesize(&self, _plan: &SpeechPlan) -> ProviderResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderFailure::Fatal(ProviderError::status(400, "bad voice")));
        }
        let mut audio = b"ID3".to_vec();
        audio.resize(4096, 0);
        Ok(audio)
    }
}

pub struct FakeImageProvider {
    name: &'static str,
    result: Option<GeneratedImage>,
    pub calls: AtomicUsize,
}

impl FakeImageProvider {
    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            result: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn returning(name: &'static str, image: GeneratedImage) -> Arc<Self> {
        Arc::new(Self {
            name,
            result: Some(image),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn png(name: &'static str) -> Arc<Self> {
        Self::returning(name, GeneratedImage::Bytes(fake_png(2048)))
    }
}

#[async_trait]
impl ImageProvider for FakeImageProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, _prompt: &str, _width: u32, _height: u32) -> ProviderResult<GeneratedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .ok_or_else(|| ProviderFailure::Retryable(ProviderError::status(503, "busy")))
    }
}

pub fn fake_png(len: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(len, 0);
    bytes
}

/// Renderer returning a fixed remote link, or failing.
pub struct FakeVideo {
    link: Option<String>,
    pub images_seen: Mutex<Vec<usize>>,
}

impl FakeVideo {
    pub fn uploaded(link: &str) -> Self {
        Self {
            link: Some(link.to_string()),
            images_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            link: None,
            images_seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VideoRenderer for FakeVideo {
    async fn render(&self, request: &AssemblyRequest<'_>, _uploader: &dyn AssetUploader) -> MediaResult<AssemblyOutput> {
        self.images_seen.lock().unwrap().push(request.images.len());
        if request.images.is_empty() {
            return Err(MediaError::NoImages);
        }
        match &self.link {
            Some(link) => Ok(AssemblyOutput::Video {
                link: link.clone(),
                local_path: PathBuf::from("video.mp4"),
            }),
            None => Err(MediaError::Timeout(300)),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn statuses(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }
}

#[async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn notify(&self, workflow_id: &str, status: &str) {
        self.events
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), status.to_string()));
    }
}

/// Orchestrator over in-memory tables rooted at `root`.
pub struct Harness {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub store: Arc<TopicStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn harness(
    root: &Path,
    llm: Arc<dyn LlmClient>,
    tts: Arc<dyn SpeechSynthesizer>,
    providers: Vec<Arc<dyn ImageProvider>>,
    video: Arc<dyn VideoRenderer>,
) -> Harness {
    let store = Arc::new(TopicStore::new(Arc::new(InMemoryTable::new())));
    store.ensure_schema(false).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let uploader: Arc<dyn AssetUploader> = Arc::new(LocalOnlyUploader);
    let local = LocalStore::new(root);

    let services = PipelineServices {
        llm,
        tts,
        images: Arc::new(ImageGenerator::new(
            providers,
            uploader.clone(),
            local.clone(),
            Duration::from_secs(5),
        )),
        video,
        uploader,
        local,
        store: store.clone(),
        notifier: notifier.clone(),
    };
    let config = PipelineConfig {
        generated_content_dir: root.to_path_buf(),
        ..PipelineConfig::default()
    };

    Harness {
        orchestrator: Arc::new(PipelineOrchestrator::new(services, config)),
        store,
        notifier,
    }
}
