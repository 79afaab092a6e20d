//! Shared data models for the Learning-to-Content backend.
//!
//! This crate provides Serde-serializable types for:
//! - Topics and their stage status machine
//! - Runs and the inbound webhook payload
//! - Workflow handles used for status polling
//! - The fixed column layout of the persisted tables

pub mod request;
pub mod run;
pub mod sheet;
pub mod topic;
pub mod utils;
pub mod workflow;

// Re-export common types
pub use request::WebhookPayload;
pub use run::{Run, RunId};
pub use topic::{
    ImageSlot, InputMode, InvalidTransition, Topic, TopicId, TopicStatus, FAILED_PROVIDER_TAG,
    IMAGE_SLOTS,
};
pub use utils::{is_remote, safe_title, topic_folder_name, video_link_valid};
pub use workflow::{WorkflowEntry, WorkflowStatusView};
