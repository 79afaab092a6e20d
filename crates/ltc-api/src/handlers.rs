//! Request handlers.

pub mod admin;
pub mod health;
pub mod webhook;
pub mod workflow;

pub use admin::*;
pub use health::*;
pub use webhook::*;
pub use workflow::*;
