//! jsonl2csv - AI-assisted JSONL to CSV conversion service
//!
//! There is no hand-written parsing core: each request asks a model for a
//! one-off parsing script, runs it in a sandboxed child process, validates
//! the CSV it produced, and retries with error feedback until it works or
//! attempts run out.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod gcs;
pub mod id;
pub mod llm;
pub mod orchestrator;
pub mod sandbox;
pub mod server;
pub mod validate;

pub use error::{ConvertError, Result};
