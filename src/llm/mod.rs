//! Model client: trait, prompt construction, and the Vertex AI implementation

pub mod client;
pub mod prompt;
pub mod vertex;

pub use client::{MockModelClient, ModelClient};
pub use prompt::{DEFAULT_PROMPT, build_full_prompt, with_additional_instruction};
pub use vertex::{VertexClient, extract_generation_text};
