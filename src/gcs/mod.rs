//! Google Cloud Storage boundary: upload, V4 signed URLs

pub mod sign;
pub mod storage;

pub use storage::{GcsStore, MockObjectStore, ObjectStore};
