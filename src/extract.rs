//! Code extraction from free-form model output
//!
//! Models are told to return bare code, but in practice responses arrive
//! fenced, partially fenced, or mixed with prose. Extraction is total: it
//! always returns some text, degrading to the raw response when nothing
//! code-looking is found.

use log::{info, warn};

const FENCE: &str = "```";
const LABELED_FENCE: &str = "```python";

/// Extract a runnable script body from a model response.
///
/// Preference order:
/// 1. The body of a labeled ```python fence pair.
/// 2. A line scan that toggles on bare fence markers, keeping lines that are
///    inside a fence or contain no fence marker themselves.
/// 3. The raw response unchanged.
pub fn extract_code(raw: &str) -> String {
    if let Some(body) = labeled_block(raw) {
        info!("Found code block with ```python``` markers");
        return body;
    }

    let mut code_lines: Vec<&str> = Vec::new();
    let mut in_code = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed == LABELED_FENCE || trimmed == FENCE {
            in_code = !in_code;
            continue;
        }
        if in_code || !line.contains(FENCE) {
            code_lines.push(line);
        }
    }

    if !code_lines.is_empty() {
        info!("Extracted code without clear markers");
        code_lines.join("\n")
    } else {
        warn!("No code found in model response, returning full response");
        raw.to_string()
    }
}

/// Body of the first labeled fence pair, trimmed. None when there is no
/// closing fence or the body is blank.
fn labeled_block(raw: &str) -> Option<String> {
    let start = raw.find(LABELED_FENCE)? + LABELED_FENCE.len();
    let rest = &raw[start..];
    let end = rest.find(FENCE)?;
    let body = rest[..end].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}
