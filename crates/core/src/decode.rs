use serde::de::DeserializeOwned;
use thiserror::Error;

/// Decode failure at the untrusted-text boundary. Malformed JSON after
/// fence-stripping is a validation problem, never silently defaulted.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("model response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Strip one leading/trailing Markdown code fence, if present. Models often
/// wrap the requested JSON in ```json fences despite instructions.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json", "JSON", ...) on the opening fence line.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };

    body.strip_suffix("```").map(str::trim).unwrap_or(body.trim())
}

/// The single parse boundary all generators share: fence-strip, then parse
/// into the expected contract shape.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, DecodeError> {
    Ok(serde_json::from_str(strip_code_fence(raw))?)
}
