//! Prompt rendering for image synthesis.
//!
//! Callers submit a free-form JSON document; only its `prompt` field is
//! used today. The rendered text is what the synthesizer receives.

use crate::error::CoreError;

/// Prompt used when the document carries no `prompt` field.
pub const DEFAULT_PROMPT: &str =
    "A professional headshot with natural lighting and neutral background";

/// Upper bound on the rendered prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 32_000;

/// Render the synthesis prompt from a caller-supplied prompt document.
///
/// - The document must be a JSON object.
/// - A missing `prompt` field falls back to [`DEFAULT_PROMPT`].
/// - A present `prompt` must be a non-blank string of at most
///   [`MAX_PROMPT_CHARS`] characters.
pub fn render_prompt(document: &serde_json::Value) -> Result<String, CoreError> {
    let obj = document
        .as_object()
        .ok_or_else(|| CoreError::Validation("prompt must be a JSON object".into()))?;

    let prompt = match obj.get("prompt") {
        None | Some(serde_json::Value::Null) => DEFAULT_PROMPT,
        Some(serde_json::Value::String(s)) => s.as_str(),
        Some(_) => {
            return Err(CoreError::Validation(
                "prompt.prompt must be a string".into(),
            ))
        }
    };

    let rendered = prompt.trim();
    if rendered.is_empty() {
        return Err(CoreError::Validation("prompt.prompt must not be blank".into()));
    }
    let len = rendered.chars().count();
    if len > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "prompt.prompt is {len} characters, maximum is {MAX_PROMPT_CHARS}"
        )));
    }

    Ok(rendered.to_string())
}
