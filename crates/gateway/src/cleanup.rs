//! Normalization of generated text

/// Strip an echoed prompt and surrounding whitespace from generated text.
///
/// If `raw` starts with the exact `input`, the prefix is removed before
/// trimming. Only whitespace is trimmed, never punctuation.
pub fn clean_generation(input: &str, raw: &str) -> String {
    match raw.strip_prefix(input) {
        Some(rest) if !input.is_empty() => rest.trim().to_string(),
        _ => raw.trim().to_string(),
    }
}
