/// Default hosted completions endpoint.
pub const DEFAULT_COMPLETIONS_URL: &str = "https://api.blackbox.ai/chat/completions";

/// Path suffix every completions endpoint ends with.
pub const COMPLETIONS_PATH: &str = "/chat/completions";

/// Normalize a base URL to a chat-completions endpoint.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_COMPLETIONS_URL`]
/// 2) keep `/chat/completions` unchanged
/// 3) append `/chat/completions` otherwise
pub fn normalize_completions_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_COMPLETIONS_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_PATH) {
        return trimmed.to_string();
    }
    format!("{trimmed}{COMPLETIONS_PATH}")
}
