/// Number of leading token characters shown by `mask_token`
const TOKEN_PREVIEW_CHARS: usize = 8;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Show only the start of a secret, for diagnostics output
pub fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= TOKEN_PREVIEW_CHARS {
        "*".repeat(count)
    } else {
        let preview: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
        format!("{}... ({} chars)", preview, count)
    }
}
