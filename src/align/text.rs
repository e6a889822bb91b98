//! Text normalization and similarity scoring

/// Lowercase, replace punctuation with spaces and collapse whitespace
pub fn normalize(text: &str) -> String {
    tokens(text).join(" ")
}

/// Normalized words of `text`
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' {
                // Contractions stay one word: "don't" -> "dont"
                None
            } else {
                Some(' ')
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Similarity ratio in `[0.0, 1.0]`; identical strings score 1.0
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
