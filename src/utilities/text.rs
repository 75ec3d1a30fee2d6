//! Thai-aware text helpers shared by retrieval and validation.

use unicode_normalization::UnicodeNormalization;

/// Maximum number of query tokens considered by the retriever.
pub const MAX_QUERY_TOKENS: usize = 64;

/// Whether a character falls inside the Thai Unicode block (U+0E00-U+0E7F).
pub fn is_thai(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

/// Normalize text for lexical matching: NFKC, lowercase, collapsed whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenize a normalized query.
///
/// Everything outside ASCII digits/lowercase letters, the Thai block and
/// whitespace is stripped before splitting. Thai has no word spaces, so a Thai
/// phrase usually survives as a single long token; substring scoring still
/// matches it. The token list is capped at [`MAX_QUERY_TOKENS`].
pub fn tokenize(query: &str) -> Vec<String> {
    let normalized = normalize(query);
    let cleaned: String = normalized
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || is_thai(c) || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .take(MAX_QUERY_TOKENS)
        .map(str::to_string)
        .collect()
}

/// Count the code points of `text` inside the Thai block.
///
/// Latin letters, digits and punctuation do not count toward length
/// validation; model responses routinely pad with English card names.
pub fn thai_char_count(text: &str) -> usize {
    text.chars().filter(|c| is_thai(*c)).count()
}
