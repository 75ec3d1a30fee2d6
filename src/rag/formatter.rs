//! Serializes ranked chunks into the prompt's knowledge block.

use crate::rag::types::ScoredChunk;

/// Line opening the knowledge block.
pub const CONTEXT_START_MARKER: &str = "=== KNOWLEDGE BASE START ===";
/// Line closing the knowledge block.
pub const CONTEXT_END_MARKER: &str = "=== KNOWLEDGE BASE END ===";
/// Divider between rendered chunks.
const CHUNK_DIVIDER: &str = "---";

/// Render ranked chunks as a bounded text block.
///
/// Each chunk becomes `[#i] title`, a parenthesized metadata line, and the
/// chunk text; chunks are divider-separated and the whole block is wrapped in
/// start/end markers. Empty input returns an empty string with no markers, so
/// an empty knowledge section never shows up in a prompt.
pub fn format_context(chunks: &[ScoredChunk<'_>]) -> String {
    if chunks.is_empty() {
        return String::new();
    }

    let rendered: Vec<String> = chunks
        .iter()
        .enumerate()
        .map(|(i, sc)| {
            let mut meta = vec![
                sc.chunk.kind.as_str().to_string(),
                format!("source: {}", sc.chunk.source),
            ];
            if let Some(system_id) = sc.chunk.system_id {
                meta.push(format!("system: {}", system_id));
            }
            if !sc.chunk.intents.is_empty() {
                let intents: Vec<&str> = sc.chunk.intents.iter().map(|i| i.as_str()).collect();
                meta.push(format!("intents: {}", intents.join(", ")));
            }
            meta.push(format!("score: {}", sc.score));

            format!(
                "[#{}] {}\n({})\n{}",
                i + 1,
                sc.chunk.title,
                meta.join(" | "),
                sc.chunk.text.trim()
            )
        })
        .collect();

    format!(
        "{}\n{}\n{}",
        CONTEXT_START_MARKER,
        rendered.join(&format!("\n{}\n", CHUNK_DIVIDER)),
        CONTEXT_END_MARKER
    )
}
