//! Lexical chunk retrieval.
//!
//! The scorer is a substring-scan prototype, not an inverted index.
//! Thai questions arrive without word boundaries, so token-level substring
//! matching against the normalized chunk text is what actually works here.
//! The [`Retriever`] trait is the seam for swapping in BM25 or a vector
//! backend later without touching call sites.

use crate::rag::types::{ChunkKind, RagChunk, RetrievalQuery, ScoredChunk};
use crate::utilities::text::{normalize, tokenize};

/// Score added for every query token found in the chunk text.
const TOKEN_MATCH_SCORE: i64 = 2;
/// Score added when the entire normalized query appears verbatim.
const PHRASE_BONUS: i64 = 6;
/// Minimum normalized-query length (chars) for the phrase bonus to apply.
const PHRASE_MIN_CHARS: usize = 6;
/// Score added when the chunk's system id matches the query filter.
const SYSTEM_MATCH_BONUS: i64 = 6;
/// Score added when the chunk is tagged with the query intent.
const INTENT_MATCH_BONUS: i64 = 4;
/// Flat grounding bonus for knowledge-base chunks.
const KB_GROUNDING_BONUS: i64 = 1;

/// Ranks chunks against a retrieval query.
pub trait Retriever: Send + Sync {
    /// Score `chunks` against `query`, returning matches in descending score
    /// order, truncated to the query limit. Ties preserve input order.
    fn retrieve<'a>(&self, chunks: &'a [RagChunk], query: &RetrievalQuery)
        -> Vec<ScoredChunk<'a>>;
}

/// Substring-based lexical retriever.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalRetriever;

impl LexicalRetriever {
    /// Create a new lexical retriever.
    pub fn new() -> Self {
        Self
    }

    /// Score a single chunk against the prepared query parts.
    fn score_chunk(
        chunk: &RagChunk,
        tokens: &[String],
        normalized_query: &str,
        query: &RetrievalQuery,
    ) -> i64 {
        let haystack = normalize(&format!("{}\n{}", chunk.title, chunk.text));
        let mut score = 0;

        for token in tokens {
            if haystack.contains(token.as_str()) {
                score += TOKEN_MATCH_SCORE;
            }
        }

        if normalized_query.chars().count() >= PHRASE_MIN_CHARS
            && haystack.contains(normalized_query)
        {
            score += PHRASE_BONUS;
        }

        if let (Some(wanted), Some(actual)) = (query.system_id, chunk.system_id) {
            if wanted == actual {
                score += SYSTEM_MATCH_BONUS;
            }
        }

        if let Some(intent) = query.intent {
            if chunk.intents.contains(&intent) {
                score += INTENT_MATCH_BONUS;
            }
        }

        if chunk.kind == ChunkKind::Kb {
            score += KB_GROUNDING_BONUS;
        }

        score
    }
}

impl Retriever for LexicalRetriever {
    fn retrieve<'a>(
        &self,
        chunks: &'a [RagChunk],
        query: &RetrievalQuery,
    ) -> Vec<ScoredChunk<'a>> {
        let tokens = tokenize(&query.text);
        let normalized_query = normalize(&query.text);

        let mut scored: Vec<ScoredChunk<'a>> = chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: Self::score_chunk(chunk, &tokens, &normalized_query, query),
                chunk,
            })
            .filter(|sc| sc.score > 0)
            .collect();

        // sort_by is stable: equal scores keep original chunk order, which
        // keeps repeated retrievals byte-identical.
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(query.effective_limit());
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intent, SystemId};

    fn chunk(id: usize, title: &str, text: &str) -> RagChunk {
        RagChunk {
            id: RagChunk::make_id(ChunkKind::Kb, "test", id),
            kind: ChunkKind::Kb,
            system_id: None,
            intents: Vec::new(),
            title: title.to_string(),
            heading_path: vec![title.to_string()],
            text: text.to_string(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_retrieval_is_deterministic() {
        let chunks = vec![
            chunk(0, "ไพ่ The Fool", "ความหมายของไพ่ the fool คือการเริ่มต้นใหม่"),
            chunk(1, "ไพ่ The Magician", "ไพ่แห่งความสามารถและการลงมือทำ"),
            chunk(2, "ราศีเมษ", "ดวงประจำราศีเมษในเดือนนี้"),
        ];
        let retriever = LexicalRetriever::new();
        let query = RetrievalQuery::new("ไพ่ the fool");

        let first: Vec<(String, i64)> = retriever
            .retrieve(&chunks, &query)
            .iter()
            .map(|sc| (sc.chunk.id.clone(), sc.score))
            .collect();
        let second: Vec<(String, i64)> = retriever
            .retrieve(&chunks, &query)
            .iter()
            .map(|sc| (sc.chunk.id.clone(), sc.score))
            .collect();

        assert_eq!(first, second);
        assert_eq!(first[0].0, "kb:test:0");
    }

    #[test]
    fn test_zero_scored_chunks_are_excluded() {
        // A kb chunk with no token overlap still carries the +1 grounding
        // bonus and stays in; a glossary chunk with no overlap scores 0 and
        // is dropped.
        let kb = chunk(0, "เลขศาสตร์", "พลังของตัวเลขในชื่อ");
        let mut glossary = kb.clone();
        glossary.kind = ChunkKind::Glossary;

        let retriever = LexicalRetriever::new();
        let query = RetrievalQuery::new("unrelated query");
        assert_eq!(retriever.retrieve(std::slice::from_ref(&kb), &query).len(), 1);
        assert!(retriever.retrieve(std::slice::from_ref(&glossary), &query).is_empty());
    }

    #[test]
    fn test_system_filter_boost_is_exactly_six() {
        let base = chunk(0, "ดวงรายวัน", "คำทำนายดวงรายวันสำหรับทุกราศี");
        let mut tagged = base.clone();
        tagged.id = RagChunk::make_id(ChunkKind::Kb, "test", 1);
        tagged.system_id = Some(SystemId::ThaiAstrology);

        let retriever = LexicalRetriever::new();
        let query = RetrievalQuery::new("ดวงรายวัน").with_system(SystemId::ThaiAstrology);
        let results = retriever.retrieve(&[base, tagged], &query);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "kb:test:1");
        assert_eq!(results[0].score - results[1].score, 6);
    }

    #[test]
    fn test_intent_boost_is_exactly_four() {
        let base = chunk(0, "ความหมายไพ่", "ไพ่ใบนี้พูดถึงการเดินทาง");
        let mut tagged = base.clone();
        tagged.id = RagChunk::make_id(ChunkKind::Kb, "test", 1);
        tagged.intents = vec![Intent::Love];

        let retriever = LexicalRetriever::new();
        let query = RetrievalQuery::new("ความหมายไพ่").with_intent(Intent::Love);
        let results = retriever.retrieve(&[base, tagged], &query);

        assert_eq!(results[0].chunk.id, "kb:test:1");
        assert_eq!(results[0].score - results[1].score, 4);
    }

    #[test]
    fn test_phrase_bonus_requires_min_length() {
        let c = chunk(0, "ฤกษ์มงคล", "ฤกษ์ดีสำหรับการเริ่มงานใหม่");
        let retriever = LexicalRetriever::new();

        // "ฤกษ์ดี" is 6 chars after normalization and appears verbatim.
        let with_phrase = retriever.retrieve(std::slice::from_ref(&c), &RetrievalQuery::new("ฤกษ์ดี"));
        // Token (+2) + phrase (+6) + kb (+1).
        assert_eq!(with_phrase[0].score, 9);
    }

    #[test]
    fn test_limit_truncates() {
        let chunks: Vec<RagChunk> = (0..10)
            .map(|i| chunk(i, "ดวงชะตา", "คำทำนายดวงชะตาประจำวัน"))
            .collect();
        let retriever = LexicalRetriever::new();
        let results = retriever.retrieve(&chunks, &RetrievalQuery::new("ดวงชะตา").with_limit(3));
        assert_eq!(results.len(), 3);
        // Ties keep original order.
        assert_eq!(results[0].chunk.id, "kb:test:0");
        assert_eq!(results[2].chunk.id, "kb:test:2");
    }
}
