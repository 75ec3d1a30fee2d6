//! Type definitions for the retrieval subsystem.

use serde::{Deserialize, Serialize};

use crate::types::{Intent, SystemId};

/// Default number of chunks returned by a retrieval query.
pub const DEFAULT_RETRIEVAL_LIMIT: usize = 6;

/// The kind of knowledge a chunk carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Knowledge-base prose (gets the flat grounding bonus when scored).
    Kb,
    /// Worked example material.
    Example,
    /// Terminology definitions.
    Glossary,
    /// Output-schema documentation.
    Schema,
}

impl ChunkKind {
    /// Wire form of the kind, used in chunk ids and formatted metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kb => "kb",
            Self::Example => "example",
            Self::Glossary => "glossary",
            Self::Schema => "schema",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A heading-scoped slice of a knowledge document, the unit of retrieval.
///
/// Chunks are immutable once built and cached for the process lifetime; the
/// chunker guarantees identical input produces an identical chunk list, which
/// is what makes the process-wide cache safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagChunk {
    /// Deterministic id, `{kind}:{source}:{index}`.
    pub id: String,
    /// What kind of knowledge this chunk carries.
    pub kind: ChunkKind,
    /// Owning divination subsystem, when declared or inferable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_id: Option<SystemId>,
    /// Question intents this chunk addresses, sorted and deduplicated.
    #[serde(default)]
    pub intents: Vec<Intent>,
    /// Heading title of the chunk (document title for preamble chunks).
    pub title: String,
    /// Heading ancestry from the document root down to this chunk.
    #[serde(default)]
    pub heading_path: Vec<String>,
    /// Body text of the chunk.
    pub text: String,
    /// Source document id (file stem).
    pub source: String,
}

impl RagChunk {
    /// Compose the deterministic chunk id.
    pub fn make_id(kind: ChunkKind, source: &str, index: usize) -> String {
        format!("{}:{}:{}", kind.as_str(), source, index)
    }
}

/// A chunk paired with its lexical relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk<'a> {
    /// The matched chunk.
    pub chunk: &'a RagChunk,
    /// Summed lexical score; always positive (zero-scored chunks are dropped).
    pub score: i64,
}

/// A retrieval request against the knowledge store.
#[derive(Debug, Clone, Default)]
pub struct RetrievalQuery {
    /// Free-text query, usually the user's question plus calculator output.
    pub text: String,
    /// Restrict the system-id boost to this subsystem.
    pub system_id: Option<SystemId>,
    /// Boost chunks tagged with this intent.
    pub intent: Option<Intent>,
    /// Maximum chunks to return; `None` means [`DEFAULT_RETRIEVAL_LIMIT`].
    pub limit: Option<usize>,
}

impl RetrievalQuery {
    /// Create a query with just free text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Builder: restrict to a subsystem.
    pub fn with_system(mut self, system_id: SystemId) -> Self {
        self.system_id = Some(system_id);
        self
    }

    /// Builder: boost an intent.
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// Builder: override the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective result limit.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_RETRIEVAL_LIMIT)
    }
}
