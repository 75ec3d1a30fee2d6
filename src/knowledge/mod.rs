//! Knowledge-base loading and the process-wide chunk cache.
//!
//! Knowledge lives in a fixed directory of markdown files. The store reads
//! them exactly once, chunks them, and keeps the immutable chunk list for the
//! process lifetime. There is no invalidation: editing a knowledge file
//! requires a process restart.

pub mod chunker;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;

use crate::rag::retriever::{LexicalRetriever, Retriever};
use crate::rag::types::{ChunkKind, RagChunk, RetrievalQuery, ScoredChunk};

pub use chunker::{chunk_markdown, infer_intents, infer_system_id, DocumentMeta};

/// Configuration for loading the knowledge directory.
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// Directory holding the markdown knowledge files.
    pub dir: PathBuf,
    /// File extensions treated as knowledge documents.
    pub extensions: Vec<String>,
}

impl KnowledgeConfig {
    /// Create a config for the given directory with the default extension set.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extensions: vec!["md".to_string()],
        }
    }
}

/// The in-memory chunk store backing retrieval.
pub struct KnowledgeStore {
    chunks: Vec<RagChunk>,
    retriever: Box<dyn Retriever>,
}

impl KnowledgeStore {
    /// Load every knowledge file under `config.dir`, chunk it and build the
    /// store. Files are visited in sorted name order so the chunk list (and
    /// every retrieval against it) is deterministic.
    pub fn from_dir(config: &KnowledgeConfig) -> Result<Self, anyhow::Error> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&config.dir)
            .with_context(|| format!("failed to read knowledge dir {}", config.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| config.extensions.iter().any(|e| e == ext))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            documents.push((source_id(path), content));
        }

        let store = Self::from_documents(documents);
        tracing::info!(
            files = paths.len(),
            chunks = store.len(),
            dir = %config.dir.display(),
            "knowledge base loaded"
        );
        Ok(store)
    }

    /// Build a store from in-memory documents. This is the seam tests and
    /// fixture-driven callers use instead of touching the filesystem.
    pub fn from_documents(documents: Vec<(String, String)>) -> Self {
        let mut chunks = Vec::new();
        for (source, content) in &documents {
            chunks.extend(chunk_markdown(content, source, ChunkKind::Kb));
        }
        Self {
            chunks,
            retriever: Box::new(LexicalRetriever::new()),
        }
    }

    /// Swap the retrieval backend. Call sites keep using [`Self::retrieve`].
    pub fn with_retriever(mut self, retriever: Box<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    /// The full immutable chunk list.
    pub fn chunks(&self) -> &[RagChunk] {
        &self.chunks
    }

    /// Number of cached chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank the cached chunks against `query`.
    pub fn retrieve(&self, query: &RetrievalQuery) -> Vec<ScoredChunk<'_>> {
        self.retriever.retrieve(&self.chunks, query)
    }
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

fn source_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("unknown")
        .to_string()
}

static SHARED_STORE: OnceLock<KnowledgeStore> = OnceLock::new();

/// Process-wide memoized knowledge store.
///
/// The first call loads the configured directory; later calls return the
/// cached store and ignore the config. Rebuilding requires a process restart.
/// Tests should construct their own [`KnowledgeStore`] instead.
pub fn shared_store(config: &KnowledgeConfig) -> Result<&'static KnowledgeStore, anyhow::Error> {
    if let Some(store) = SHARED_STORE.get() {
        return Ok(store);
    }
    let store = KnowledgeStore::from_dir(config)?;
    Ok(SHARED_STORE.get_or_init(|| store))
}
