//! Lexical retrieval over the divination knowledge base.
//!
//! This module provides the retrieval subsystem: chunk types, the retriever
//! seam with its lexical implementation, and the context formatter that
//! serializes ranked chunks into the prompt's knowledge block.

pub mod formatter;
pub mod retriever;
pub mod types;

pub use formatter::format_context;
pub use retriever::{LexicalRetriever, Retriever};
pub use types::{ChunkKind, RagChunk, RetrievalQuery, ScoredChunk};
