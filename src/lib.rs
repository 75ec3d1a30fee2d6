//! # duangdee
//!
//! Prompt composition and knowledge retrieval core for a Thai-language
//! divination assistant. The crate covers the full pipeline between a route
//! handler and the external generative endpoint: heading-scoped markdown
//! chunking, lexical retrieval, few-shot and cultural-context prompt
//! composition, response validation with fallback synthesis, and the
//! metrics/error-log side-channel an operator dashboard reads.
//!
//! Everything is in-memory and process-lifetime: the chunk cache is built
//! once from a fixed knowledge directory, and the metrics/log services are
//! explicit handles injected where they are needed.

pub mod knowledge;
pub mod llm;
pub mod prompts;
pub mod rag;
pub mod reading;
pub mod types;
pub mod utilities;
pub mod validation;

pub use knowledge::{shared_store, KnowledgeConfig, KnowledgeStore};
pub use llm::{CompletionClient, HttpCompletionClient, LlmConfig};
pub use prompts::{ExampleSet, FewShotExample, PromptBuilder};
pub use rag::{ChunkKind, LexicalRetriever, RagChunk, RetrievalQuery, Retriever};
pub use reading::{Reading, ReadingPayload, ReadingRequest, ReadingService};
pub use types::{DivinationType, DrawnCard, Intent, SystemId};
pub use utilities::errors::{DivinationError, ErrorType};
pub use validation::{
    ErrorLog, MetricsRegistry, MetricsSnapshot, ResponseValidator, ValidationResult,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
