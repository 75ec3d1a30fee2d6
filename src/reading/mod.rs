//! Reading generation pipeline.
//!
//! Glues the subsystems together for one logical request: retrieve knowledge,
//! select examples, compose the prompt, call the completion endpoint, and
//! guard the response. The user always receives reading text; a degraded
//! answer is visible only through the metrics and the error log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeStore;
use crate::llm::CompletionClient;
use crate::prompts::{
    catalog, examples_for, instructions, ExampleSet, NumerologyTier, PromptBuilder,
    SpiritOrientation, TarotSpread,
};
use crate::rag::{format_context, RetrievalQuery};
use crate::types::{DivinationType, DrawnCard, Intent, SystemId};
use crate::utilities::errors::{DivinationError, ErrorType};
use crate::validation::{baseline_reading, ErrorLogEntry, ResponseValidator, ValidationResult};

/// Hard cap on upstream completion calls per logical request: the first
/// attempt plus at most one retry after an API error or a validation failure.
pub const MAX_UPSTREAM_ATTEMPTS: u8 = 2;

/// Calculator output accompanying a reading request.
///
/// Produced by the out-of-scope deterministic domain modules (card draws,
/// score computation); this crate only frames it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReadingPayload {
    /// A drawn tarot spread.
    Tarot {
        /// Cards in drawn order.
        cards: Vec<DrawnCard>,
    },
    /// A spirit card with its orientation.
    Spirit {
        /// Card name.
        card: String,
        /// Upright or reversed.
        orientation: SpiritOrientation,
    },
    /// A numerology analysis result.
    Numerology {
        /// Overall score, 0-100.
        score: u32,
        /// What was analyzed (name or phone number).
        subject: String,
    },
    /// Free-form fortune chat, no calculator output.
    Chat,
}

impl ReadingPayload {
    /// The divination type this payload belongs to.
    pub fn divination_type(&self) -> DivinationType {
        match self {
            Self::Tarot { .. } => DivinationType::Tarot,
            Self::Spirit { .. } => DivinationType::Spirit,
            Self::Numerology { .. } => DivinationType::Numerology,
            Self::Chat => DivinationType::Chat,
        }
    }

    /// The few-shot bucket this payload selects.
    pub fn example_set(&self) -> ExampleSet {
        match self {
            Self::Tarot { cards } => ExampleSet::Tarot(TarotSpread::from_card_count(cards.len())),
            Self::Spirit { orientation, .. } => ExampleSet::Spirit(*orientation),
            Self::Numerology { score, .. } => {
                ExampleSet::Numerology(NumerologyTier::from_score(*score))
            }
            Self::Chat => ExampleSet::Chat,
        }
    }

    /// The knowledge subsystem queried by default for this payload.
    pub fn default_system_id(&self) -> Option<SystemId> {
        match self {
            Self::Tarot { .. } => Some(SystemId::TarotTh),
            Self::Spirit { .. } => Some(SystemId::SpiritTh),
            Self::Numerology { .. } => Some(SystemId::NumerologyTh),
            Self::Chat => None,
        }
    }

    /// The instruction block for this payload.
    pub fn instructions(&self) -> String {
        match self {
            Self::Tarot { cards } => instructions::tarot_instructions(cards),
            Self::Spirit { card, orientation } => {
                instructions::spirit_instructions(card, *orientation)
            }
            Self::Numerology { score, subject } => {
                instructions::numerology_instructions(*score, subject)
            }
            Self::Chat => instructions::chat_instructions(),
        }
    }

    /// Extra retrieval terms derived from the calculator output.
    fn retrieval_terms(&self) -> String {
        match self {
            Self::Tarot { cards } => cards
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Spirit { card, .. } => card.clone(),
            Self::Numerology { subject, .. } => subject.clone(),
            Self::Chat => String::new(),
        }
    }
}

/// One logical reading request from a route handler.
#[derive(Debug, Clone)]
pub struct ReadingRequest {
    /// The user's question.
    pub question: String,
    /// Calculator output for the requested divination type.
    pub payload: ReadingPayload,
    /// Override the knowledge subsystem filter.
    pub system_id: Option<SystemId>,
    /// Boost knowledge chunks tagged with this intent.
    pub intent: Option<Intent>,
    /// Override the retrieval limit.
    pub limit: Option<usize>,
}

impl ReadingRequest {
    /// Create a request with defaults derived from the payload.
    pub fn new(question: impl Into<String>, payload: ReadingPayload) -> Self {
        Self {
            question: question.into(),
            payload,
            system_id: None,
            intent: None,
            limit: None,
        }
    }

    /// Builder: boost an intent during retrieval.
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    fn retrieval_query(&self) -> RetrievalQuery {
        let terms = self.payload.retrieval_terms();
        let text = if terms.is_empty() {
            self.question.clone()
        } else {
            format!("{} {}", self.question, terms)
        };

        let mut query = RetrievalQuery::new(text);
        query.system_id = self.system_id.or_else(|| self.payload.default_system_id());
        query.intent = self.intent;
        query.limit = self.limit;
        query
    }

    fn user_data_block(&self) -> String {
        let mut lines = vec![format!("คำถามของผู้ถาม: {}", self.question)];
        match &self.payload {
            ReadingPayload::Tarot { cards } => {
                let names: Vec<String> = cards
                    .iter()
                    .map(|c| {
                        format!("{}{}", c.name, if c.reversed { " (กลับหัว)" } else { "" })
                    })
                    .collect();
                lines.push(format!("ไพ่ที่เปิดได้: {}", names.join(", ")));
            }
            ReadingPayload::Spirit { card, orientation } => {
                let o = match orientation {
                    SpiritOrientation::Upright => "หงาย",
                    SpiritOrientation::Reversed => "กลับหัว",
                };
                lines.push(format!("ไพ่จิตวิญญาณ: {} ({})", card, o));
            }
            ReadingPayload::Numerology { score, subject } => {
                lines.push(format!("สิ่งที่วิเคราะห์: {}", subject));
                lines.push(format!("คะแนนรวม: {}", score));
            }
            ReadingPayload::Chat => {}
        }
        lines.join("\n")
    }
}

/// A finished reading, ready for JSON-envelope delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    /// The reading category.
    pub divination_type: DivinationType,
    /// The reading text returned to the user.
    pub text: String,
    /// Validation outcome of the final upstream response.
    pub validation: ValidationResult,
    /// Whether the text was repaired, synthesized or replaced by a baseline.
    pub used_fallback: bool,
    /// How many upstream calls were made (1 or 2).
    pub upstream_attempts: u8,
}

/// The reading pipeline over a knowledge store and a completion backend.
pub struct ReadingService<C: CompletionClient> {
    store: Arc<KnowledgeStore>,
    validator: ResponseValidator,
    client: C,
}

impl<C: CompletionClient> ReadingService<C> {
    /// Create a service over the given store, validator and client.
    pub fn new(store: Arc<KnowledgeStore>, validator: ResponseValidator, client: C) -> Self {
        Self {
            store,
            validator,
            client,
        }
    }

    /// The validator (and through it, the metrics and log services).
    pub fn validator(&self) -> &ResponseValidator {
        &self.validator
    }

    /// Compose the full prompt for a request without calling upstream.
    pub fn compose_prompt(&self, request: &ReadingRequest) -> Result<String, DivinationError> {
        let divination_type = request.payload.divination_type();
        let scored = self.store.retrieve(&request.retrieval_query());
        let context = format_context(&scored);
        let cat = catalog();

        tracing::debug!(
            divination_type = %divination_type,
            retrieved_chunks = scored.len(),
            "composing prompt"
        );

        PromptBuilder::new(request.payload.instructions(), request.user_data_block())
            .role(cat.roles.get(divination_type))
            .knowledge_base(context)
            .cultural_context(cat.cultural_context.get(divination_type))
            .few_shot_examples(examples_for(request.payload.example_set()))
            .build()
    }

    /// Generate a reading for one logical request.
    ///
    /// Makes at most [`MAX_UPSTREAM_ATTEMPTS`] upstream calls: an API error
    /// or a validation failure triggers a single retry. After that, an
    /// invalid response is repaired via structural synthesis, and a missing
    /// response is replaced by the precomputed baseline, so the caller always
    /// receives text.
    ///
    /// # Errors
    ///
    /// Only template-composition failures propagate; upstream and validation
    /// failures are absorbed.
    pub async fn generate_reading(
        &self,
        request: &ReadingRequest,
    ) -> Result<Reading, DivinationError> {
        let divination_type = request.payload.divination_type();
        let prompt = self.compose_prompt(request)?;

        let mut last_invalid: Option<(String, ValidationResult)> = None;
        let mut attempts = 0u8;

        while attempts < MAX_UPSTREAM_ATTEMPTS {
            attempts += 1;
            match self.client.complete(&prompt).await {
                Ok(text) => {
                    let validation = self
                        .validator
                        .validate_ai_response(Some(&text), divination_type);
                    if validation.is_valid {
                        return Ok(Reading {
                            divination_type,
                            text,
                            validation,
                            used_fallback: false,
                            upstream_attempts: attempts,
                        });
                    }
                    last_invalid = Some((text, validation));
                }
                Err(err) => {
                    tracing::warn!(
                        divination_type = %divination_type,
                        attempt = attempts,
                        error = %err,
                        "completion call failed"
                    );
                    self.validator
                        .metrics()
                        .record_error(ErrorType::Api, divination_type);
                    self.validator.error_log().append(
                        ErrorLogEntry::new(ErrorType::Api, divination_type, err.to_string())
                            .with_context("attempt", attempts.to_string()),
                    );
                }
            }
        }

        let reading = match last_invalid {
            Some((raw, validation)) => {
                let text =
                    self.validator
                        .ensure_fortune_structure(&raw, &request.question, Some(divination_type));
                Reading {
                    divination_type,
                    text,
                    validation,
                    used_fallback: true,
                    upstream_attempts: attempts,
                }
            }
            None => Reading {
                divination_type,
                text: baseline_reading(divination_type),
                validation: ValidationResult::valid(),
                used_fallback: true,
                upstream_attempts: attempts,
            },
        };
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ErrorLog, MetricsRegistry};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays scripted responses and records every prompt it receives.
    /// Clones share state, so tests keep a handle after moving one into the
    /// service.
    #[derive(Clone)]
    struct ScriptedClient {
        responses: Arc<Mutex<VecDeque<Result<String, DivinationError>>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String, DivinationError>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String, DivinationError> {
            self.prompts.lock().push(prompt.to_string());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(DivinationError::api("script exhausted")))
        }
    }

    const VALID_TAROT: &str = "ภาพรวม: ไพ่ The Fool บอกถึงการเริ่มต้นใหม่ที่สดใส เพราะพลังของไพ่ใบนี้หนุนความกล้า ประกอบกับจังหวะชีวิตที่เปิดทางให้ก้าวออกจากกรอบเดิมอย่างชัดเจน\nคำแนะนำ: กล้าเริ่มสิ่งที่วางแผนไว้ได้เลย ความตั้งใจของคุณจะดึงดูดผู้สนับสนุน\nข้อควรระวัง: อย่าประมาทรายละเอียดเล็ก ๆ ระหว่างทางที่รีบเดิน";

    fn service(client: &ScriptedClient) -> ReadingService<ScriptedClient> {
        let store = Arc::new(KnowledgeStore::from_documents(vec![(
            "tarot-cards".to_string(),
            "## ไพ่ The Fool\nไพ่แห่งการเริ่มต้นใหม่ อิสรภาพ และความกล้า\n".to_string(),
        )]));
        let validator = ResponseValidator::new(MetricsRegistry::new(), ErrorLog::new());
        ReadingService::new(store, validator, client.clone())
    }

    fn tarot_request() -> ReadingRequest {
        ReadingRequest::new(
            "การงานช่วงนี้เป็นอย่างไร",
            ReadingPayload::Tarot {
                cards: vec![DrawnCard::upright("The Fool")],
            },
        )
    }

    #[tokio::test]
    async fn test_valid_response_needs_one_attempt() {
        let client = ScriptedClient::new(vec![Ok(VALID_TAROT.to_string())]);
        let svc = service(&client);
        let reading = svc.generate_reading(&tarot_request()).await.unwrap();

        assert!(reading.validation.is_valid);
        assert!(!reading.used_fallback);
        assert_eq!(reading.upstream_attempts, 1);
        assert_eq!(client.call_count(), 1);
        assert_eq!(reading.text, VALID_TAROT);
    }

    #[tokio::test]
    async fn test_prompt_contains_all_composed_sections() {
        let client = ScriptedClient::new(vec![Ok(VALID_TAROT.to_string())]);
        let svc = service(&client);
        svc.generate_reading(&tarot_request()).await.unwrap();

        let prompts = client.prompts.lock();
        let prompt = &prompts[0];
        // Role, knowledge, cultural context, examples, instructions, user data.
        assert!(prompt.contains("แม่หมอไพ่ทาโรต์"));
        assert!(prompt.contains("KNOWLEDGE BASE START"));
        assert!(prompt.contains("บริบทวัฒนธรรมไทย"));
        assert!(prompt.contains("INPUT:"));
        assert!(prompt.contains("คุณกำลังทำนายไพ่ทาโรต์จำนวน 1 ใบ"));
        assert!(prompt.contains("คำถามของผู้ถาม: การงานช่วงนี้เป็นอย่างไร"));
    }

    #[tokio::test]
    async fn test_invalid_then_valid_retries_once() {
        let client = ScriptedClient::new(vec![
            Ok("สั้นเกินไป".to_string()),
            Ok(VALID_TAROT.to_string()),
        ]);
        let svc = service(&client);
        let reading = svc.generate_reading(&tarot_request()).await.unwrap();

        assert!(reading.validation.is_valid);
        assert!(!reading.used_fallback);
        assert_eq!(reading.upstream_attempts, 2);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_twice_repairs_and_stops_at_two_calls() {
        let client = ScriptedClient::new(vec![
            Ok("คำตอบที่ไม่มีโครงสร้าง".to_string()),
            Ok("คำตอบที่ไม่มีโครงสร้างอีกครั้ง".to_string()),
        ]);
        let svc = service(&client);
        let reading = svc.generate_reading(&tarot_request()).await.unwrap();

        assert!(reading.used_fallback);
        assert_eq!(client.call_count(), 2);
        assert!(reading.text.contains("คำตอบที่ไม่มีโครงสร้างอีกครั้ง"));
        for label in crate::validation::REQUIRED_SECTION_LABELS {
            assert!(reading.text.contains(label));
        }
        assert_eq!(svc.validator().metrics().snapshot().fallback_usages, 1);
    }

    #[tokio::test]
    async fn test_api_error_twice_serves_baseline() {
        let client = ScriptedClient::new(vec![
            Err(DivinationError::api("boom")),
            Err(DivinationError::api("boom again")),
        ]);
        let svc = service(&client);
        let reading = svc.generate_reading(&tarot_request()).await.unwrap();

        assert!(reading.used_fallback);
        assert_eq!(reading.upstream_attempts, 2);
        assert_eq!(reading.text, baseline_reading(DivinationType::Tarot));

        let snap = svc.validator().metrics().snapshot();
        assert_eq!(snap.errors_by_type[&crate::utilities::errors::ErrorType::Api], 2);
        assert_eq!(svc.validator().error_log().len(), 2);
    }

    #[tokio::test]
    async fn test_api_error_then_valid_recovers() {
        let client = ScriptedClient::new(vec![
            Err(DivinationError::api("transient")),
            Ok(VALID_TAROT.to_string()),
        ]);
        let svc = service(&client);
        let reading = svc.generate_reading(&tarot_request()).await.unwrap();

        assert!(!reading.used_fallback);
        assert_eq!(reading.upstream_attempts, 2);
    }

    #[tokio::test]
    async fn test_empty_store_omits_knowledge_section() {
        let client = ScriptedClient::new(vec![Ok(VALID_TAROT.to_string())]);
        let store = Arc::new(KnowledgeStore::from_documents(Vec::new()));
        let validator = ResponseValidator::new(MetricsRegistry::new(), ErrorLog::new());
        let svc = ReadingService::new(store, validator, client.clone());
        svc.generate_reading(&tarot_request()).await.unwrap();

        let prompts = client.prompts.lock();
        assert!(!prompts[0].contains("KNOWLEDGE BASE"));
    }

    #[test]
    fn test_payload_example_sets() {
        let ten = ReadingPayload::Tarot {
            cards: (0..10).map(|i| DrawnCard::upright(format!("Card {}", i))).collect(),
        };
        assert_eq!(ten.example_set(), ExampleSet::Tarot(TarotSpread::CelticCross));

        let spirit = ReadingPayload::Spirit {
            card: "หงส์".to_string(),
            orientation: SpiritOrientation::Reversed,
        };
        assert_eq!(
            spirit.example_set(),
            ExampleSet::Spirit(SpiritOrientation::Reversed)
        );

        let medium = ReadingPayload::Numerology {
            score: 55,
            subject: "เบอร์".to_string(),
        };
        assert_eq!(
            medium.example_set(),
            ExampleSet::Numerology(NumerologyTier::High)
        );
    }
}
