//! Prompt composition.
//!
//! A prompt is assembled from up to six sections in one fixed order:
//! role, knowledge base, cultural context, few-shot examples, instructions,
//! user data. Instructions and user data are constructor parameters, so a
//! prompt without them cannot be expressed; the optional sections appear only
//! when non-empty.

pub mod catalog;
pub mod examples;
pub mod instructions;

pub use catalog::{catalog, PromptCatalog};
pub use examples::{
    examples_for, ExampleSet, FewShotExample, NumerologyTier, SpiritOrientation, TarotSpread,
};

use crate::utilities::errors::DivinationError;

/// Rule separating few-shot examples.
const EXAMPLE_RULE: &str = "----------------------------------------";

/// Accumulates prompt sections and renders them in the fixed order.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    role: Option<String>,
    knowledge_base: Option<String>,
    cultural_context: Option<String>,
    few_shot_examples: Vec<FewShotExample>,
    instructions: String,
    user_data: String,
}

impl PromptBuilder {
    /// Start a prompt from its two required sections.
    pub fn new(instructions: impl Into<String>, user_data: impl Into<String>) -> Self {
        Self {
            role: None,
            knowledge_base: None,
            cultural_context: None,
            few_shot_examples: Vec::new(),
            instructions: instructions.into(),
            user_data: user_data.into(),
        }
    }

    /// Set the fortune-teller persona section.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the retrieved knowledge block.
    pub fn knowledge_base(mut self, knowledge_base: impl Into<String>) -> Self {
        self.knowledge_base = Some(knowledge_base.into());
        self
    }

    /// Set the cultural-context section.
    pub fn cultural_context(mut self, cultural_context: impl Into<String>) -> Self {
        self.cultural_context = Some(cultural_context.into());
        self
    }

    /// Set the few-shot examples. An empty slice leaves the section out.
    pub fn few_shot_examples(mut self, examples: &[FewShotExample]) -> Self {
        self.few_shot_examples = examples.to_vec();
        self
    }

    /// Render the prompt.
    ///
    /// Sections are joined by blank lines in the fixed order role →
    /// knowledge base → cultural context → few-shot examples → instructions →
    /// user data; sections that are empty after trimming are skipped.
    ///
    /// # Errors
    ///
    /// Returns a template error when instructions or user data are blank;
    /// a prompt without either is a composition bug, not a degraded prompt.
    pub fn build(&self) -> Result<String, DivinationError> {
        if self.instructions.trim().is_empty() {
            return Err(DivinationError::template("instructions section is empty"));
        }
        if self.user_data.trim().is_empty() {
            return Err(DivinationError::template("user data section is empty"));
        }

        let few_shot_block = format_few_shot(&self.few_shot_examples);
        let sections = [
            self.role.as_deref().unwrap_or(""),
            self.knowledge_base.as_deref().unwrap_or(""),
            self.cultural_context.as_deref().unwrap_or(""),
            few_shot_block.as_str(),
            self.instructions.as_str(),
            self.user_data.as_str(),
        ];

        let prompt = sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(prompt.trim().to_string())
    }
}

/// Render the few-shot section. Empty input renders nothing, so the header
/// never appears without examples under it.
fn format_few_shot(examples: &[FewShotExample]) -> String {
    if examples.is_empty() {
        return String::new();
    }

    let labels = &catalog().labels;
    let rendered: Vec<String> = examples
        .iter()
        .enumerate()
        .map(|(i, ex)| {
            format!(
                "{} {}\nscenario: {}\nINPUT: {}\nOUTPUT:\n{}\nnotes: {}",
                labels.few_shot_item,
                i + 1,
                ex.scenario,
                ex.input,
                ex.output,
                ex.notes
            )
        })
        .collect();

    format!(
        "{}\n\n{}",
        labels.few_shot_header,
        rendered.join(&format!("\n{}\n", EXAMPLE_RULE))
    )
}
