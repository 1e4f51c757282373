//! Prompt construction for every generative intent.
//!
//! Each builder is pure: it takes entities and returns a [`PromptPayload`]
//! ready for the gateway. Static instruction text lives in constants so it can
//! be reviewed and versioned in one place.

use serde::Serialize;
use serde_json::{json, Value};

use crate::context::build_global_context;
use crate::model::{ComparativeAnalysis, GrantLocation, GrantRecord, KnowledgeItem, Outcome};

/// Temperature for the comparative analysis, kept low for consistent output.
pub const ANALYSIS_TEMPERATURE: f64 = 0.2;

/// Persona and task framing for comparative analysis.
pub const ANALYSIS_INSTRUCTIONS: &str = r#"Analyze the following list of grant applications and their outcomes (WON vs LOST).
Your goal is to identify the critical differentiating factors that led to success or failure.

Specific Instructions:
1. **Funding Efficiency**: Analyze the 'amountAwarded' vs 'amountRequested'. For WON grants, determine if there is a pattern in grants that received 100% funding vs partial funding. Consider the funding magnitude as a factor.
2. **Location Analysis**: Consider the target locations ({locations}). Identify if certain locations have higher success rates, or if specific project types or themes perform better in specific locations. Look for correlations between location and outcome.
3. **Differentiating Factors**: Focus on clarity of impact, budget specificity, sustainability, and language tone.
4. **Comparative Analysis**: Contrast the winners against the losers."#;

/// System instruction framing for dataset chat.
pub const CHAT_PERSONA: &str = r#"You are an expert grant analyst assistant.
You have been provided with a dataset of grant applications, their outcomes (WON/LOST), funding details, and locations.
You also have access to a Global Knowledge Base containing relevant statistics and organizational writings.

Your goal is to answer user questions specifically about this dataset and help them write better content using the Knowledge Base.
You can calculate totals, compare specific applications, summarize content, or explain why specific grants might have won or lost based on the provided content."#;

/// Closing rules appended after the chat dataset.
pub const CHAT_RULES: &str = r#"Always reference specific applications by title when relevant. Keep answers concise and helpful.
If the user asks about statistics or topics covered in the Global Knowledge Base (e.g., homelessness stats), use that information to inform your answer."#;

/// Writing rules for first drafts.
pub const DRAFT_RULES: &str = r#"INSTRUCTIONS:
- Write a compelling, specific, and direct response.
- Use professional, persuasive language.
- Adopt the tone and style found in the "Organizational Knowledge" if available.
- Incorporate relevant statistics from the "Relevant External Links" or Knowledge Base if they support the argument (e.g. homelessness stats).
- Strictly adhere to any constraints found in the Question or Context."#;

/// Used in place of analysis signals when no analysis exists.
pub const NO_ANALYSIS_STRATEGY: &str =
    "No historical analysis available. Rely on general best practices.";

/// Writing rules for feedback-driven rewrites.
pub const REFINE_RULES: &str = r#"INSTRUCTIONS:
- Rewrite the draft to incorporate the user's feedback.
- Maintain the professional tone.
- Do not output explanations, just the new draft text."#;

/// A complete request for the generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    /// User-turn content.
    pub prompt: String,
    /// JSON schema the response must follow; `Some` requests JSON output.
    pub response_schema: Option<Value>,
    /// Sampling temperature; `None` uses the model default.
    pub temperature: Option<f64>,
}

impl PromptPayload {
    /// Free-text payload with only a prompt.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
            temperature: None,
        }
    }

    /// Request JSON output matching `schema`.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Whether the payload asks for schema-constrained JSON.
    pub fn is_structured(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// Grant fields exposed to the model; ids and organization stay local.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantFacts<'a> {
    title: &'a str,
    outcome: Outcome,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_requested: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_awarded: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locations: Option<&'a [GrantLocation]>,
}

/// Pretty JSON listing of the grant dataset.
pub fn serialize_grants(grants: &[GrantRecord]) -> String {
    let facts: Vec<GrantFacts<'_>> = grants
        .iter()
        .map(|g| GrantFacts {
            title: &g.title,
            outcome: g.outcome,
            content: &g.content,
            amount_requested: g.amount_requested,
            amount_awarded: g.amount_awarded,
            locations: g.locations.as_deref(),
        })
        .collect();
    serde_json::to_string_pretty(&facts).unwrap_or_else(|_| "[]".to_string())
}

/// Comparative analysis payload with its response schema.
///
/// Callers must ensure at least two grants are present.
pub fn analysis_prompt(grants: &[GrantRecord]) -> PromptPayload {
    let locations = GrantLocation::ALL
        .iter()
        .map(|l| format!("'{}'", l.label()))
        .collect::<Vec<_>>()
        .join(", ");

    let prompt = format!(
        "{}\n\nHere are the applications:\n{}\n",
        ANALYSIS_INSTRUCTIONS.replace("{locations}", &locations),
        serialize_grants(grants)
    );

    PromptPayload::text(prompt)
        .with_schema(analysis_schema())
        .with_temperature(ANALYSIS_TEMPERATURE)
}

/// Response schema for [`ComparativeAnalysis`], in the Gemini schema dialect.
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "executiveSummary": {
                "type": "STRING",
                "description": "A high-level summary of the analysis comparing winners and losers, including observations on funding amounts and location-based trends."
            },
            "winningStrengths": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of common strengths found in winning applications."
            },
            "losingWeaknesses": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of common weaknesses found in losing applications."
            },
            "actionableAdvice": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Specific, actionable steps for a user to improve their grant writing."
            },
            "keyThemes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "sentiment": { "type": "STRING", "enum": ["POSITIVE", "NEGATIVE", "NEUTRAL"] },
                        "impactScore": { "type": "NUMBER", "description": "1 to 10 scale of importance" },
                        "frequency": { "type": "NUMBER", "description": "Count of occurrences" }
                    },
                    "required": ["name", "description", "sentiment", "impactScore", "frequency"]
                }
            },
            "successRateByTheme": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "theme": { "type": "STRING" },
                        "rate": { "type": "NUMBER", "description": "Success rate (0.0 to 1.0) associated with this theme" }
                    },
                    "required": ["theme", "rate"]
                }
            }
        },
        "required": [
            "executiveSummary",
            "winningStrengths",
            "losingWeaknesses",
            "keyThemes",
            "actionableAdvice",
            "successRateByTheme"
        ]
    })
}

/// System instruction binding a chat session to a dataset snapshot.
pub fn chat_system_instruction(grants: &[GrantRecord], items: &[KnowledgeItem]) -> String {
    format!(
        "{}\n\nDATASET:\n{}\n{}\n\n{}",
        CHAT_PERSONA,
        serialize_grants(grants),
        build_global_context(items),
        CHAT_RULES
    )
}

/// First-draft payload for one application question.
pub fn draft_prompt(
    question: &str,
    context: &str,
    analysis: Option<&ComparativeAnalysis>,
    items: &[KnowledgeItem],
) -> PromptPayload {
    let strategy = match analysis {
        Some(a) => format!(
            "Key learnings from successful grants to apply:\n\
             - Strengths to emulate: {}\n\
             - Pitfalls to avoid: {}\n\
             - Actionable Advice: {}",
            a.winning_strengths.join(", "),
            a.losing_weaknesses.join(", "),
            a.actionable_advice.join(", ")
        ),
        None => NO_ANALYSIS_STRATEGY.to_string(),
    };

    PromptPayload::text(format!(
        "You are an expert grant writer. Write a response to a specific grant application question.\n\n\
         QUESTION:\n{}\n\n\
         CONTEXT (Application Guidelines & Background):\n{}\n\
         {}\n\n\
         STRATEGY (Based on analysis of past winners):\n{}\n\n\
         {}",
        question,
        context,
        build_global_context(items),
        strategy,
        DRAFT_RULES
    ))
}

/// Rewrite payload applying user feedback to an existing draft.
pub fn refine_prompt(question: &str, current_draft: &str, feedback: &str) -> PromptPayload {
    PromptPayload::text(format!(
        "You are editing a grant application response based on user feedback.\n\n\
         QUESTION:\n{}\n\n\
         CURRENT DRAFT:\n{}\n\n\
         USER FEEDBACK / INSTRUCTIONS:\n{}\n\n\
         {}",
        question, current_draft, feedback, REFINE_RULES
    ))
}
