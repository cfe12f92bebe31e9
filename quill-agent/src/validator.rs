//! Input validation for user questions.
//!
//! Runs before resolution: basic length checks, a small set of
//! harmful-intent patterns, sanitization, and an optional model-based
//! relevance check. Every outcome is a structured [`ValidationReport`];
//! nothing here returns an error to the caller.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use quill_core::{ChatModel, GenerationConfig};

/// Minimum question length in characters (after trimming).
const MIN_QUERY_LENGTH: usize = 3;

/// Maximum question length in characters.
const MAX_QUERY_LENGTH: usize = 1000;

/// Patterns that flag harmful intent in the raw question.
static HARMFUL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(hack|exploit|attack|injection)").expect("valid safety pattern"),
        Regex::new(r"(?i)(password|credential|secret).*(?:steal|get|find)")
            .expect("valid safety pattern"),
    ]
});

/// Whitespace runs, collapsed during sanitization.
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Punctuation stripped during sanitization; normal punctuation stays.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>{}|\[\]\\^`]").expect("valid unsafe-char pattern"));

/// A fenced JSON payload inside a model reply.
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid fence pattern"));

/// Validation outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// The question passed all checks.
    Valid,
    /// The question failed a structural check (empty, too short, too long).
    Invalid,
    /// The question is too vague to answer as asked.
    NeedsClarification,
    /// The question is unrelated to transcript content.
    OffTopic,
    /// The question matched a harmful-intent pattern.
    PotentiallyHarmful,
}

/// The structured result of validating one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// The outcome category.
    pub status: ValidationStatus,
    /// Whether the question may proceed to resolution.
    pub is_valid: bool,
    /// The question as submitted.
    pub original_query: String,
    /// The sanitized form, when sanitization was reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_query: Option<String>,
    /// A human-readable explanation.
    pub message: String,
    /// Suggested rephrasings, when available.
    pub suggestions: Vec<String>,
    /// How certain the verdict is; pattern checks are 1.0, model verdicts
    /// less.
    pub confidence: f32,
}

impl ValidationReport {
    fn rejected(
        status: ValidationStatus,
        query: &str,
        message: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            status,
            is_valid: false,
            original_query: query.to_string(),
            sanitized_query: None,
            message: message.into(),
            suggestions,
            confidence: 1.0,
        }
    }
}

/// The verdict shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct ModelVerdict {
    #[serde(default = "default_true")]
    is_valid: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    suggestions: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Validates and sanitizes user questions.
///
/// Construct with [`new`](QueryValidator::new) for the pattern-only checks,
/// or [`with_model`](QueryValidator::with_model) to add the model-based
/// relevance stage. The model stage fails open: transport errors and
/// malformed verdicts both leave the question valid.
///
/// # Example
///
/// ```rust,ignore
/// use quill_agent::QueryValidator;
///
/// let validator = QueryValidator::with_model(model.clone());
/// let report = validator.validate("What was said about pricing?").await;
/// assert!(report.is_valid);
/// ```
pub struct QueryValidator {
    model: Option<Arc<dyn ChatModel>>,
}

impl QueryValidator {
    /// Create a validator using only the pattern-based stages.
    pub fn new() -> Self {
        Self { model: None }
    }

    /// Create a validator that also runs the model-based relevance check.
    pub fn with_model(model: Arc<dyn ChatModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Validate a question.
    ///
    /// Stages short-circuit on the first failure: basic checks, safety
    /// patterns, sanitization, then the optional model verdict.
    pub async fn validate(&self, query: &str) -> ValidationReport {
        debug!(query_len = query.len(), "validating query");

        if let Some(report) = self.basic_check(query) {
            return report;
        }
        if let Some(report) = self.safety_check(query) {
            return report;
        }

        let sanitized = sanitize(query);

        if let Some(model) = &self.model {
            match self.model_check(model.as_ref(), &sanitized, query).await {
                Ok(report) if !report.is_valid => {
                    return ValidationReport { sanitized_query: Some(sanitized), ..report };
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "model validation failed, continuing with pattern checks");
                }
            }
        }

        ValidationReport {
            status: ValidationStatus::Valid,
            is_valid: true,
            original_query: query.to_string(),
            sanitized_query: Some(sanitized),
            message: "Query is valid".to_string(),
            suggestions: Vec::new(),
            confidence: 1.0,
        }
    }

    fn basic_check(&self, query: &str) -> Option<ValidationReport> {
        let trimmed = query.trim();

        if trimmed.is_empty() {
            return Some(ValidationReport::rejected(
                ValidationStatus::Invalid,
                query,
                "Query cannot be empty",
                vec!["Please enter a question about the transcripts".to_string()],
            ));
        }
        if trimmed.chars().count() < MIN_QUERY_LENGTH {
            return Some(ValidationReport::rejected(
                ValidationStatus::Invalid,
                query,
                format!("Query is too short (minimum {MIN_QUERY_LENGTH} characters)"),
                vec!["Please provide more detail in your question".to_string()],
            ));
        }
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Some(ValidationReport::rejected(
                ValidationStatus::Invalid,
                query,
                format!("Query is too long (maximum {MAX_QUERY_LENGTH} characters)"),
                vec!["Please shorten your question".to_string()],
            ));
        }
        None
    }

    fn safety_check(&self, query: &str) -> Option<ValidationReport> {
        for pattern in HARMFUL_PATTERNS.iter() {
            if pattern.is_match(query) {
                warn!("potentially harmful query rejected");
                return Some(ValidationReport::rejected(
                    ValidationStatus::PotentiallyHarmful,
                    query,
                    "Query contains potentially harmful content",
                    vec!["Please rephrase your question".to_string()],
                ));
            }
        }
        None
    }

    async fn model_check(
        &self,
        model: &dyn ChatModel,
        sanitized: &str,
        original: &str,
    ) -> quill_core::Result<ValidationReport> {
        let system_prompt = "You are a query validator for a video transcript search system.\n\
            Evaluate if the query is:\n\
            1. Related to video/transcript content (not asking about unrelated topics)\n\
            2. Clear and answerable\n\
            3. Appropriate (not harmful or offensive)\n\n\
            Respond with JSON only:\n\
            {\n\
                \"is_valid\": true/false,\n\
                \"status\": \"valid\" | \"off_topic\" | \"needs_clarification\",\n\
                \"message\": \"brief explanation\",\n\
                \"suggestions\": [\"suggestion1\", \"suggestion2\"] (if not valid)\n\
            }";

        let reply = model
            .generate(
                system_prompt,
                &format!("Validate this query: {sanitized}"),
                &GenerationConfig::new(200, 0.1),
            )
            .await?;

        let body = JSON_FENCE
            .captures(&reply)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(reply.as_str());

        match serde_json::from_str::<ModelVerdict>(body) {
            Ok(verdict) => {
                let status = match verdict.status.as_deref() {
                    Some("off_topic") => ValidationStatus::OffTopic,
                    Some("needs_clarification") => ValidationStatus::NeedsClarification,
                    Some("invalid") => ValidationStatus::Invalid,
                    _ => ValidationStatus::Valid,
                };
                Ok(ValidationReport {
                    status,
                    is_valid: verdict.is_valid,
                    original_query: original.to_string(),
                    sanitized_query: None,
                    message: verdict.message,
                    suggestions: verdict.suggestions,
                    confidence: 0.9,
                })
            }
            Err(_) => {
                // Fail open: a verdict we cannot parse must not block the user.
                warn!("unparseable model validation verdict, assuming valid");
                Ok(ValidationReport {
                    status: ValidationStatus::Valid,
                    is_valid: true,
                    original_query: original.to_string(),
                    sanitized_query: None,
                    message: "Model validation inconclusive, assuming valid".to_string(),
                    suggestions: Vec::new(),
                    confidence: 0.7,
                })
            }
        }
    }

    /// Ask the model for up to three improved phrasings of a question.
    ///
    /// Returns an empty list without a model or when the call fails.
    pub async fn suggest_improvements(&self, query: &str) -> Vec<String> {
        let Some(model) = &self.model else {
            return Vec::new();
        };

        let system_prompt = "You help users improve their search queries for a video transcript system.\n\
            Given a query, suggest 2-3 improved versions that are:\n\
            - More specific\n\
            - Clearer\n\
            - More likely to find relevant results\n\n\
            Respond with just the suggestions, one per line.";

        match model
            .generate(
                system_prompt,
                &format!("Improve this query: {query}"),
                &GenerationConfig::new(150, 0.7),
            )
            .await
        {
            Ok(reply) => reply
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(3)
                .map(String::from)
                .collect(),
            Err(e) => {
                warn!(error = %e, "failed to generate suggestions");
                Vec::new()
            }
        }
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim, collapse whitespace runs, and strip unsafe punctuation.
fn sanitize(query: &str) -> String {
    let collapsed = WHITESPACE_RUNS.replace_all(query.trim(), " ");
    UNSAFE_CHARS.replace_all(&collapsed, "").into_owned()
}
