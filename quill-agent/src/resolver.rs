//! The query resolver: classify, search, decide, synthesize.
//!
//! Each call runs the same stateless sequence: classify the question's
//! complexity from ordered keyword rules, retrieve candidate chunks, then
//! either answer directly from the retrieved context or hand the question
//! off to the deep-analysis path when it is complex and the evidence is
//! weak.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use quill_core::{ChatModel, GenerationConfig};
use quill_rag::{Retriever, SearchHit};

use crate::error::{AgentError, Result};

/// Average-score floor below which a complex query is handed off instead
/// of synthesized.
const HANDOFF_SCORE_THRESHOLD: f32 = 0.5;

/// The fixed answer returned when retrieval finds nothing.
const NO_RESULTS_ANSWER: &str =
    "I couldn't find any relevant information in the transcripts to answer your question.";

/// Indicators of analysis-style questions. Checked after the
/// multi-transcript indicators; order within the list does not matter,
/// order between the rule groups does.
const COMPLEX_INDICATORS: [&str; 11] = [
    "compare",
    "contrast",
    "analyze",
    "relationship",
    "trend",
    "pattern",
    "correlation",
    "difference",
    "how does",
    "why does",
    "explain why",
];

/// Indicators that a question spans the whole corpus.
const MULTI_TRANSCRIPT_INDICATORS: [&str; 6] =
    ["all videos", "across", "throughout", "every transcript", "multiple", "different videos"];

/// Question complexity tiers, from single-fact lookup to cross-corpus
/// analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    /// Single fact lookup.
    Simple,
    /// Multi-fact synthesis.
    Moderate,
    /// Requires analysis or reasoning.
    Complex,
    /// Cross-transcript analysis.
    MultiTranscript,
}

impl fmt::Display for QueryComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::MultiTranscript => "multi_transcript",
        };
        f.write_str(label)
    }
}

/// Classify a question's complexity with ordered first-match-wins rules.
///
/// Multi-transcript indicators are checked before analytic ones, so
/// "compare X across all videos" classifies as
/// [`QueryComplexity::MultiTranscript`], not `Complex`. The order is part
/// of the contract; downstream handoff behavior depends on it.
pub fn classify_complexity(query: &str) -> QueryComplexity {
    let query_lower = query.to_lowercase();

    if MULTI_TRANSCRIPT_INDICATORS.iter().any(|needle| query_lower.contains(needle)) {
        return QueryComplexity::MultiTranscript;
    }
    if COMPLEX_INDICATORS.iter().any(|needle| query_lower.contains(needle)) {
        return QueryComplexity::Complex;
    }
    if query.matches('?').count() > 1 || query_lower.contains(" and ") {
        return QueryComplexity::Moderate;
    }
    QueryComplexity::Simple
}

/// Where a resolution was deferred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandoffTarget {
    /// The deep-analysis path ([`DeepAnalyzer`](crate::DeepAnalyzer)).
    DeepAnalysis,
}

/// A source reference attached to an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// The document the chunk came from.
    pub document_id: String,
    /// The chunk's position within its document.
    pub chunk_index: usize,
    /// Similarity score, rounded to 4 decimals.
    pub score: f32,
    /// The first 200 characters of the chunk.
    pub preview: String,
}

/// The result of resolving one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOutcome {
    /// The question as asked.
    pub query: String,
    /// The synthesized answer; empty when handed off.
    pub answer: String,
    /// References to the chunks the answer draws on.
    pub sources: Vec<SourceRef>,
    /// Mean similarity score of the sources used, capped at 1.0.
    pub confidence: f32,
    /// The classified complexity tier.
    pub complexity: QueryComplexity,
    /// Step-by-step trace; empty unless requested.
    pub reasoning_steps: Vec<String>,
    /// Set exactly when the handoff policy fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff_to: Option<HandoffTarget>,
}

/// Resolves questions against indexed transcripts.
///
/// Owns no state between calls; both collaborators are injected and shared.
///
/// # Example
///
/// ```rust,ignore
/// use quill_agent::QueryResolver;
///
/// let resolver = QueryResolver::new(engine.clone(), model.clone());
/// let outcome = resolver.resolve("What was said about pricing?", None, false).await?;
/// println!("{} ({} sources)", outcome.answer, outcome.sources.len());
/// ```
pub struct QueryResolver {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ChatModel>,
    max_sources: usize,
}

impl QueryResolver {
    /// Create a resolver over the given retriever and model.
    pub fn new(retriever: Arc<dyn Retriever>, model: Arc<dyn ChatModel>) -> Self {
        Self { retriever, model, max_sources: 5 }
    }

    /// Set the maximum number of source chunks per answer.
    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    /// Resolve a question.
    ///
    /// `document_ids` restricts retrieval to those documents. When
    /// `include_reasoning` is set, the outcome carries a step-by-step trace.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] if search fails and
    /// [`AgentError::Synthesis`] if the model call fails; an empty search
    /// result is not an error but a fixed "nothing found" answer.
    pub async fn resolve(
        &self,
        query: &str,
        document_ids: Option<&[String]>,
        include_reasoning: bool,
    ) -> Result<ResolverOutcome> {
        info!(query_len = query.len(), "resolving query");
        let mut reasoning = Vec::new();

        let complexity = classify_complexity(query);
        reasoning.push(format!("Query complexity: {complexity}"));
        if complexity == QueryComplexity::Complex {
            reasoning.push("Complex query detected, may need deep analysis".to_string());
        }

        let hits = self.retriever.search(query, self.max_sources, document_ids, 0.0).await?;
        reasoning.push(format!("Found {} relevant chunks", hits.len()));

        if hits.is_empty() {
            info!("no relevant chunks found");
            return Ok(ResolverOutcome {
                query: query.to_string(),
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
                confidence: 0.0,
                complexity,
                reasoning_steps: if include_reasoning { reasoning } else { Vec::new() },
                handoff_to: None,
            });
        }

        let avg_score =
            (hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32).min(1.0);
        reasoning.push(format!("Average relevance score: {avg_score:.2}"));

        // The only handoff trigger: complex question, weak evidence.
        if complexity == QueryComplexity::Complex && avg_score < HANDOFF_SCORE_THRESHOLD {
            info!(avg_score, "handing off to deep analysis");
            reasoning.push("Handing off to deep analysis".to_string());
            return Ok(ResolverOutcome {
                query: query.to_string(),
                answer: String::new(),
                sources: format_sources(&hits),
                confidence: avg_score,
                complexity,
                reasoning_steps: if include_reasoning { reasoning } else { Vec::new() },
                handoff_to: Some(HandoffTarget::DeepAnalysis),
            });
        }

        let context = build_context(&hits);
        let user_prompt =
            format!("Context from transcripts:\n\n{context}\n\n---\n\nQuestion: {query}\n\nAnswer:");
        let answer = self
            .model
            .generate(system_prompt_for(complexity), &user_prompt, &GenerationConfig::new(1000, 0.3))
            .await
            .map_err(|e| AgentError::Synthesis {
                agent: "query-resolver",
                message: e.to_string(),
            })?;
        reasoning.push("Generated answer from context".to_string());

        Ok(ResolverOutcome {
            query: query.to_string(),
            answer,
            sources: format_sources(&hits),
            confidence: avg_score,
            complexity,
            reasoning_steps: if include_reasoning { reasoning } else { Vec::new() },
            handoff_to: None,
        })
    }

    /// Retrieve an over-fetched context package for a handoff.
    ///
    /// Fetches twice the usual source count so the deep-analysis path has
    /// more material to group and compare.
    pub async fn handoff_context(
        &self,
        query: &str,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<SearchHit>> {
        let hits =
            self.retriever.search(query, self.max_sources * 2, document_ids, 0.0).await?;
        Ok(hits)
    }
}

/// The system prompt for a complexity tier.
fn system_prompt_for(complexity: QueryComplexity) -> &'static str {
    match complexity {
        QueryComplexity::Complex => {
            "You are an expert analyst answering questions based on video transcript content.\n\n\
             For complex questions:\n\
             - Analyze the information thoroughly\n\
             - Consider multiple perspectives\n\
             - Draw connections between different parts of the content\n\
             - Provide structured, detailed answers\n\
             - Cite sources when making claims\n\n\
             If information is insufficient, explain what's missing."
        }
        QueryComplexity::MultiTranscript => {
            "You are an assistant answering questions across multiple video transcripts.\n\n\
             - Synthesize information from all provided sources\n\
             - Note any differences or contradictions between sources\n\
             - Clearly attribute information to specific transcripts\n\
             - Provide a comprehensive overview"
        }
        QueryComplexity::Simple | QueryComplexity::Moderate => {
            "You are a helpful assistant answering questions based on video transcript content.\n\n\
             Rules:\n\
             - Only answer based on the provided context\n\
             - If the context doesn't contain relevant information, say so\n\
             - Cite sources when possible (e.g., \"According to Source 1...\")\n\
             - Be concise but thorough"
        }
    }
}

/// Build the numbered context block handed to the model.
fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[Source {}: {} (relevance: {:.2})]\n{}",
                i + 1,
                hit.metadata.document_id,
                hit.score,
                hit.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Format hits as source references: 4-decimal scores, 200-char previews.
fn format_sources(hits: &[SearchHit]) -> Vec<SourceRef> {
    hits.iter()
        .map(|hit| SourceRef {
            document_id: hit.metadata.document_id.clone(),
            chunk_index: hit.metadata.chunk_index,
            score: round4(hit.score),
            preview: format!("{}...", hit.content.chars().take(200).collect::<String>()),
        })
        .collect()
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubRetriever, hit};
    use quill_core::MockChat;

    fn resolver_with(hits: Vec<SearchHit>, model: Arc<MockChat>) -> QueryResolver {
        QueryResolver::new(Arc::new(StubRetriever::new(hits)), model)
    }

    #[test]
    fn classification_rules_fire_in_order() {
        assert_eq!(classify_complexity("What is the talk about?"), QueryComplexity::Simple);
        assert_eq!(
            classify_complexity("What is covered? And who presents it?"),
            QueryComplexity::Moderate
        );
        assert_eq!(
            classify_complexity("Compare how the two talks discuss pricing"),
            QueryComplexity::Complex
        );
        assert_eq!(
            classify_complexity("What themes appear across all videos?"),
            QueryComplexity::MultiTranscript
        );
        // Multi-transcript indicators win over analytic ones.
        assert_eq!(
            classify_complexity("Compare the pricing advice across every transcript"),
            QueryComplexity::MultiTranscript
        );
        // Multiple question marks alone only reach Moderate.
        assert_eq!(
            classify_complexity("Who spoke first? Who spoke last?"),
            QueryComplexity::Moderate
        );
    }

    #[tokio::test]
    async fn weak_complex_query_hands_off_without_calling_the_model() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(
            vec![hit("talk_a", 0, 0.42), hit("talk_b", 1, 0.42)],
            model.clone(),
        );

        let outcome = resolver
            .resolve("Compare how the two talks discuss pricing", None, true)
            .await
            .unwrap();

        assert_eq!(outcome.complexity, QueryComplexity::Complex);
        assert_eq!(outcome.handoff_to, Some(HandoffTarget::DeepAnalysis));
        assert!(outcome.answer.is_empty());
        assert_eq!(outcome.sources.len(), 2);
        assert!((outcome.confidence - 0.42).abs() < 1e-4);
        assert!(model.calls().is_empty());
        assert!(outcome.reasoning_steps.iter().any(|s| s.contains("Handing off")));
    }

    #[tokio::test]
    async fn strong_complex_query_synthesizes_instead() {
        let model = Arc::new(MockChat::new().with_response("The talks agree on tiered pricing."));
        let resolver = resolver_with(
            vec![hit("talk_a", 0, 0.61), hit("talk_b", 1, 0.61)],
            model.clone(),
        );

        let outcome = resolver
            .resolve("Compare how the two talks discuss pricing", None, false)
            .await
            .unwrap();

        assert_eq!(outcome.handoff_to, None);
        assert_eq!(outcome.answer, "The talks agree on tiered pricing.");
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn weak_simple_query_never_hands_off() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(vec![hit("talk_a", 0, 0.2)], model.clone());

        let outcome = resolver.resolve("What is the talk about?", None, false).await.unwrap();

        assert_eq!(outcome.handoff_to, None);
        assert!(!outcome.answer.is_empty());
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn no_results_returns_the_fixed_answer_without_a_model_call() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(Vec::new(), model.clone());

        let outcome = resolver.resolve("What about pricing?", None, false).await.unwrap();

        assert_eq!(outcome.answer, NO_RESULTS_ANSWER);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.sources.is_empty());
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn system_prompt_matches_the_complexity_tier() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(vec![hit("talk_a", 0, 0.9)], model.clone());

        resolver.resolve("Analyze the speaker's argument", None, false).await.unwrap();
        resolver.resolve("What themes appear across all videos?", None, false).await.unwrap();
        resolver.resolve("What is the talk about?", None, false).await.unwrap();

        let calls = model.calls();
        assert!(calls[0].system_prompt.starts_with("You are an expert analyst"));
        assert!(calls[1].system_prompt.contains("across multiple video transcripts"));
        assert!(calls[2].system_prompt.starts_with("You are a helpful assistant"));
        assert_eq!(calls[0].config.max_tokens, 1000);
    }

    #[tokio::test]
    async fn context_block_numbers_sources_with_relevance() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(
            vec![hit("talk_a", 0, 0.75), hit("talk_b", 3, 0.5)],
            model.clone(),
        );

        resolver.resolve("What is the talk about?", None, false).await.unwrap();

        let user_prompt = &model.calls()[0].user_prompt;
        assert!(user_prompt.starts_with("Context from transcripts:\n\n"));
        assert!(user_prompt.contains("[Source 1: talk_a (relevance: 0.75)]"));
        assert!(user_prompt.contains("[Source 2: talk_b (relevance: 0.50)]"));
        assert!(user_prompt.contains("\n\n---\n\n"));
        assert!(user_prompt.ends_with("Question: What is the talk about?\n\nAnswer:"));
    }

    #[tokio::test]
    async fn sources_carry_rounded_scores_and_previews() {
        let model = Arc::new(MockChat::new());
        let mut long_hit = hit("talk_a", 2, 0.123456);
        long_hit.content = "x".repeat(500);
        let resolver = resolver_with(vec![long_hit], model);

        let outcome = resolver.resolve("What is the talk about?", None, false).await.unwrap();

        let source = &outcome.sources[0];
        assert_eq!(source.document_id, "talk_a");
        assert_eq!(source.chunk_index, 2);
        assert_eq!(source.score, 0.1235);
        assert_eq!(source.preview.chars().count(), 203);
        assert!(source.preview.ends_with("..."));
    }

    #[tokio::test]
    async fn confidence_is_capped_at_one() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(vec![hit("talk_a", 0, 1.2)], model);

        let outcome = resolver.resolve("What is the talk about?", None, false).await.unwrap();
        assert!(outcome.confidence <= 1.0);
    }

    #[tokio::test]
    async fn reasoning_steps_are_omitted_unless_requested() {
        let model = Arc::new(MockChat::new());
        let resolver = resolver_with(vec![hit("talk_a", 0, 0.8)], model);

        let silent = resolver.resolve("What is the talk about?", None, false).await.unwrap();
        assert!(silent.reasoning_steps.is_empty());

        let traced = resolver.resolve("What is the talk about?", None, true).await.unwrap();
        assert!(traced.reasoning_steps.iter().any(|s| s.starts_with("Query complexity:")));
        assert!(traced.reasoning_steps.iter().any(|s| s.contains("relevant chunks")));
    }

    #[tokio::test]
    async fn model_failure_surfaces_as_a_synthesis_error() {
        let model = Arc::new(MockChat::failing("service unavailable"));
        let resolver = resolver_with(vec![hit("talk_a", 0, 0.8)], model);

        let err = resolver.resolve("What is the talk about?", None, false).await.unwrap_err();
        assert!(matches!(err, AgentError::Synthesis { agent: "query-resolver", .. }));
    }
}
