//! The deep-analysis path: specialized multi-mode analysis over retrieved
//! transcript content.
//!
//! Invoked directly or via resolver handoff. The mode is detected from the
//! question (or supplied explicitly), each mode runs one system-prompted
//! model call over a bounded context window, and up to five "insight"
//! lines are pulled out of the answer afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use quill_core::{ChatModel, GenerationConfig};
use quill_rag::{Retriever, SearchHit};

use crate::error::{AgentError, Result};

/// Insight lines at or below this length are discarded as noise.
const MIN_INSIGHT_LENGTH: usize = 20;

/// At most this many insights are extracted per analysis.
const MAX_INSIGHTS: usize = 5;

/// Chunks from one document used in a comparison context block.
const COMPARISON_CHUNKS_PER_DOCUMENT: usize = 3;

/// The closed set of analysis modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Cross-document comparison.
    Comparison,
    /// Trends and recurring patterns.
    Trend,
    /// Comprehensive summary.
    Summary,
    /// Extraction of specific items.
    Extraction,
    /// Sentiment and tone.
    Sentiment,
    /// Topics and themes; runs the general analysis prompt.
    TopicModeling,
}

impl AnalysisType {
    /// Detect the analysis mode from question keywords.
    ///
    /// Rules fire in order; questions matching nothing default to
    /// [`AnalysisType::Summary`].
    pub fn detect(query: &str) -> Self {
        let query_lower = query.to_lowercase();
        let matches_any =
            |needles: &[&str]| needles.iter().any(|needle| query_lower.contains(needle));

        if matches_any(&["compare", "difference", "versus", "vs"]) {
            Self::Comparison
        } else if matches_any(&["trend", "over time", "change", "evolution"]) {
            Self::Trend
        } else if matches_any(&["summarize", "summary", "overview", "main points"]) {
            Self::Summary
        } else if matches_any(&["extract", "list", "find all", "identify"]) {
            Self::Extraction
        } else if matches_any(&["sentiment", "tone", "feeling", "emotion"]) {
            Self::Sentiment
        } else if matches_any(&["topic", "theme", "subject", "about"]) {
            Self::TopicModeling
        } else {
            Self::Summary
        }
    }
}

/// Per-mode prompt profile: the system prompt, how the user prompt frames
/// the content, the sampling parameters, and the mode's confidence prior.
struct ModeProfile {
    system_prompt: &'static str,
    user_lead: &'static str,
    query_label: &'static str,
    max_tokens: u32,
    temperature: f32,
    confidence: f32,
}

impl AnalysisType {
    fn profile(self) -> ModeProfile {
        match self {
            Self::Comparison => ModeProfile {
                system_prompt: "You are an expert analyst performing comparison analysis on video transcripts.\n\n\
                    Provide a structured comparison that includes:\n\
                    1. Key similarities between the sources\n\
                    2. Notable differences\n\
                    3. Unique points in each source\n\
                    4. Overall synthesis\n\n\
                    Format your response as clear sections with bullet points.",
                user_lead: "Compare the following transcript content:",
                query_label: "Comparison query:",
                max_tokens: 1500,
                temperature: 0.3,
                confidence: 0.85,
            },
            Self::Trend => ModeProfile {
                system_prompt: "You are an analyst identifying trends and patterns in video transcript content.\n\n\
                    Analyze for:\n\
                    1. Recurring themes or topics\n\
                    2. Changes or evolution in discussion\n\
                    3. Patterns in how topics are addressed\n\
                    4. Any temporal progression if evident\n\n\
                    Provide specific examples from the content to support your findings.",
                user_lead: "Analyze trends in:",
                query_label: "Query:",
                max_tokens: 1200,
                temperature: 0.3,
                confidence: 0.8,
            },
            Self::Summary => ModeProfile {
                system_prompt: "You are an expert summarizer for video transcript content.\n\n\
                    Create a comprehensive summary that includes:\n\
                    1. Main topics covered\n\
                    2. Key points and takeaways\n\
                    3. Important details or facts mentioned\n\
                    4. Any conclusions or recommendations\n\n\
                    Structure the summary with clear headings and bullet points.",
                user_lead: "Summarize the following content:",
                query_label: "Focus on:",
                max_tokens: 1500,
                temperature: 0.3,
                confidence: 0.9,
            },
            Self::Extraction => ModeProfile {
                system_prompt: "You are a data extraction specialist.\n\n\
                    Extract the requested information from the transcript content.\n\
                    - Be thorough and find all instances\n\
                    - Format as a clear list\n\
                    - Include context for each extracted item\n\
                    - Note the source when possible",
                user_lead: "Extract from this content:",
                query_label: "Extraction request:",
                max_tokens: 1200,
                temperature: 0.2,
                confidence: 0.85,
            },
            Self::Sentiment => ModeProfile {
                system_prompt: "You are a sentiment and tone analyst.\n\n\
                    Analyze the content for:\n\
                    1. Overall sentiment (positive, negative, neutral, mixed)\n\
                    2. Emotional tone (enthusiastic, serious, casual, etc.)\n\
                    3. Speaker attitude toward topics\n\
                    4. Any notable shifts in sentiment\n\n\
                    Provide specific examples to support your analysis.",
                user_lead: "Analyze sentiment in:",
                query_label: "Focus:",
                max_tokens: 1000,
                temperature: 0.3,
                confidence: 0.75,
            },
            Self::TopicModeling => ModeProfile {
                system_prompt: "You are an expert analyst for video transcript content.\n\
                    Provide thorough, well-structured analysis based on the content provided.\n\
                    Support your findings with specific examples from the text.",
                user_lead: "Analyze this content:",
                query_label: "Analysis request:",
                max_tokens: 1200,
                temperature: 0.3,
                confidence: 0.8,
            },
        }
    }
}

/// Mode-specific analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutput {
    /// A structured comparison across documents.
    Comparison {
        comparison: String,
        documents_compared: Vec<String>,
    },
    /// Trend and pattern findings.
    Trend { trend_analysis: String },
    /// A comprehensive summary.
    Summary { summary: String },
    /// Extracted content with parsed list items.
    Extraction {
        extracted_content: String,
        items: Vec<String>,
    },
    /// Sentiment and tone findings.
    Sentiment { sentiment_analysis: String },
    /// General analysis (topic modeling and anything unrouted).
    General { analysis: String },
    /// Nothing to analyze.
    Unavailable { message: String },
}

/// Extra facts about an analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Number of distinct documents involved (comparison mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_count: Option<usize>,
}

/// The result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Whether the analysis produced a result.
    pub success: bool,
    /// The mode that ran.
    pub analysis_type: AnalysisType,
    /// The question as asked.
    pub query: String,
    /// The mode-specific output.
    pub result: AnalysisOutput,
    /// Up to five key insight lines pulled from the answer.
    pub insights: Vec<String>,
    /// Number of chunks the analysis drew on.
    pub sources_used: usize,
    /// The mode's fixed confidence prior (not a computed statistic).
    pub confidence: f32,
    /// Extra facts about the run.
    pub metadata: AnalysisMetadata,
}

/// Runs deep analysis over retrieved transcript content.
///
/// # Example
///
/// ```rust,ignore
/// use quill_agent::{AnalysisType, DeepAnalyzer};
///
/// let analyzer = DeepAnalyzer::new(engine.clone(), model.clone());
/// let report = analyzer
///     .analyze("Compare the two talks on pricing", None, None, None)
///     .await?;
/// println!("{:?}: {} insights", report.analysis_type, report.insights.len());
/// ```
pub struct DeepAnalyzer {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ChatModel>,
    max_chunks: usize,
}

impl DeepAnalyzer {
    /// Create an analyzer over the given retriever and model.
    pub fn new(retriever: Arc<dyn Retriever>, model: Arc<dyn ChatModel>) -> Self {
        Self { retriever, model, max_chunks: 10 }
    }

    /// Set the maximum number of chunks fed into one analysis.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Analyze transcript content.
    ///
    /// `context` supplies pre-retrieved hits (the handoff path); without it
    /// the analyzer searches for its own. The mode is detected from the
    /// question unless `analysis_type` is supplied.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Retrieval`] if search fails and
    /// [`AgentError::Synthesis`] if the model call fails. Malformed model
    /// output only degrades the insight list, never the whole analysis.
    pub async fn analyze(
        &self,
        query: &str,
        context: Option<Vec<SearchHit>>,
        document_ids: Option<&[String]>,
        analysis_type: Option<AnalysisType>,
    ) -> Result<AnalysisReport> {
        let analysis_type = analysis_type.unwrap_or_else(|| AnalysisType::detect(query));
        info!(?analysis_type, "running analysis");

        let hits = match context {
            Some(hits) => hits,
            None => self.retriever.search(query, self.max_chunks, document_ids, 0.0).await?,
        };

        match analysis_type {
            AnalysisType::Comparison => self.comparison(query, &hits).await,
            other => self.single_pass(other, query, &hits).await,
        }
    }

    /// Comparison mode: group content by document and compare.
    async fn comparison(&self, query: &str, hits: &[SearchHit]) -> Result<AnalysisReport> {
        if hits.is_empty() {
            return Ok(AnalysisReport {
                success: false,
                analysis_type: AnalysisType::Comparison,
                query: query.to_string(),
                result: AnalysisOutput::Unavailable {
                    message: "No content found for comparison".to_string(),
                },
                insights: Vec::new(),
                sources_used: 0,
                confidence: 0.0,
                metadata: AnalysisMetadata::default(),
            });
        }

        // Group chunk content by document, preserving encounter order.
        let mut order: Vec<&str> = Vec::new();
        let mut grouped: Vec<Vec<&str>> = Vec::new();
        for hit in hits {
            let document_id = hit.metadata.document_id.as_str();
            match order.iter().position(|&id| id == document_id) {
                Some(i) => grouped[i].push(hit.content.as_str()),
                None => {
                    order.push(document_id);
                    grouped.push(vec![hit.content.as_str()]);
                }
            }
        }

        let mut context_text = String::new();
        for (document_id, contents) in order.iter().zip(&grouped) {
            context_text.push_str(&format!("\n\n=== Transcript: {document_id} ===\n"));
            let capped = &contents[..contents.len().min(COMPARISON_CHUNKS_PER_DOCUMENT)];
            context_text.push_str(&capped.join("\n---\n"));
        }

        let profile = AnalysisType::Comparison.profile();
        let user_prompt =
            format!("{}\n{}\n\n{} {}", profile.user_lead, context_text, profile.query_label, query);
        let answer = self.generate(&profile, &user_prompt).await?;

        Ok(AnalysisReport {
            success: true,
            analysis_type: AnalysisType::Comparison,
            query: query.to_string(),
            insights: extract_insights(&answer),
            sources_used: hits.len(),
            confidence: profile.confidence,
            metadata: AnalysisMetadata { document_count: Some(order.len()) },
            result: AnalysisOutput::Comparison {
                comparison: answer,
                documents_compared: order.into_iter().map(String::from).collect(),
            },
        })
    }

    /// All non-comparison modes: one prompt over a flat context block.
    async fn single_pass(
        &self,
        analysis_type: AnalysisType,
        query: &str,
        hits: &[SearchHit],
    ) -> Result<AnalysisReport> {
        let profile = analysis_type.profile();
        let context_text = build_context_text(hits, self.max_chunks);
        let user_prompt =
            format!("{}\n{}\n\n{} {}", profile.user_lead, context_text, profile.query_label, query);
        let answer = self.generate(&profile, &user_prompt).await?;

        let (result, insights) = match analysis_type {
            AnalysisType::Trend => {
                (AnalysisOutput::Trend { trend_analysis: answer.clone() }, extract_insights(&answer))
            }
            AnalysisType::Summary => {
                (AnalysisOutput::Summary { summary: answer.clone() }, extract_insights(&answer))
            }
            AnalysisType::Extraction => {
                let items = parse_list_items(&answer);
                // Extraction reports its items directly; no insight pass.
                (AnalysisOutput::Extraction { extracted_content: answer, items }, Vec::new())
            }
            AnalysisType::Sentiment => (
                AnalysisOutput::Sentiment { sentiment_analysis: answer.clone() },
                extract_insights(&answer),
            ),
            AnalysisType::TopicModeling => {
                (AnalysisOutput::General { analysis: answer.clone() }, extract_insights(&answer))
            }
            AnalysisType::Comparison => unreachable!("comparison has its own path"),
        };

        Ok(AnalysisReport {
            success: true,
            analysis_type,
            query: query.to_string(),
            result,
            insights,
            sources_used: hits.len(),
            confidence: profile.confidence,
            metadata: AnalysisMetadata::default(),
        })
    }

    async fn generate(&self, profile: &ModeProfile, user_prompt: &str) -> Result<String> {
        self.model
            .generate(
                profile.system_prompt,
                user_prompt,
                &GenerationConfig::new(profile.max_tokens, profile.temperature),
            )
            .await
            .map_err(|e| AgentError::Synthesis { agent: "deep-analyzer", message: e.to_string() })
    }
}

/// Build the flat context block for non-comparison modes.
fn build_context_text(hits: &[SearchHit], max_chunks: usize) -> String {
    hits.iter()
        .take(max_chunks)
        .enumerate()
        .map(|(i, hit)| format!("[Source {}: {}]\n{}", i + 1, hit.metadata.document_id, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Lines that look like list items in a model answer.
fn parse_list_items(text: &str) -> Vec<String> {
    let items: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.starts_with('-')
                || line.starts_with('•')
                || line.starts_with('*')
                || line.starts_with('1')
                || line.starts_with('2')
                || line.starts_with('3')
        })
        .map(String::from)
        .collect();

    if items.is_empty() { vec![text.to_string()] } else { items }
}

/// Pull up to [`MAX_INSIGHTS`] bullet or numbered lines out of an answer,
/// stripping the list prefix and dropping short fragments. Tolerates any
/// answer shape: prose without list markers just yields no insights.
fn extract_insights(text: &str) -> Vec<String> {
    let mut insights = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let is_bullet = line.starts_with('-') || line.starts_with('•') || line.starts_with('*');
        let is_numbered = {
            let chars: Vec<char> = line.chars().take(2).collect();
            chars.len() == 2 && chars[0].is_ascii_digit() && matches!(chars[1], '.' | ')' | ':')
        };
        if !is_bullet && !is_numbered {
            continue;
        }

        let insight = line
            .trim_start_matches(['-', '•', '*', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ')', ':', ' '])
            .trim();
        if insight.chars().count() > MIN_INSIGHT_LENGTH {
            insights.push(insight.to_string());
        }
        if insights.len() == MAX_INSIGHTS {
            break;
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubRetriever, hit};
    use quill_core::MockChat;

    fn analyzer_with(hits: Vec<SearchHit>, model: Arc<MockChat>) -> DeepAnalyzer {
        DeepAnalyzer::new(Arc::new(StubRetriever::new(hits)), model)
    }

    #[test]
    fn mode_detection_follows_keyword_rules_in_order() {
        assert_eq!(AnalysisType::detect("Compare the two talks"), AnalysisType::Comparison);
        assert_eq!(AnalysisType::detect("How did the tone change?"), AnalysisType::Trend);
        assert_eq!(AnalysisType::detect("Give me an overview"), AnalysisType::Summary);
        assert_eq!(AnalysisType::detect("List every product mentioned"), AnalysisType::Extraction);
        assert_eq!(AnalysisType::detect("What was the speaker's emotion?"), AnalysisType::Sentiment);
        assert_eq!(AnalysisType::detect("What themes come up?"), AnalysisType::TopicModeling);
        assert_eq!(AnalysisType::detect("Tell me more"), AnalysisType::Summary);
        // Comparison outranks later rules when keywords collide.
        assert_eq!(
            AnalysisType::detect("Compare the sentiment of the talks"),
            AnalysisType::Comparison
        );
    }

    #[test]
    fn insights_come_from_list_lines_and_skip_short_ones() {
        let answer = "Here are the findings:\n\
            - The speakers agree on the pricing direction overall\n\
            - Too short\n\
            1. The second talk spends more time on enterprise deals\n\
            2) Customer churn is mentioned in both talks repeatedly\n\
            Some closing prose that is not a list item at all.";

        let insights = extract_insights(answer);
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0], "The speakers agree on the pricing direction overall");
        assert_eq!(insights[1], "The second talk spends more time on enterprise deals");
        assert_eq!(insights[2], "Customer churn is mentioned in both talks repeatedly");
    }

    #[test]
    fn insights_are_capped_at_five() {
        let answer = (0..8)
            .map(|i| format!("- Finding number {i} with enough words to pass the filter"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(extract_insights(&answer).len(), 5);
    }

    #[test]
    fn prose_answers_yield_no_insights() {
        assert!(extract_insights("A flat paragraph with no list structure anywhere.").is_empty());
    }

    #[tokio::test]
    async fn summary_mode_uses_its_prompt_and_confidence_prior() {
        let model = Arc::new(MockChat::new().with_response("- The talk covers pricing strategy at length"));
        let analyzer = analyzer_with(vec![hit("talk_a", 0, 0.8)], model.clone());

        let report = analyzer.analyze("Summarize the talk", None, None, None).await.unwrap();

        assert!(report.success);
        assert_eq!(report.analysis_type, AnalysisType::Summary);
        assert_eq!(report.confidence, 0.9);
        assert_eq!(report.sources_used, 1);
        assert_eq!(report.insights.len(), 1);
        assert!(matches!(report.result, AnalysisOutput::Summary { .. }));

        let call = &model.calls()[0];
        assert!(call.system_prompt.starts_with("You are an expert summarizer"));
        assert!(call.user_prompt.starts_with("Summarize the following content:"));
        assert!(call.user_prompt.contains("[Source 1: talk_a]"));
        assert_eq!(call.config.max_tokens, 1500);
    }

    #[tokio::test]
    async fn sentiment_and_trend_have_their_own_priors() {
        let model = Arc::new(MockChat::new());
        let analyzer = analyzer_with(vec![hit("talk_a", 0, 0.8)], model);

        let sentiment = analyzer
            .analyze("What was the tone?", None, None, Some(AnalysisType::Sentiment))
            .await
            .unwrap();
        assert_eq!(sentiment.confidence, 0.75);
        assert!(matches!(sentiment.result, AnalysisOutput::Sentiment { .. }));

        let analyzer = analyzer_with(vec![hit("talk_a", 0, 0.8)], Arc::new(MockChat::new()));
        let trend = analyzer
            .analyze("ignored", None, None, Some(AnalysisType::Trend))
            .await
            .unwrap();
        assert_eq!(trend.confidence, 0.8);
    }

    #[tokio::test]
    async fn comparison_groups_content_by_document_and_caps_chunks() {
        let model = Arc::new(MockChat::new().with_response("- Both talks discuss pricing in their opening sections"));
        let mut hits = vec![
            hit("talk_a", 0, 0.9),
            hit("talk_b", 0, 0.8),
            hit("talk_a", 1, 0.7),
            hit("talk_a", 2, 0.6),
            hit("talk_a", 3, 0.5),
        ];
        hits[4].content = "chunk four of talk_a".to_string();
        let analyzer = analyzer_with(hits, model.clone());

        let report = analyzer
            .analyze("Compare the talks", None, None, None)
            .await
            .unwrap();

        assert_eq!(report.analysis_type, AnalysisType::Comparison);
        assert_eq!(report.confidence, 0.85);
        assert_eq!(report.metadata.document_count, Some(2));
        assert_eq!(report.sources_used, 5);
        match &report.result {
            AnalysisOutput::Comparison { documents_compared, .. } => {
                assert_eq!(documents_compared, &["talk_a".to_string(), "talk_b".to_string()]);
            }
            other => panic!("unexpected output: {other:?}"),
        }

        let user_prompt = &model.calls()[0].user_prompt;
        assert!(user_prompt.contains("=== Transcript: talk_a ==="));
        assert!(user_prompt.contains("=== Transcript: talk_b ==="));
        // Only three chunks per document make it into the prompt.
        assert!(!user_prompt.contains("chunk four of talk_a"));
    }

    #[tokio::test]
    async fn comparison_with_no_content_is_unsuccessful_but_not_an_error() {
        let model = Arc::new(MockChat::new());
        let analyzer = analyzer_with(Vec::new(), model.clone());

        let report = analyzer
            .analyze("Compare the talks", None, None, None)
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.confidence, 0.0);
        assert!(matches!(report.result, AnalysisOutput::Unavailable { .. }));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn extraction_parses_list_items_and_skips_insights() {
        let model = Arc::new(MockChat::new().with_response(
            "- Product Alpha mentioned at the start\n- Product Beta in the close\nSome prose.",
        ));
        let analyzer = analyzer_with(vec![hit("talk_a", 0, 0.8)], model);

        let report = analyzer
            .analyze("List every product mentioned", None, None, None)
            .await
            .unwrap();

        assert_eq!(report.analysis_type, AnalysisType::Extraction);
        assert!(report.insights.is_empty());
        match &report.result {
            AnalysisOutput::Extraction { items, .. } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], "- Product Alpha mentioned at the start");
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn extraction_without_list_lines_falls_back_to_the_whole_answer() {
        let model = Arc::new(MockChat::new().with_response("No products were mentioned."));
        let analyzer = analyzer_with(vec![hit("talk_a", 0, 0.8)], model);

        let report = analyzer
            .analyze("List every product mentioned", None, None, None)
            .await
            .unwrap();

        match &report.result {
            AnalysisOutput::Extraction { items, .. } => {
                assert_eq!(items, &["No products were mentioned.".to_string()]);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn supplied_context_bypasses_retrieval() {
        let model = Arc::new(MockChat::new());
        // Retriever would return nothing; the handoff context drives the run.
        let analyzer = analyzer_with(Vec::new(), model);

        let context = vec![hit("talk_a", 0, 0.4), hit("talk_b", 0, 0.4)];
        let report = analyzer
            .analyze("Compare the talks", Some(context), None, None)
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.sources_used, 2);
    }

    #[tokio::test]
    async fn model_failure_surfaces_as_a_synthesis_error() {
        let model = Arc::new(MockChat::failing("rate limited"));
        let analyzer = analyzer_with(vec![hit("talk_a", 0, 0.8)], model);

        let err = analyzer
            .analyze("Summarize the talk", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Synthesis { agent: "deep-analyzer", .. }));
    }
}
