//! # quill-agent
//!
//! The query-resolution half of quill: validates incoming questions,
//! classifies their complexity, retrieves evidence through a
//! [`Retriever`](quill_rag::Retriever), and either synthesizes a grounded
//! answer or hands off to the deep-analysis path.
//!
//! ## Components
//!
//! - [`QueryValidator`] — length/safety/sanitization gate with an optional
//!   model-based relevance check; always returns a structured report
//! - [`QueryResolver`] — the classify → search → decide → synthesize state
//!   machine
//! - [`DeepAnalyzer`] — multi-mode analysis (comparison, trend, summary,
//!   extraction, sentiment, topics) for complex or low-confidence queries
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quill_agent::{DeepAnalyzer, HandoffTarget, QueryResolver, QueryValidator};
//!
//! # async fn run(
//! #     engine: Arc<quill_rag::RetrievalEngine>,
//! #     model: Arc<dyn quill_core::ChatModel>,
//! # ) -> quill_agent::Result<()> {
//! let validator = QueryValidator::with_model(model.clone());
//! let resolver = QueryResolver::new(engine.clone(), model.clone());
//! let analyzer = DeepAnalyzer::new(engine, model);
//!
//! let question = "Compare how the two talks discuss pricing";
//! let report = validator.validate(question).await;
//! if report.is_valid {
//!     let outcome = resolver.resolve(question, None, false).await?;
//!     if outcome.handoff_to == Some(HandoffTarget::DeepAnalysis) {
//!         let analysis = analyzer.analyze(question, None, None, None).await?;
//!         println!("{:?}", analysis.result);
//!     } else {
//!         println!("{}", outcome.answer);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod error;
pub mod resolver;
pub mod validator;

#[cfg(test)]
mod testing;

pub use analyzer::{
    AnalysisMetadata, AnalysisOutput, AnalysisReport, AnalysisType, DeepAnalyzer,
};
pub use error::{AgentError, Result};
pub use resolver::{
    HandoffTarget, QueryComplexity, QueryResolver, ResolverOutcome, SourceRef,
    classify_complexity,
};
pub use validator::{QueryValidator, ValidationReport, ValidationStatus};
