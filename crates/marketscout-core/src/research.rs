//! Research backends
//!
//! Both pipeline stages are reached through two traits so the driver does
//! not care whether a stage is one extraction call or a full agent loop:
//!
//! - [`AgentResearcher`]: tool-augmented reasoning through [`AgentRunner`]
//! - [`ExtractionResearcher`]: one schema-driven call per stage

use crate::agent::{AgentConfig, AgentRunner};
use crate::brief::ResearchBrief;
use crate::model::{schema_of, MarketSizing, Outcome, Segment, SegmentSet, StructuredOutput};
use crate::prompts;
use crate::stage::{RunStats, StageOutput};
use marketscout_llm::{
    LlmProvider, StructuredExtractor, UsageLedger, UsageRecord, DEFAULT_COST_PER_CREDIT,
};
use marketscout_tools::ToolAdapter;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Produces the segment set for a brief
#[async_trait::async_trait]
pub trait SegmentGenerator: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Generate segments. Failures are reported in the outcome, never raised.
    async fn generate(&self, brief: &ResearchBrief) -> StageOutput<SegmentSet>;
}

/// Sizes the market for one segment
#[async_trait::async_trait]
pub trait MarketSizer: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Size one segment. Failures are reported in the outcome, never raised.
    async fn size(&self, brief: &ResearchBrief, segment: &Segment) -> StageOutput<MarketSizing>;
}

// ============================================================================
// Agent backend
// ============================================================================

/// Agent-loop backend for both stages
#[derive(Clone)]
pub struct AgentResearcher {
    generation: AgentRunner,
    sizing: AgentRunner,
}

impl AgentResearcher {
    /// Create a researcher with separate generation and sizing settings
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: ToolAdapter,
        generation: AgentConfig,
        sizing: AgentConfig,
    ) -> Self {
        Self {
            generation: AgentRunner::new(Arc::clone(&llm), tools.clone(), generation),
            sizing: AgentRunner::new(llm, tools, sizing),
        }
    }
}

#[async_trait::async_trait]
impl SegmentGenerator for AgentResearcher {
    fn name(&self) -> &str {
        "agent"
    }

    async fn generate(&self, brief: &ResearchBrief) -> StageOutput<SegmentSet> {
        let prompt =
            prompts::segment_generation(brief, Some(self.generation.config().tool_budget));
        self.generation
            .run("segment_generation", prompts::GENERATION_SYSTEM, &prompt)
            .await
    }
}

#[async_trait::async_trait]
impl MarketSizer for AgentResearcher {
    fn name(&self) -> &str {
        "agent"
    }

    async fn size(&self, brief: &ResearchBrief, segment: &Segment) -> StageOutput<MarketSizing> {
        let prompt = prompts::market_sizing(brief, segment, Some(self.sizing.config().tool_budget));
        let label = format!("market_sizing:{}", segment.name);
        self.sizing
            .run(&label, prompts::SIZING_SYSTEM, &prompt)
            .await
    }
}

// ============================================================================
// Extraction backend
// ============================================================================

/// Single-call extraction backend for both stages
#[derive(Clone)]
pub struct ExtractionResearcher {
    extractor: Arc<dyn StructuredExtractor>,
    backend: String,
    cost_per_credit: f64,
}

impl ExtractionResearcher {
    /// Wrap an extraction service
    #[must_use]
    pub fn new(extractor: Arc<dyn StructuredExtractor>) -> Self {
        let backend = extractor.name().to_string();
        Self {
            extractor,
            backend,
            cost_per_credit: DEFAULT_COST_PER_CREDIT,
        }
    }

    /// Set the ledger price per credit
    #[must_use]
    pub fn with_cost_per_credit(mut self, cost_per_credit: f64) -> Self {
        self.cost_per_credit = cost_per_credit;
        self
    }

    #[instrument(skip(self, prompt), fields(backend = %self.backend))]
    async fn extract<T: StructuredOutput>(
        &self,
        operation: &str,
        prompt: &str,
        metadata: Value,
    ) -> StageOutput<T> {
        let mut ledger = UsageLedger::new().with_cost_per_credit(self.cost_per_credit);
        let schema = schema_of::<T>();
        let start = Instant::now();

        let outcome = match self.extractor.extract(prompt, &schema).await {
            Ok(extraction) => {
                let elapsed = start.elapsed();
                let mut meta = metadata;
                meta["backend"] = json!(self.backend);
                ledger.push(
                    UsageRecord::new(operation, extraction.credits_used, elapsed)
                        .with_metadata(meta),
                );
                info!(
                    operation = %operation,
                    credits = extraction.credits_used,
                    duration_secs = elapsed.as_secs_f64(),
                    "Extraction completed"
                );
                decode(extraction.data)
            }
            Err(e) => {
                warn!(operation = %operation, error = %e, "Extraction failed");
                Outcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let stats = RunStats {
            turns: 1,
            credits: ledger.total_credits(),
            duration_seconds: start.elapsed().as_secs_f64(),
            ..RunStats::default()
        };
        StageOutput {
            outcome,
            ledger,
            stats,
            tool_log: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl SegmentGenerator for ExtractionResearcher {
    fn name(&self) -> &str {
        "extract"
    }

    async fn generate(&self, brief: &ResearchBrief) -> StageOutput<SegmentSet> {
        let prompt = prompts::segment_generation(brief, None);
        let out: StageOutput<SegmentSet> = self
            .extract("segment_generation", &prompt, json!({}))
            .await;
        if let (Some(set), Some(record)) = (out.outcome.data(), out.ledger.records().first()) {
            info!(
                segments = set.segments.len(),
                credits = record.credits,
                "Segments extracted"
            );
        }
        out
    }
}

#[async_trait::async_trait]
impl MarketSizer for ExtractionResearcher {
    fn name(&self) -> &str {
        "extract"
    }

    async fn size(&self, brief: &ResearchBrief, segment: &Segment) -> StageOutput<MarketSizing> {
        let prompt = prompts::market_sizing(brief, segment, None);
        self.extract(
            &format!("market_sizing:{}", segment.name),
            &prompt,
            json!({ "segment": segment.name, "priority": segment.priority }),
        )
        .await
    }
}

/// Decode a service payload into a checked outcome
fn decode<T: StructuredOutput>(data: Value) -> Outcome<T> {
    match serde_json::from_value::<T>(data.clone()) {
        Ok(parsed) => match parsed.check() {
            Ok(()) => Outcome::Parsed { data: parsed },
            Err(reason) => Outcome::Unparsed {
                raw: data.to_string(),
                reason,
            },
        },
        Err(e) => Outcome::Unparsed {
            raw: data.to_string(),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketscout_llm::{Error as LlmError, Extraction, MockProvider, ToolCompletionResponse};
    use marketscout_tools::MockWebProvider;
    use mockall::mock;
    use mockall::predicate::always;

    mock! {
        pub Extractor {}

        #[async_trait::async_trait]
        impl StructuredExtractor for Extractor {
            fn name(&self) -> &str;
            async fn extract(&self, prompt: &str, schema: &Value) -> marketscout_llm::Result<Extraction>;
        }
    }

    fn segment(name: &str, priority: &str) -> Value {
        json!({
            "segment_name": name,
            "description": "d",
            "buyer_type": "self-serve",
            "struggle_frequency": "weekly",
            "struggle_intensity": "high",
            "priority_level": priority,
            "possible_features": ["a", "b", "c", "d", "e"]
        })
    }

    fn brief() -> ResearchBrief {
        ResearchBrief::new("Gym booking app", "Squeeze in a workout")
    }

    #[tokio::test]
    async fn test_extraction_generation_records_credits() {
        let mut extractor = MockExtractor::new();
        extractor
            .expect_name()
            .return_const("mock-extractor".to_string());
        extractor
            .expect_extract()
            .withf(|prompt, schema| {
                prompt.contains("Gym booking app") && schema.to_string().contains("segment_name")
            })
            .times(1)
            .returning(|_, _| {
                Ok(Extraction {
                    data: json!({ "segments": [segment("A", "primary")] }),
                    credits_used: 40,
                })
            });

        let researcher = ExtractionResearcher::new(Arc::new(extractor));
        let out = researcher.generate(&brief()).await;

        assert!(out.outcome.is_parsed());
        assert_eq!(out.ledger.total_credits(), 40);
        assert_eq!(out.ledger.records()[0].operation, "segment_generation");
        assert_eq!(out.stats.credits, 40);
    }

    #[tokio::test]
    async fn test_extraction_error_is_failed_outcome() {
        let mut extractor = MockExtractor::new();
        extractor
            .expect_name()
            .return_const("mock-extractor".to_string());
        extractor
            .expect_extract()
            .with(always(), always())
            .returning(|_, _| Err(LlmError::Timeout(600)));

        let researcher = ExtractionResearcher::new(Arc::new(extractor));
        let seg: Segment = serde_json::from_value(segment("A", "primary")).unwrap();
        let out = researcher.size(&brief(), &seg).await;

        assert_eq!(out.outcome.label(), "failed");
        assert!(out.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_extraction_schema_mismatch_is_unparsed() {
        let mut extractor = MockExtractor::new();
        extractor
            .expect_name()
            .return_const("mock-extractor".to_string());
        extractor.expect_extract().returning(|_, _| {
            Ok(Extraction {
                data: json!({ "population": "unknown" }),
                credits_used: 12,
            })
        });

        let researcher = ExtractionResearcher::new(Arc::new(extractor));
        let seg: Segment = serde_json::from_value(segment("A", "primary")).unwrap();
        let out = researcher.size(&brief(), &seg).await;

        assert_eq!(out.outcome.label(), "unparsed");
        // credits were spent even though the payload is unusable
        assert_eq!(out.ledger.total_credits(), 12);
        assert_eq!(out.ledger.records()[0].operation, "market_sizing:A");
    }

    #[tokio::test]
    async fn test_agent_researcher_labels_sizing_runs() {
        let llm = MockProvider::new();
        llm.add_tool_response(ToolCompletionResponse::text("no idea"));
        let web = MockWebProvider::new();
        let researcher = AgentResearcher::new(
            Arc::new(llm.clone()),
            ToolAdapter::new(Arc::new(web)),
            AgentConfig::generation(),
            AgentConfig::sizing(),
        );
        let seg: Segment = serde_json::from_value(segment("Solo dentists", "primary")).unwrap();
        let out = researcher.size(&brief(), &seg).await;

        assert_eq!(out.outcome.label(), "unparsed");
        let request = &llm.requests()[0];
        assert!(request.messages[1].content.contains("Solo dentists"));
        assert!(request.messages[1].content.contains("about 3 tool calls"));
        assert_eq!(
            out.ledger.records()[0].metadata.as_ref().map(|m| m["stage"].clone()),
            Some(json!("market_sizing:Solo dentists"))
        );
    }
}
