//! End-to-end pipeline tests
//!
//! These tests drive the full generate -> size -> persist flow through
//! stub backends and the scripted LLM/web providers:
//! - target selection and sizing fan-out
//! - generation failure halting the run
//! - repeated tool calls short-circuited inside a sizing run
//! - extraction mode sizing one segment at a time

use marketscout_core::{
    AgentConfig, AgentResearcher, ExtractionResearcher, MarketSizer, MarketSizing, Outcome, PipelineConfig,
    PipelineDriver, PipelineResult, ResearchBrief, ResultStore, RunStats, RunStatus, Segment,
    SegmentGenerator, SegmentSet, SizingConfig, StageOutput,
};
use marketscout_llm::{
    Extraction, MockProvider, StructuredExtractor, ToolCall, ToolCompletionResponse, UsageLedger,
};
use marketscout_tools::{MockWebProvider, ToolAdapter, SEARCH_TOOL};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;

// ============================================================================
// Fixtures
// ============================================================================

fn segment_json(name: &str, priority: &str) -> Value {
    json!({
        "segment_name": name,
        "description": format!("{} short on time", name),
        "context_circumstance": "Weekday evenings",
        "key_constraints": ["time", "budget"],
        "buyer_type": "self-serve",
        "struggle_frequency": "daily",
        "struggle_intensity": "high",
        "existing_alternatives": "Takeout",
        "priority_level": priority,
        "priority_rationale": "Easy to reach",
        "product_vibe": "Calm",
        "possible_features": ["plan", "shop", "cook", "track", "share"]
    })
}

/// 1 primary, 2 secondary, the rest alternative
fn segment_set_json(total: usize) -> Value {
    let segments: Vec<Value> = (1..=total)
        .map(|i| {
            let priority = match i {
                1 => "primary",
                2 | 3 => "secondary",
                _ => "alternative",
            };
            segment_json(&format!("Segment {}", i), priority)
        })
        .collect();
    json!({ "segments": segments })
}

fn sizing_json() -> Value {
    let scenario = |tier: &str, price: f64| {
        json!({
            "tier": tier,
            "annual_price": price,
            "pricing_rationale": "Benchmarked against comparables",
            "comparable_solutions": [
                {"solution_name": "Kit A", "price": "$99/year", "source": "https://a.example"},
                {"solution_name": "Kit B", "price": "$149/year", "source": "https://b.example"}
            ],
            "sam_revenue": price * 50_000.0,
            "capture_rate": "1%",
            "som_year_1": price * 500.0,
            "som_reasoning": "Word of mouth"
        })
    };
    json!({
        "population": {
            "total_population": "200,000",
            "population_source": "Census",
            "prevalence_rate": 0.25,
            "prevalence_source": "Survey",
            "struggle_aware_count": 50_000,
            "calculation_logic": "200,000 x 25%",
            "confidence": "medium"
        },
        "pricing": {
            "pricing_scenarios": [scenario("Low", 49.0), scenario("Mid", 99.0), scenario("High", 199.0)],
            "recommended_scenario": "Mid",
            "recommendation_reasoning": "Matches comparables"
        }
    })
}

fn brief() -> ResearchBrief {
    ResearchBrief::new("Meal planning app", "Help me get dinner on the table fast")
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        sizing: SizingConfig {
            workers: 3,
            request_delay: Duration::ZERO,
        },
        ..PipelineConfig::default()
    }
}

fn charged(operation: &str, credits: u64) -> UsageLedger {
    let mut ledger = UsageLedger::new();
    ledger.record(operation, credits, Duration::from_millis(5));
    ledger
}

// ============================================================================
// Stub backends
// ============================================================================

enum GenerationScript {
    Segments(usize),
    Fail,
}

struct StubGenerator {
    script: GenerationScript,
}

#[async_trait::async_trait]
impl SegmentGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _brief: &ResearchBrief) -> StageOutput<SegmentSet> {
        match self.script {
            GenerationScript::Segments(n) => {
                let set: SegmentSet = serde_json::from_value(segment_set_json(n))
                    .expect("fixture segment set is valid");
                StageOutput {
                    outcome: Outcome::Parsed { data: set },
                    ledger: charged("segment_generation", 10),
                    stats: RunStats::default(),
                    tool_log: Vec::new(),
                }
            }
            GenerationScript::Fail => {
                StageOutput::failed("provider unavailable", charged("segment_generation", 3))
            }
        }
    }
}

#[derive(Default)]
struct StubSizer {
    calls: Mutex<Vec<String>>,
}

impl StubSizer {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MarketSizer for StubSizer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn size(&self, _brief: &ResearchBrief, segment: &Segment) -> StageOutput<MarketSizing> {
        self.calls.lock().unwrap().push(segment.name.clone());
        let sizing: MarketSizing =
            serde_json::from_value(sizing_json()).expect("fixture sizing is valid");
        StageOutput {
            outcome: Outcome::Parsed { data: sizing },
            ledger: charged(&format!("market_sizing:{}", segment.name), 5),
            stats: RunStats::default(),
            tool_log: Vec::new(),
        }
    }
}

/// Extraction service: first call returns segments, later calls sizings
#[derive(Default)]
struct ScriptedExtractor {
    started: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExtractor {
    fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StructuredExtractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, _prompt: &str, _schema: &Value) -> marketscout_llm::Result<Extraction> {
        let call = {
            let mut started = self.started.lock().unwrap();
            started.push(Instant::now());
            started.len()
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(if call == 1 {
            Extraction {
                data: segment_set_json(10),
                credits_used: 20,
            }
        } else {
            Extraction {
                data: sizing_json(),
                credits_used: 8,
            }
        })
    }
}

fn driver(
    generator: StubGenerator,
    sizer: Arc<StubSizer>,
    dir: &std::path::Path,
) -> PipelineDriver {
    PipelineDriver::new(Arc::new(generator), sizer, ResultStore::new(dir))
        .with_config(fast_config())
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_sizes_primary_and_secondary_only() {
    let dir = tempfile::tempdir().unwrap();
    let sizer = Arc::new(StubSizer::default());
    let driver = driver(
        StubGenerator {
            script: GenerationScript::Segments(10),
        },
        Arc::clone(&sizer),
        dir.path(),
    );

    let run = assert_ok!(driver.run(&brief()).await);
    let result = &run.result;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.segments.len(), 10);
    assert_eq!(result.sizing_results.len(), 3);
    assert_eq!(result.sized_count(), 3);
    assert!(result.warnings.is_empty());

    let mut sized = sizer.calls();
    sized.sort();
    assert_eq!(sized, vec!["Segment 1", "Segment 2", "Segment 3"]);

    // results keep submission order regardless of completion order
    let keys: Vec<&str> = result
        .sizing_results
        .iter()
        .map(|e| e.segment.as_str())
        .collect();
    assert_eq!(keys, vec!["Segment 1", "Segment 2", "Segment 3"]);

    // 10 for generation plus 5 per sized segment
    assert_eq!(result.usage.total_credits, 25);
    assert!((result.usage.estimated_cost_usd - 0.75).abs() < 1e-9);

    let saved: PipelineResult = assert_ok!(ResultStore::load(&run.path));
    assert_eq!(saved.sizing_results.len(), 3);
    assert_eq!(saved.metadata.run_id, result.metadata.run_id);
}

#[tokio::test]
async fn test_size_all_covers_every_segment() {
    let dir = tempfile::tempdir().unwrap();
    let sizer = Arc::new(StubSizer::default());
    let mut config = fast_config();
    config.size_all = true;
    let driver = PipelineDriver::new(
        Arc::new(StubGenerator {
            script: GenerationScript::Segments(9),
        }),
        Arc::clone(&sizer) as Arc<dyn MarketSizer>,
        ResultStore::new(dir.path()),
    )
    .with_config(config);

    let run = assert_ok!(driver.run(&brief()).await);

    assert_eq!(run.result.sizing_results.len(), 9);
    assert_eq!(sizer.calls().len(), 9);
    assert!(run.result.metadata.size_all);
}

#[tokio::test]
async fn test_generation_failure_halts_before_sizing() {
    let dir = tempfile::tempdir().unwrap();
    let sizer = Arc::new(StubSizer::default());
    let driver = driver(
        StubGenerator {
            script: GenerationScript::Fail,
        },
        Arc::clone(&sizer),
        dir.path(),
    );

    let run = assert_ok!(driver.run(&brief()).await);
    let result = &run.result;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.sizing_results.is_empty());
    assert!(result.segments.is_empty());
    assert!(sizer.calls().is_empty());
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("provider unavailable")));

    // the failed run is still on disk with the credits it spent
    assert!(run.path.exists());
    let saved: PipelineResult = assert_ok!(ResultStore::load(&run.path));
    assert_eq!(saved.status, RunStatus::Failed);
    assert_eq!(saved.usage.total_credits, 3);
}

#[tokio::test]
async fn test_blank_brief_is_rejected_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let sizer = Arc::new(StubSizer::default());
    let driver = driver(
        StubGenerator {
            script: GenerationScript::Segments(10),
        },
        sizer,
        dir.path(),
    );

    let brief = ResearchBrief::new("", "jtbd");
    assert!(driver.run(&brief).await.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_repeated_search_in_sizing_run_is_short_circuited() {
    let dir = tempfile::tempdir().unwrap();

    // generation: one primary and alternatives, so exactly one sizing run
    let mut set = segment_set_json(8);
    for segment in set["segments"].as_array_mut().unwrap().iter_mut().skip(1) {
        segment["priority_level"] = json!("alternative");
    }

    let llm = MockProvider::new();
    llm.add_tool_response(ToolCompletionResponse::text(format!(
        "```json\n{}\n```",
        set
    )));
    let repeated: Vec<ToolCall> = (1..=5)
        .map(|i| ToolCall {
            id: format!("call_{}", i),
            name: SEARCH_TOOL.to_string(),
            arguments: json!({"query": "X"}).to_string(),
        })
        .collect();
    llm.add_tool_response(ToolCompletionResponse::calls(repeated));
    llm.add_tool_response(ToolCompletionResponse::text(sizing_json().to_string()));

    let web = MockWebProvider::new();
    let researcher = Arc::new(AgentResearcher::new(
        Arc::new(llm.clone()),
        ToolAdapter::new(Arc::new(web.clone())),
        AgentConfig::generation(),
        AgentConfig::sizing(),
    ));
    let driver = PipelineDriver::new(
        Arc::clone(&researcher) as Arc<dyn SegmentGenerator>,
        researcher,
        ResultStore::new(dir.path()),
    )
    .with_config(fast_config());

    let run = assert_ok!(driver.run(&brief()).await);
    let result = &run.result;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.sizing_results.len(), 1);
    assert_eq!(web.searched(), vec!["X".to_string(), "X".to_string()]);

    let entry = &result.sizing_results[0];
    assert!(entry.market_sizing.is_parsed());
    assert_eq!(entry.stats.loop_hits, 3);
    assert_eq!(entry.credits, 4);
    assert_eq!(result.usage.total_credits, 4);
    assert_eq!(llm.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_extract_mode_sizes_sequentially_with_delay() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::default());
    let researcher = Arc::new(ExtractionResearcher::new(
        Arc::clone(&extractor) as Arc<dyn StructuredExtractor>
    ));
    let config = PipelineConfig {
        mode: "extract".to_string(),
        sizing: SizingConfig {
            workers: 1,
            request_delay: Duration::from_secs(2),
        },
        ..PipelineConfig::default()
    };
    let driver = PipelineDriver::new(
        Arc::clone(&researcher) as Arc<dyn SegmentGenerator>,
        researcher,
        ResultStore::new(dir.path()),
    )
    .with_config(config);

    let run = assert_ok!(driver.run(&brief()).await);
    let result = &run.result;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.metadata.mode, "extract");
    assert_eq!(result.sized_count(), 3);
    assert_eq!(result.usage.total_credits, 20 + 3 * 8);

    // one generation call, then three sizing calls that never overlap
    let started = extractor.started();
    assert_eq!(started.len(), 4);
    assert_eq!(extractor.max_in_flight.load(Ordering::SeqCst), 1);
    for pair in started[1..].windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(2));
    }
}
