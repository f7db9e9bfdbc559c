//! Agent reasoning loop

use super::config::AgentConfig;
use super::parse::parse_final;
use crate::model::{Outcome, StructuredOutput};
use crate::stage::{RunStats, StageOutput, ToolLogEntry};
use marketscout_llm::{
    LlmProvider, Message, ToolCall, ToolChoice, ToolCompletionRequest, UsageLedger, UsageRecord,
};
use marketscout_tools::{tool_definitions, LoopGuard, ToolAdapter, ToolKind, ToolRequest};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Mutable state owned by one run
struct RunState {
    ledger: UsageLedger,
    guard: LoopGuard,
    stats: RunStats,
    tool_log: Vec<ToolLogEntry>,
    budget_warned: bool,
}

/// Drives tool-augmented reasoning runs.
///
/// The runner itself is stateless between runs; every call to
/// [`AgentRunner::run`] gets a fresh loop guard and ledger.
#[derive(Clone)]
pub struct AgentRunner {
    llm: Arc<dyn LlmProvider>,
    tools: ToolAdapter,
    config: AgentConfig,
}

impl AgentRunner {
    /// Create a runner
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, tools: ToolAdapter, config: AgentConfig) -> Self {
        Self { llm, tools, config }
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run one reasoning loop to a structured answer.
    ///
    /// `label` names the stage in logs and ledger metadata.
    #[instrument(skip(self, system, prompt), fields(provider = %self.llm.name()))]
    pub async fn run<T: StructuredOutput>(
        &self,
        label: &str,
        system: &str,
        prompt: &str,
    ) -> StageOutput<T> {
        let start = Instant::now();
        let mut state = RunState {
            ledger: UsageLedger::new().with_cost_per_credit(self.config.cost_per_credit),
            guard: LoopGuard::new(self.config.guard_window, self.config.guard_threshold),
            stats: RunStats::default(),
            tool_log: Vec::new(),
            budget_warned: false,
        };

        let outcome = self.drive::<T>(label, system, prompt, &mut state).await;

        let RunState {
            ledger,
            guard,
            mut stats,
            tool_log,
            ..
        } = state;
        stats.loop_hits = guard.loop_hits();
        stats.credits = ledger.total_credits();
        stats.input_tokens = ledger.total_input_tokens();
        stats.output_tokens = ledger.total_output_tokens();
        stats.duration_seconds = start.elapsed().as_secs_f64();

        info!(
            stage = %label,
            outcome = outcome.label(),
            turns = stats.turns,
            tool_calls = stats.tool_calls,
            loop_hits = stats.loop_hits,
            credits = stats.credits,
            duration_secs = stats.duration_seconds,
            "Agent run finished"
        );

        StageOutput {
            outcome,
            ledger,
            stats,
            tool_log,
        }
    }

    async fn drive<T: StructuredOutput>(
        &self,
        label: &str,
        system: &str,
        prompt: &str,
        state: &mut RunState,
    ) -> Outcome<T> {
        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| self.llm.default_model().to_string());
        let tools = tool_definitions();
        let mut messages = vec![Message::system(system), Message::user(prompt)];
        let max_turns = self.config.max_turns.max(1);
        let mut last_text = String::new();

        for turn in 1..=max_turns {
            state.stats.turns = turn;
            // Last turn: ask for the answer without further tools
            let choice = if turn == max_turns {
                ToolChoice::None
            } else {
                ToolChoice::Auto
            };
            let request = ToolCompletionRequest::new(model.clone())
                .with_messages(messages.clone())
                .with_tools(tools.clone())
                .with_tool_choice(choice)
                .with_max_tokens(self.config.max_tokens)
                .with_temperature(self.config.temperature);

            let turn_start = Instant::now();
            let response = match self.llm.complete_with_tools(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(stage = %label, turn, error = %e, "LLM call failed");
                    return Outcome::Failed {
                        error: format!("{} turn {} failed: {}", label, turn, e),
                    };
                }
            };

            let usage = response.usage.unwrap_or_default();
            state.ledger.push(
                UsageRecord::new("llm_turn", 0, turn_start.elapsed())
                    .with_tokens(
                        u64::from(usage.prompt_tokens),
                        u64::from(usage.completion_tokens),
                    )
                    .with_metadata(json!({ "stage": label, "turn": turn, "model": response.model })),
            );

            let text = response.content.clone().unwrap_or_default();
            if !response.has_tool_calls() {
                return parse_final(&text);
            }
            if turn == max_turns {
                last_text = text;
                break;
            }

            debug!(stage = %label, turn, calls = response.tool_calls.len(), "Model requested tools");
            messages.push(Message::assistant_with_tool_calls(
                text,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let observation = self.execute(label, turn, call, state).await;
                messages.push(Message::tool_response(&call.id, observation.to_string()));
            }
        }

        warn!(stage = %label, max_turns, "Turn limit reached without a final answer");
        Outcome::Unparsed {
            raw: last_text,
            reason: "turn limit reached".to_string(),
        }
    }

    /// Run one tool call and return the observation for the model
    async fn execute(
        &self,
        label: &str,
        turn: usize,
        call: &ToolCall,
        state: &mut RunState,
    ) -> serde_json::Value {
        let request = match ToolRequest::from_call(call) {
            Ok(request) => request,
            Err(e) => {
                warn!(stage = %label, tool = %call.name, error = %e, "Rejected tool call");
                return json!({
                    "success": true,
                    "note": format!(
                        "{}. Available tools: {}.",
                        e,
                        tool_definitions()
                            .iter()
                            .map(|t| t.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                });
            }
        };

        state.stats.tool_calls += 1;
        if state.stats.tool_calls > self.config.tool_budget && !state.budget_warned {
            state.budget_warned = true;
            state.stats.budget_exceeded = true;
            warn!(
                stage = %label,
                budget = self.config.tool_budget,
                "Tool budget exceeded, continuing"
            );
        }

        match request.kind() {
            ToolKind::Search => state.stats.search_count += 1,
            ToolKind::Scrape => state.stats.scrape_count += 1,
        }

        let result = self.tools.run(&mut state.guard, &request).await;
        state.ledger.push(
            UsageRecord::new(
                format!("{}:{}", result.tool.as_str(), result.target),
                result.credits_used,
                Duration::from_secs_f64(result.duration_seconds.max(0.0)),
            )
            .with_metadata(json!({
                "stage": label,
                "turn": turn,
                "result_count": result.result_count,
            })),
        );
        state.tool_log.push(ToolLogEntry::new(turn, &result));
        result.to_observation()
    }
}
