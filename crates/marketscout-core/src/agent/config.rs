//! Agent runner configuration

use marketscout_llm::DEFAULT_COST_PER_CREDIT;

/// Turn ceiling for one reasoning loop
pub const DEFAULT_MAX_TURNS: usize = 12;

/// Soft tool-call target for segment generation
pub const GENERATION_TOOL_BUDGET: usize = 6;

/// Soft tool-call target for one sizing run
pub const SIZING_TOOL_BUDGET: usize = 3;

/// Configuration for an [`AgentRunner`](super::AgentRunner)
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model override; the provider default is used when `None`
    pub model: Option<String>,
    /// Maximum LLM turns before the run is cut off
    pub max_turns: usize,
    /// Tool calls expected per run. Overrun is logged, not enforced.
    pub tool_budget: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap per turn
    pub max_tokens: u32,
    /// Loop guard window size
    pub guard_window: usize,
    /// Loop guard repeat threshold
    pub guard_threshold: usize,
    /// Price used by the run's ledger
    pub cost_per_credit: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_turns: DEFAULT_MAX_TURNS,
            tool_budget: GENERATION_TOOL_BUDGET,
            temperature: 0.1,
            max_tokens: 4096,
            guard_window: marketscout_tools::loop_guard::DEFAULT_WINDOW,
            guard_threshold: marketscout_tools::loop_guard::DEFAULT_THRESHOLD,
            cost_per_credit: DEFAULT_COST_PER_CREDIT,
        }
    }
}

impl AgentConfig {
    /// Settings for segment generation
    #[must_use]
    pub fn generation() -> Self {
        Self::default()
    }

    /// Settings for one market sizing run
    #[must_use]
    pub fn sizing() -> Self {
        Self {
            tool_budget: SIZING_TOOL_BUDGET,
            ..Self::default()
        }
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the turn ceiling (at least 1)
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Set the soft tool budget
    #[must_use]
    pub fn with_tool_budget(mut self, budget: usize) -> Self {
        self.tool_budget = budget;
        self
    }

    /// Set temperature and per-turn completion cap
    #[must_use]
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set the loop guard window and threshold
    #[must_use]
    pub fn with_guard(mut self, window: usize, threshold: usize) -> Self {
        self.guard_window = window;
        self.guard_threshold = threshold;
        self
    }

    /// Set the ledger price per credit
    #[must_use]
    pub fn with_cost_per_credit(mut self, cost_per_credit: f64) -> Self {
        self.cost_per_credit = cost_per_credit;
        self
    }
}
