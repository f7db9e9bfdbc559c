//! Prompt builders for the two research stages

use crate::brief::ResearchBrief;
use crate::model::{Segment, MAX_SEGMENTS, MIN_SEGMENTS};

/// System prompt for the agent backend's segment generation run
pub const GENERATION_SYSTEM: &str = "You are a product strategist who segments markets with the \
Jobs-to-be-Done framework. You have web search and scrape tools; use them sparingly to back \
claims with real sources, then answer with a single JSON object.";

/// System prompt for the agent backend's sizing runs
pub const SIZING_SYSTEM: &str = "You are a venture analyst who sizes markets by counting the people \
who actually feel a problem. You have web search and scrape tools; cite what you find, estimate \
where data is missing and say so, then answer with a single JSON object.";

/// Prompt asking for 8-12 prioritized segments
#[must_use]
pub fn segment_generation(brief: &ResearchBrief, tool_budget: Option<usize>) -> String {
    let mut prompt = format!(
        "Startup idea:\n{idea}\n\n\
         Job to be done:\n{jtbd}\n\n\
         Market: {location}\n\n\
         Identify {min}-{max} distinct user segments who face this struggle. Vary them by \
         circumstance, constraints, buyer type (self-serve, manager-approved, \
         procurement-driven), struggle frequency (daily, weekly, monthly, occasional) and \
         intensity (critical, high, medium, low). For each give what they use today, a product \
         vibe and 5-8 features aimed at their constraints.\n\n\
         Prioritize: exactly 1 primary segment, exactly 2 secondary, the rest alternative. \
         Justify each priority with market size, reachability and willingness to pay.\n\n\
         Under validation_data record behavioral_evidence, pain_intensity, current_solutions \
         and segment_accessibility, each as {{\"value\": ..., \"source_urls\": [...]}}, plus an \
         overall data_quality of high, medium or low. Prefer sources specific to {location}.\n",
        idea = brief.idea,
        jtbd = brief.jtbd,
        location = brief.location,
        min = MIN_SEGMENTS,
        max = MAX_SEGMENTS,
    );
    if let Some(budget) = tool_budget {
        prompt.push_str(&format!(
            "\nYou have about {} tool calls. Do not repeat a search that returned nothing; \
             change the keywords or estimate from what you already know.\n",
            budget
        ));
        prompt.push_str(
            "\nEnd with a ```json block holding {\"segments\": [...]} where each segment has \
             segment_name, description, context_circumstance, key_constraints, buyer_type, \
             struggle_frequency, struggle_intensity, existing_alternatives, priority_level, \
             priority_rationale, product_vibe, possible_features and validation_data.\n",
        );
    }
    prompt
}

/// Prompt asking for a struggle-aware sizing of one segment
#[must_use]
pub fn market_sizing(brief: &ResearchBrief, segment: &Segment, tool_budget: Option<usize>) -> String {
    let mut prompt = format!(
        "Startup idea: {idea}\n\
         Job to be done: {jtbd}\n\
         Segment: {name}\n\
         Segment description: {description}\n\
         Market: {location}\n\n\
         1. Population. Find the total number of people in this segment in {location} with a \
         source. Narrow it to those who actually experience the struggle often and painfully \
         enough to pay: state the prevalence rate (0-1), the resulting struggle-aware count and \
         the calculation step by step, citing each filter. Grade your confidence high, medium \
         or low.\n\n\
         2. Pricing. Give exactly three scenarios tagged Low, Mid and High. Each needs an annual \
         price in USD (add local currency if different), a rationale benchmarked against 2-5 \
         comparable solutions with prices and sources, sam_revenue = struggle-aware count x \
         annual price, a realistic year-one capture rate and the resulting som_year_1. \
         Recommend one tier and explain why.\n",
        idea = brief.idea,
        jtbd = brief.jtbd,
        name = segment.name,
        description = segment.description,
        location = brief.location,
    );
    if let Some(budget) = tool_budget {
        prompt.push_str(&format!(
            "\nYou have about {} tool calls; one search for the population, one for \
             prevalence and one for competitor pricing is usually enough.\n",
            budget
        ));
        prompt.push_str(
            "\nEnd with a ```json block holding {\"population\": {total_population, \
             population_source, prevalence_rate, prevalence_source, struggle_aware_count, \
             calculation_logic, confidence, sources}, \"pricing\": {pricing_scenarios: [{tier, \
             annual_price, pricing_rationale, comparable_solutions, sam_revenue, capture_rate, \
             som_year_1, som_reasoning}], recommended_scenario, recommendation_reasoning}}.\n",
        );
    }
    prompt
}
