use super::segment::Confidence;
use super::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Pricing tier label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Tier {
    /// Mass market, high volume
    #[serde(alias = "low")]
    Low,
    /// Value based
    #[serde(alias = "mid", alias = "Medium", alias = "medium")]
    Mid,
    /// Premium
    #[serde(alias = "high")]
    High,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Mid => "Mid",
            Self::High => "High",
        })
    }
}

/// A cited source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceRef {
    /// Source URL or report name
    pub url: String,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Why it is relevant
    #[serde(default)]
    pub relevance: String,
}

/// Struggle-aware population estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PopulationEstimate {
    /// Total addressable population
    #[serde(alias = "total", deserialize_with = "lenient_count")]
    pub total_population: u64,
    /// Citation for the total
    #[serde(default)]
    pub population_source: String,
    /// Share experiencing the struggle, 0.0-1.0
    #[schemars(range(min = 0.0, max = 1.0))]
    pub prevalence_rate: f64,
    /// Citation for the prevalence
    #[serde(default)]
    pub prevalence_source: String,
    /// total_population x filters
    #[serde(deserialize_with = "lenient_count")]
    pub struggle_aware_count: u64,
    /// Step-by-step calculation
    pub calculation_logic: String,
    /// Data confidence
    pub confidence: Confidence,
    /// Additional sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
}

/// A competitor price point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Comparable {
    /// Competing product
    #[serde(alias = "name")]
    pub solution_name: String,
    /// Price with period, e.g. `$90/year`
    pub price: String,
    /// URL or report name
    #[serde(default)]
    pub source: String,
}

/// One pricing scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PricingScenario {
    /// Low / Mid / High
    #[serde(alias = "tier_name")]
    pub tier: Tier,
    /// Annual price in USD
    pub annual_price: f64,
    /// Price in local currency, if different
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_price: Option<String>,
    /// Benchmarked justification
    #[serde(alias = "rationale")]
    pub pricing_rationale: String,
    /// Competitor prices
    #[serde(alias = "comparables")]
    #[schemars(length(min = 2, max = 5))]
    pub comparable_solutions: Vec<Comparable>,
    /// struggle_aware_count x annual_price
    pub sam_revenue: f64,
    /// Year-one capture, e.g. `2%`
    pub capture_rate: String,
    /// Year-one revenue
    pub som_year_1: f64,
    /// Why the capture rate is realistic
    #[serde(default)]
    pub som_reasoning: String,
}

/// Pricing analysis with exactly three scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PricingAnalysis {
    /// Low, Mid and High scenarios
    #[serde(alias = "pricing_tiers")]
    #[schemars(length(min = 3, max = 3))]
    pub pricing_scenarios: Vec<PricingScenario>,
    /// Recommended tier
    #[serde(alias = "recommended_tier")]
    pub recommended_scenario: Tier,
    /// Why that tier
    #[serde(default)]
    pub recommendation_reasoning: String,
}

impl PricingAnalysis {
    /// Scenario for the recommended tier
    #[must_use]
    pub fn recommended(&self) -> Option<&PricingScenario> {
        self.pricing_scenarios
            .iter()
            .find(|s| s.tier == self.recommended_scenario)
    }
}

/// Output of one market sizing stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketSizing {
    /// Population estimate
    pub population: PopulationEstimate,
    /// Pricing analysis
    pub pricing: PricingAnalysis,
}

impl StructuredOutput for MarketSizing {
    fn check(&self) -> std::result::Result<(), String> {
        let pop = &self.population;
        if !(0.0..=1.0).contains(&pop.prevalence_rate) {
            return Err(format!(
                "prevalence_rate {} outside [0, 1]",
                pop.prevalence_rate
            ));
        }

        let scenarios = &self.pricing.pricing_scenarios;
        if scenarios.len() != 3 {
            return Err(format!("expected 3 pricing scenarios, got {}", scenarios.len()));
        }
        let tiers: HashSet<Tier> = scenarios.iter().map(|s| s.tier).collect();
        if tiers.len() != 3 {
            return Err("pricing scenarios must cover Low, Mid and High once each".to_string());
        }
        for scenario in scenarios {
            let n = scenario.comparable_solutions.len();
            if !(2..=5).contains(&n) {
                return Err(format!(
                    "{} scenario lists {} comparables, expected 2-5",
                    scenario.tier, n
                ));
            }
            if scenario.annual_price < 0.0 {
                return Err(format!("{} scenario has a negative price", scenario.tier));
            }
        }
        Ok(())
    }
}

/// Accept counts written as integers, floats or strings like `"2,700,000"`.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    use serde::de::Error as _;

    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        serde_json::Value::String(s) => {
            let digits: String = s.chars().filter(|c| !matches!(c, ',' | '_' | ' ')).collect();
            digits
                .parse::<u64>()
                .ok()
                .or_else(|| digits.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
        }
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("expected a non-negative count, got {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sizing_json() -> serde_json::Value {
        let scenario = |tier: &str, price: f64| {
            json!({
                "tier": tier,
                "annual_price": price,
                "pricing_rationale": "Benchmarked against incumbents",
                "comparable_solutions": [
                    {"solution_name": "A", "price": "$90/year", "source": "https://a.com"},
                    {"solution_name": "B", "price": "$120/year", "source": "https://b.com"}
                ],
                "sam_revenue": price * 1000.0,
                "capture_rate": "2%",
                "som_year_1": price * 20.0,
                "som_reasoning": "Early adopters"
            })
        };
        json!({
            "population": {
                "total_population": 200000,
                "population_source": "ADA 2024",
                "prevalence_rate": 0.4,
                "prevalence_source": "Survey",
                "struggle_aware_count": "80,000",
                "calculation_logic": "200k x 40%",
                "confidence": "Medium"
            },
            "pricing": {
                "pricing_scenarios": [scenario("Low", 60.0), scenario("Mid", 120.0), scenario("High", 300.0)],
                "recommended_scenario": "Mid",
                "recommendation_reasoning": "Best ROI"
            }
        })
    }

    #[test]
    fn test_valid_sizing_parses_and_checks() {
        let sizing: MarketSizing = serde_json::from_value(sizing_json()).unwrap();
        assert_eq!(sizing.population.struggle_aware_count, 80_000);
        assert_eq!(sizing.population.confidence, Confidence::Medium);
        assert!(sizing.check().is_ok());
        assert_eq!(sizing.pricing.recommended().map(|s| s.annual_price), Some(120.0));
    }

    #[test]
    fn test_agent_variant_field_names() {
        let raw = json!({
            "population": {
                "total": 1.5e6,
                "prevalence_rate": 0.1,
                "struggle_aware_count": 150000,
                "calculation_logic": "x",
                "confidence": "low",
                "sources": [{"url": "https://bls.gov", "title": "BLS"}]
            },
            "pricing": {
                "pricing_tiers": [
                    {"tier_name": "Low", "annual_price": 10.0, "rationale": "r",
                     "comparables": [{"name": "A", "price": "$1"}, {"name": "B", "price": "$2"}],
                     "sam_revenue": 1.0, "capture_rate": "1%", "som_year_1": 1.0}
                ],
                "recommended_tier": "Low"
            }
        });
        let sizing: MarketSizing = serde_json::from_value(raw).unwrap();
        assert_eq!(sizing.population.total_population, 1_500_000);
        assert_eq!(sizing.population.sources.len(), 1);
        assert_eq!(sizing.pricing.pricing_scenarios[0].comparable_solutions[0].solution_name, "A");
        // only one tier: parses but fails the semantic check
        assert!(sizing.check().unwrap_err().contains("3 pricing scenarios"));
    }

    #[test]
    fn test_duplicate_tiers_rejected() {
        let mut raw = sizing_json();
        raw["pricing"]["pricing_scenarios"][2]["tier"] = json!("Mid");
        let sizing: MarketSizing = serde_json::from_value(raw).unwrap();
        assert!(sizing.check().is_err());
    }

    #[test]
    fn test_prevalence_out_of_range_rejected() {
        let mut raw = sizing_json();
        raw["population"]["prevalence_rate"] = json!(40.0);
        let sizing: MarketSizing = serde_json::from_value(raw).unwrap();
        assert!(sizing.check().unwrap_err().contains("prevalence_rate"));
    }

    #[test]
    fn test_too_few_comparables_rejected() {
        let mut raw = sizing_json();
        raw["pricing"]["pricing_scenarios"][0]["comparable_solutions"] =
            json!([{"solution_name": "A", "price": "$1"}]);
        let sizing: MarketSizing = serde_json::from_value(raw).unwrap();
        assert!(sizing.check().unwrap_err().contains("comparables"));
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut raw = sizing_json();
        raw["population"]["total_population"] = json!(-5);
        assert!(serde_json::from_value::<MarketSizing>(raw).is_err());
    }
}
