//! Canned research payloads shared by unit tests

use crate::model::{MarketSizing, Segment};
use serde_json::{json, Value};

pub(crate) fn segment_json(name: &str, priority: &str) -> Value {
    json!({
        "segment_name": name,
        "description": format!("{} who struggle with booking", name),
        "context_circumstance": "Short gaps between errands",
        "key_constraints": ["time"],
        "buyer_type": "self-serve",
        "struggle_frequency": "weekly",
        "struggle_intensity": "high",
        "existing_alternatives": "Text messages",
        "priority_level": priority,
        "priority_rationale": "Reachable",
        "product_vibe": "Invisible and fast",
        "possible_features": ["a", "b", "c", "d", "e"],
        "validation_data": {
            "behavioral_evidence": {"value": "Forum threads", "source_urls": ["https://example.com/a"]}
        }
    })
}

pub(crate) fn segment(name: &str, priority: &str) -> Segment {
    serde_json::from_value(segment_json(name, priority)).expect("fixture segment is valid")
}

pub(crate) fn sizing_json(struggle_aware: u64) -> Value {
    let scenario = |tier: &str, price: f64| {
        json!({
            "tier": tier,
            "annual_price": price,
            "pricing_rationale": "Benchmarked",
            "comparable_solutions": [
                {"solution_name": "A", "price": "$90/year", "source": "https://a.example"},
                {"solution_name": "B", "price": "$120/year", "source": "https://b.example"}
            ],
            "sam_revenue": price * struggle_aware as f64,
            "capture_rate": "2%",
            "som_year_1": price * struggle_aware as f64 * 0.02,
            "som_reasoning": "Early adopters"
        })
    };
    json!({
        "population": {
            "total_population": struggle_aware * 4,
            "population_source": "Census",
            "prevalence_rate": 0.25,
            "prevalence_source": "Survey",
            "struggle_aware_count": struggle_aware,
            "calculation_logic": "total x 25%",
            "confidence": "medium"
        },
        "pricing": {
            "pricing_scenarios": [scenario("Low", 60.0), scenario("Mid", 120.0), scenario("High", 300.0)],
            "recommended_scenario": "Mid",
            "recommendation_reasoning": "Best fit"
        }
    })
}

pub(crate) fn sizing(struggle_aware: u64) -> MarketSizing {
    serde_json::from_value(sizing_json(struggle_aware)).expect("fixture sizing is valid")
}
