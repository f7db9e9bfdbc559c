//! Research data model
//!
//! - `segment`: generated user segments and their evidence
//! - `sizing`: struggle-aware population and pricing analysis
//! - `outcome`: parsed / unparsed / failed stage outcome

mod outcome;
mod segment;
mod sizing;

pub use outcome::Outcome;
pub use segment::{
    BuyerType, Confidence, EvidenceField, Frequency, Intensity, Priority, Segment, SegmentSet,
    ValidationData, MAX_SEGMENTS, MIN_SEGMENTS,
};
pub use sizing::{
    Comparable, MarketSizing, PopulationEstimate, PricingAnalysis, PricingScenario, SourceRef,
    Tier,
};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// A type a research stage is asked to produce.
///
/// The JSON schema is sent to the model or extraction service; `check`
/// enforces the constraints serde alone cannot express.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send + 'static {
    /// Semantic checks beyond the shape. `Err` carries a human-readable reason.
    fn check(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// JSON schema for `T`
#[must_use]
pub fn schema_of<T: JsonSchema>() -> serde_json::Value {
    schemars::schema_for!(T).to_value()
}
