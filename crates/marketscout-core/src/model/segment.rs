use super::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Enumerations
// ============================================================================

/// Who signs off on a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BuyerType {
    /// Buys with their own card
    #[serde(alias = "individual-self-serve")]
    SelfServe,
    /// Needs a manager's approval
    ManagerApproved,
    /// Goes through procurement
    #[serde(alias = "procurement-committee")]
    ProcurementDriven,
}

/// How often the struggle occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every day
    Daily,
    /// Every week
    Weekly,
    /// Every month
    Monthly,
    /// Less than monthly
    #[serde(alias = "quarterly")]
    Occasional,
}

/// How much the struggle hurts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    /// Blocking
    Critical,
    /// Painful
    High,
    /// Annoying
    Medium,
    /// Mild
    Low,
}

/// Market entry priority. Ordered primary first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// The beachhead segment
    #[serde(alias = "Primary")]
    Primary,
    /// Next in line
    #[serde(alias = "Secondary")]
    Secondary,
    /// Everything else
    #[serde(alias = "Alternative")]
    Alternative,
}

impl Priority {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Alternative => "alternative",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence / data quality grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Well sourced
    #[serde(alias = "High")]
    High,
    /// Partly sourced
    #[serde(alias = "Medium")]
    Medium,
    /// Mostly estimated
    #[serde(alias = "Low")]
    Low,
}

// ============================================================================
// Evidence
// ============================================================================

/// A finding plus the URLs backing it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct EvidenceField {
    /// The finding
    pub value: String,
    /// Exact URLs verifying the finding
    #[serde(default)]
    pub source_urls: Vec<String>,
}

// Agents sometimes answer evidence fields with a bare string.
impl<'de> Deserialize<'de> for EvidenceField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Full {
                value: String,
                #[serde(default)]
                source_urls: Vec<String>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(value) => Self {
                value,
                source_urls: Vec::new(),
            },
            Repr::Full { value, source_urls } => Self { value, source_urls },
        })
    }
}

/// Evidence gathered for a segment, keyed by aspect
/// (`behavioral_evidence`, `pain_intensity`, `current_solutions`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationData {
    /// Evidence per aspect
    #[serde(flatten)]
    pub evidence: BTreeMap<String, EvidenceField>,
    /// Overall source quality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality: Option<Confidence>,
}

impl ValidationData {
    /// Every distinct source URL cited
    #[must_use]
    pub fn source_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self
            .evidence
            .values()
            .flat_map(|e| e.source_urls.iter().map(String::as_str))
            .collect();
        urls.sort_unstable();
        urls.dedup();
        urls
    }
}

// ============================================================================
// Segment
// ============================================================================

/// One user segment experiencing the struggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// Short, memorable name
    #[serde(rename = "segment_name", alias = "name")]
    pub name: String,
    /// Who they are
    pub description: String,
    /// When and where the struggle happens
    #[serde(rename = "context_circumstance", default)]
    pub context: String,
    /// Blocking constraints
    #[serde(rename = "key_constraints", default)]
    pub constraints: Vec<String>,
    /// Purchase decision path
    pub buyer_type: BuyerType,
    /// How often the struggle occurs
    #[serde(rename = "struggle_frequency")]
    pub frequency: Frequency,
    /// How much it hurts
    #[serde(rename = "struggle_intensity")]
    pub intensity: Intensity,
    /// What they use today
    #[serde(rename = "existing_alternatives", default)]
    pub alternatives: String,
    /// Market entry priority
    #[serde(rename = "priority_level")]
    pub priority: Priority,
    /// Why this priority was assigned
    #[serde(default)]
    pub priority_rationale: String,
    /// Emotional/functional product personality
    #[serde(rename = "product_vibe", default)]
    pub vibe: String,
    /// Features specific to this segment
    #[serde(rename = "possible_features")]
    #[schemars(length(min = 5, max = 8))]
    pub features: Vec<String>,
    /// Sourced evidence
    #[serde(rename = "validation_data", default)]
    pub validation: ValidationData,
}

/// Output of the segment generation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSet {
    /// Generated segments, 8-12 expected
    #[schemars(length(min = 8, max = 12))]
    pub segments: Vec<Segment>,
}

/// Fewest segments the generation stage is asked for
pub const MIN_SEGMENTS: usize = 8;

/// Most segments the generation stage is asked for
pub const MAX_SEGMENTS: usize = 12;

impl SegmentSet {
    /// Segments with the given priority, in generation order
    pub fn with_priority(&self, priority: Priority) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.priority == priority)
    }

    /// Count of segments with the given priority
    #[must_use]
    pub fn count(&self, priority: Priority) -> usize {
        self.with_priority(priority).count()
    }

    /// Deviations from the expected shape (1 primary, 2 secondary, 8-12 total).
    /// These are reported, never repaired.
    #[must_use]
    pub fn shape_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let total = self.segments.len();
        if !(MIN_SEGMENTS..=MAX_SEGMENTS).contains(&total) {
            warnings.push(format!(
                "expected {}-{} segments, got {}",
                MIN_SEGMENTS, MAX_SEGMENTS, total
            ));
        }
        let primary = self.count(Priority::Primary);
        if primary != 1 {
            warnings.push(format!("expected 1 primary segment, got {}", primary));
        }
        let secondary = self.count(Priority::Secondary);
        if secondary != 2 {
            warnings.push(format!("expected 2 secondary segments, got {}", secondary));
        }
        for segment in &self.segments {
            let n = segment.features.len();
            if !(5..=8).contains(&n) {
                warnings.push(format!(
                    "segment '{}' lists {} features, expected 5-8",
                    segment.name, n
                ));
            }
        }
        warnings
    }
}

impl StructuredOutput for SegmentSet {
    fn check(&self) -> std::result::Result<(), String> {
        if self.segments.is_empty() {
            return Err("no segments returned".to_string());
        }
        if let Some(blank) = self.segments.iter().find(|s| s.name.trim().is_empty()) {
            return Err(format!(
                "segment with empty name (description: {})",
                blank.description
            ));
        }
        Ok(())
    }
}
