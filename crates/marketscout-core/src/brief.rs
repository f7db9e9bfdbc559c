//! Research brief - the input to one pipeline run

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Market assumed when the brief does not name one
pub const DEFAULT_LOCATION: &str = "United States";

/// Keys preferred when an idea or JTBD is given as an object
const SUMMARY_KEYS: &[&str] = &["solution", "narrative"];

/// What to research
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBrief {
    /// Startup idea
    pub idea: String,
    /// Jobs-to-be-Done statement
    pub jtbd: String,
    /// Target market
    pub location: String,
}

impl ResearchBrief {
    /// Create a brief for the default market
    #[must_use]
    pub fn new(idea: impl Into<String>, jtbd: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            jtbd: jtbd.into(),
            location: DEFAULT_LOCATION.to_string(),
        }
    }

    /// Set the target market
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Build a brief from a JSON document.
    ///
    /// `idea` and `jtbd` may be strings or objects. For objects the
    /// `solution` or `narrative` entry is used when present, otherwise the
    /// whole object is kept as JSON text.
    pub fn from_value(value: &Value) -> Result<Self> {
        let idea = field_text(value, "idea")?;
        let jtbd = field_text(value, "jtbd")?;
        let location = value
            .get("location")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LOCATION);
        Ok(Self::new(idea, jtbd).with_location(location))
    }

    /// Load a brief from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidBrief(format!("{}: {}", path.display(), e)))?;
        Self::from_value(&value)
    }

    /// Reject briefs with a blank idea or JTBD
    pub fn validate(&self) -> Result<()> {
        if self.idea.trim().is_empty() {
            return Err(Error::InvalidBrief("idea must not be empty".to_string()));
        }
        if self.jtbd.trim().is_empty() {
            return Err(Error::InvalidBrief("jtbd must not be empty".to_string()));
        }
        Ok(())
    }
}

fn field_text(doc: &Value, key: &str) -> Result<String> {
    match doc.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(obj @ Value::Object(map)) => Ok(SUMMARY_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| obj.to_string())),
        Some(other) => Err(Error::InvalidBrief(format!(
            "'{}' must be a string or object, got {}",
            key, other
        ))),
        None => Err(Error::InvalidBrief(format!("missing '{}'", key))),
    }
}
