use serde::{Deserialize, Serialize};

/// How a research stage ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Output parsed and passed its checks
    Parsed {
        /// Structured output
        data: T,
    },
    /// The stage produced text that did not parse or validate
    Unparsed {
        /// Raw final answer
        raw: String,
        /// Why it was rejected
        reason: String,
    },
    /// The stage could not produce an answer at all
    Failed {
        /// Error description
        error: String,
    },
}

impl<T> Outcome<T> {
    /// Parsed data, if any
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Parsed { data } => Some(data),
            _ => None,
        }
    }

    /// Consume into parsed data, if any
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Parsed { data } => Some(data),
            _ => None,
        }
    }

    /// True when structured data is present
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }

    /// Short status label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Parsed { .. } => "parsed",
            Self::Unparsed { .. } => "unparsed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Failure description for unparsed or failed outcomes
    #[must_use]
    pub fn problem(&self) -> Option<String> {
        match self {
            Self::Parsed { .. } => None,
            Self::Unparsed { reason, .. } => Some(format!("output did not parse: {}", reason)),
            Self::Failed { error } => Some(error.clone()),
        }
    }
}
