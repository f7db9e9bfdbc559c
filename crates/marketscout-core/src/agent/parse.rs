//! Final-answer extraction
//!
//! The model is asked to end with a JSON object. It usually wraps it in a
//! ```json fence and sometimes adds prose or other code blocks around it,
//! so the candidate is the first ```json fence, then the first untagged
//! fence, then the outermost `{...}` span.

use crate::model::{Outcome, StructuredOutput};
use regex::Regex;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[ \t]*\r?\n?(.*?)```")
        .expect("FENCE is a compile-time constant")
});

/// The JSON candidate inside a model answer, if any
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let fences: Vec<(&str, &str)> = FENCE
        .captures_iter(text)
        .filter_map(|c| {
            let lang = c.get(1).map_or("", |m| m.as_str());
            let body = c.get(2)?.as_str().trim();
            (!body.is_empty()).then_some((lang, body))
        })
        .collect();

    let tagged = fences
        .iter()
        .find(|(lang, _)| lang.eq_ignore_ascii_case("json"));
    let untagged = || fences.iter().find(|(lang, _)| lang.is_empty());
    if let Some(&(_, body)) = tagged.or_else(untagged) {
        return Some(body);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse and check a final answer. Never fails: text that does not parse or
/// validate becomes [`Outcome::Unparsed`] with the raw text kept.
pub fn parse_final<T: StructuredOutput>(text: &str) -> Outcome<T> {
    let Some(candidate) = extract_json(text) else {
        return Outcome::Unparsed {
            raw: text.to_string(),
            reason: "no JSON object in final answer".to_string(),
        };
    };

    match serde_json::from_str::<T>(candidate) {
        Ok(data) => match data.check() {
            Ok(()) => Outcome::Parsed { data },
            Err(reason) => Outcome::Unparsed {
                raw: text.to_string(),
                reason,
            },
        },
        Err(e) => Outcome::Unparsed {
            raw: text.to_string(),
            reason: e.to_string(),
        },
    }
}
