//! Decision reply parsing.
//!
//! The decision service returns raw text, ideally a JSON object. This
//! module recovers a [`Decision`] from it and degrades anything unusable
//! to a plain move.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use wander_types::{Decision, DecisionAction};

use crate::error::RunnerError;

/// Reasoning attached to the move substituted for an unparseable reply.
pub const PARSE_FAILURE: &str = "Failed to parse decision response";

/// The reply's shape before validation.
#[derive(Debug, Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default, alias = "itemIndex")]
    item_index: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse a reply into a [`Decision`].
///
/// Tries, in order: the text as-is, the first fenced code block, both of
/// those with trailing commas removed, then the outermost `{...}` span.
/// If nothing yields a decision, returns a move with
/// [`PARSE_FAILURE`] as its reasoning.
pub fn parse_decision(raw: &str) -> Decision {
    match try_parse(raw) {
        Ok(decision) => decision,
        Err(e) => {
            warn!(error = %e, raw_response = raw, "failed to parse decision, moving");
            Decision::fallback_move(PARSE_FAILURE)
        }
    }
}

fn try_parse(raw: &str) -> Result<Decision, RunnerError> {
    let trimmed = raw.trim();
    let fenced = extract_fenced_json(trimmed);
    let candidates = [
        Some(trimmed.to_owned()),
        fenced.map(ToOwned::to_owned),
        Some(strip_trailing_commas(trimmed)),
        fenced.map(strip_trailing_commas),
        extract_braced(trimmed).map(strip_trailing_commas),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Ok(parsed) = serde_json::from_str::<RawDecision>(&candidate) {
            return validate(parsed);
        }
    }
    Err(RunnerError::Parse(format!("no decision object in: {trimmed}")))
}

/// Turn a well-formed reply into a decision. A `use_item` without a usable
/// index becomes a move.
fn validate(raw: RawDecision) -> Result<Decision, RunnerError> {
    let reasoning = raw
        .reasoning
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "No reasoning given".to_owned());

    match parse_action(&raw.action)? {
        DecisionAction::Move => Ok(Decision::moving(reasoning)),
        DecisionAction::UseItem => match raw.item_index.as_ref().and_then(item_index) {
            Some(index) => Ok(Decision {
                action: DecisionAction::UseItem,
                item_index: Some(index),
                reasoning,
            }),
            None => {
                warn!(item_index = ?raw.item_index, "use_item without a valid index, moving");
                Ok(Decision::fallback_move(&format!("use_item without a valid item_index ({reasoning})")))
            }
        },
    }
}

fn parse_action(s: &str) -> Result<DecisionAction, RunnerError> {
    match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
        "move" | "step" | "walk" => Ok(DecisionAction::Move),
        "use_item" | "useitem" | "use" => Ok(DecisionAction::UseItem),
        other => Err(RunnerError::Parse(format!("unknown action: {other}"))),
    }
}

/// Accept a non-negative integer or a string holding one.
fn item_index(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The body of the first fenced code block, skipping a language tag.
fn extract_fenced_json(text: &str) -> Option<&str> {
    let (_, after_open) = text.split_once("```")?;
    let body = match after_open.split_once('\n') {
        Some((tag, rest)) if !tag.trim_start().starts_with('{') => rest,
        _ => after_open,
    };
    let (inner, _) = body.split_once("```")?;
    Some(inner.trim())
}

/// The span from the first `{` to the last `}`.
fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Drop commas that directly precede a closing brace or bracket.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c == ',' {
            let rest = text.get(i..).and_then(|s| s.strip_prefix(',')).unwrap_or_default();
            if rest.trim_start().starts_with(['}', ']']) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_move() {
        let decision = parse_decision(r#"{"action": "move", "reasoning": "The Gateway is likely"}"#);
        assert_eq!(decision.action, DecisionAction::Move);
        assert_eq!(decision.item_index, None);
        assert_eq!(decision.reasoning, "The Gateway is likely");
    }

    #[test]
    fn parse_use_item() {
        let decision = parse_decision(r#"{"action": "use_item", "item_index": 2, "reasoning": "Calm things"}"#);
        assert_eq!(decision.action, DecisionAction::UseItem);
        assert_eq!(decision.item_index, Some(2));
    }

    #[test]
    fn parse_camel_case_index_and_string_number() {
        let decision = parse_decision(r#"{"action": "USE_ITEM", "itemIndex": "1", "reasoning": "x"}"#);
        assert_eq!(decision.action, DecisionAction::UseItem);
        assert_eq!(decision.item_index, Some(1));
    }

    #[test]
    fn use_item_without_index_degrades_to_move() {
        let decision = parse_decision(r#"{"action": "use_item", "reasoning": "forgot which"}"#);
        assert_eq!(decision.action, DecisionAction::Move);
        assert!(decision.reasoning.contains("item_index"));

        let negative = parse_decision(r#"{"action": "use_item", "item_index": -1, "reasoning": "x"}"#);
        assert_eq!(negative.action, DecisionAction::Move);
    }

    #[test]
    fn parse_from_codeblock() {
        let raw = "Here you go:\n```json\n{\"action\": \"move\", \"reasoning\": \"fenced\"}\n```";
        let decision = parse_decision(raw);
        assert_eq!(decision.reasoning, "fenced");
    }

    #[test]
    fn parse_trailing_comma() {
        let decision = parse_decision(r#"{"action": "use_item", "item_index": 0, "reasoning": "x",}"#);
        assert_eq!(decision.item_index, Some(0));
    }

    #[test]
    fn parse_object_wrapped_in_prose() {
        let raw = r#"I think {"action": "move", "reasoning": "prose around it"} is best."#;
        assert_eq!(parse_decision(raw).reasoning, "prose around it");
    }

    #[test]
    fn missing_reasoning_is_filled_in() {
        let decision = parse_decision(r#"{"action": "move"}"#);
        assert!(!decision.reasoning.is_empty());
    }

    #[test]
    fn garbage_returns_move_with_reasoning() {
        for raw in ["", "not json at all", r#"{"action": "dance"}"#, "{\"action\": "] {
            let decision = parse_decision(raw);
            assert_eq!(decision.action, DecisionAction::Move, "input {raw:?}");
            assert_eq!(decision.item_index, None);
            assert!(!decision.reasoning.is_empty());
        }
        assert_eq!(parse_decision("nope").reasoning, PARSE_FAILURE);
    }

    #[test]
    fn extract_json_from_plain_codeblock() {
        let text = "```\n{\"action\": \"move\"}\n```";
        assert_eq!(extract_fenced_json(text), Some("{\"action\": \"move\"}"));
        let inline = "```{\"action\": \"move\"}```";
        assert_eq!(extract_fenced_json(inline), Some("{\"action\": \"move\"}"));
    }

    #[test]
    fn strip_trailing_commas_basic() {
        assert_eq!(strip_trailing_commas(r#"{"a": [1, 2, ], "b": 3,}"#), r#"{"a": [1, 2 ], "b": 3}"#);
    }
}
