//! Line-start grammar for the textual Thought/Action/Observation/Final
//! Answer protocol.
//!
//! Deliberately not a natural-language parser: every directive is matched by
//! an anchored, case-insensitive regex at the start of a line. This keeps
//! the model's own output ("Observation: ...") from being mistaken for a new
//! directive mid-sentence, and makes the precedence rules below exact rather
//! than heuristic.

use once_cell::sync::Lazy;
use regex::Regex;

static FINAL_ANSWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^[ \t]*Final Answer:[ \t]?").unwrap());
static NEXT_DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t]*(?:Thought|Action|Observation):").unwrap());
static THOUGHT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^[ \t]*Thought:[ \t]?(.*)$").unwrap());
static ACTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^[ \t]*Action:[ \t]?(.*)$").unwrap());
static ACTION_INPUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^[ \t]*Action Input:[ \t]?(.*)$").unwrap());

/// The outcome of parsing one model turn's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedStep {
    /// A `Final Answer:` directive was found; this is the turn's result.
    FinalAnswer(String),
    /// A tool invocation was parsed out of an `Action:`/`Action Input:` pair.
    Action {
        /// The `Thought:` text immediately preceding this action, if any.
        thought: Option<String>,
        /// The requested tool name, verbatim.
        tool: String,
        /// The literal `Action Input` string, verbatim.
        input: String,
    },
}

/// Parse one model turn's raw text per the protocol's precedence rule:
///
/// If `Final Answer:` appears at a line start, everything up to the next
/// `Thought:`/`Action:`/`Observation:` line (or end of text) is the answer.
/// Otherwise every `Action:`/`Action Input:` pair at a line start is
/// located; when `allowed_tools` is non-empty, the last pair whose tool name
/// appears in it wins, falling back to the last pair overall otherwise.
/// Returns `None` if neither a Final Answer nor any complete Action pair was
/// found.
pub fn parse_step(raw: &str, allowed_tools: &[&str]) -> Option<ParsedStep> {
    if let Some(m) = FINAL_ANSWER_RE.find(raw) {
        let rest = &raw[m.end()..];
        let end = NEXT_DIRECTIVE_RE.find(rest).map(|next| next.start()).unwrap_or(rest.len());
        return Some(ParsedStep::FinalAnswer(rest[..end].trim().to_string()));
    }

    let actions: Vec<(usize, &str)> = ACTION_RE
        .captures_iter(raw)
        .map(|c| (c.get(0).unwrap().start(), c.get(1).unwrap().as_str().trim()))
        .collect();
    if actions.is_empty() {
        return None;
    }

    let inputs: Vec<(usize, &str)> = ACTION_INPUT_RE
        .captures_iter(raw)
        .map(|c| (c.get(0).unwrap().start(), c.get(1).unwrap().as_str().trim()))
        .collect();

    let mut pairs: Vec<(usize, &str, &str)> = Vec::new();
    for (i, &(pos, tool)) in actions.iter().enumerate() {
        let next_action_pos = actions.get(i + 1).map(|&(p, _)| p).unwrap_or(usize::MAX);
        if let Some(&(_, input)) = inputs.iter().find(|&&(ipos, _)| ipos > pos && ipos < next_action_pos) {
            pairs.push((pos, tool, input));
        }
    }
    if pairs.is_empty() {
        return None;
    }

    let chosen = if allowed_tools.is_empty() {
        *pairs.last().unwrap()
    } else {
        pairs
            .iter()
            .rev()
            .find(|&&(_, tool, _)| allowed_tools.contains(&tool))
            .copied()
            .unwrap_or(*pairs.last().unwrap())
    };

    let (pos, tool, input) = chosen;
    let thought = THOUGHT_RE
        .captures_iter(raw)
        .filter(|c| c.get(0).unwrap().start() < pos)
        .last()
        .map(|c| c.get(1).unwrap().as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    Some(ParsedStep::Action {
        thought,
        tool: tool.to_string(),
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_answer_at_line_start_wins() {
        let raw = "Thought: I know this.\nFinal Answer: BFS visits nodes level by level.";
        match parse_step(raw, &[]) {
            Some(ParsedStep::FinalAnswer(text)) => assert_eq!(text, "BFS visits nodes level by level."),
            other => panic!("expected FinalAnswer, got {other:?}"),
        }
    }

    #[test]
    fn final_answer_stops_at_next_directive() {
        let raw = "Final Answer: here you go\nThought: this should not be included";
        match parse_step(raw, &[]) {
            Some(ParsedStep::FinalAnswer(text)) => assert_eq!(text, "here you go"),
            other => panic!("expected FinalAnswer, got {other:?}"),
        }
    }

    #[test]
    fn action_and_input_are_paired() {
        let raw = "Thought: let's search.\nAction: search_chunks\nAction Input: breadth first search";
        match parse_step(raw, &["search_chunks"]) {
            Some(ParsedStep::Action { thought, tool, input }) => {
                assert_eq!(thought.as_deref(), Some("let's search."));
                assert_eq!(tool, "search_chunks");
                assert_eq!(input, "breadth first search");
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn prefers_last_action_within_allowed_set_when_model_echoes_example() {
        let raw = "Action: example_tool\nAction Input: ignored example\n\
                   Action: search_chunks\nAction Input: real query";
        match parse_step(raw, &["search_chunks"]) {
            Some(ParsedStep::Action { tool, input, .. }) => {
                assert_eq!(tool, "search_chunks");
                assert_eq!(input, "real query");
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_last_action_when_none_match_allowed_set() {
        let raw = "Action: unknown_tool_a\nAction Input: x\nAction: unknown_tool_b\nAction Input: y";
        match parse_step(raw, &["search_chunks"]) {
            Some(ParsedStep::Action { tool, input, .. }) => {
                assert_eq!(tool, "unknown_tool_b");
                assert_eq!(input, "y");
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn no_allowed_set_prefers_last_action() {
        let raw = "Action: tool_a\nAction Input: x\nAction: tool_b\nAction Input: y";
        match parse_step(raw, &[]) {
            Some(ParsedStep::Action { tool, .. }) => assert_eq!(tool, "tool_b"),
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_text_returns_none() {
        assert_eq!(parse_step("I am just thinking out loud.", &["search_chunks"]), None);
    }

    #[test]
    fn action_without_matching_input_is_not_a_pair() {
        assert_eq!(parse_step("Action: search_chunks\nno input line here", &[]), None);
    }
}
