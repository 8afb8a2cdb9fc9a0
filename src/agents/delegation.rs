// Delegation analysis
//
// Two heuristic passes over free text. `analyze` runs on an incoming command
// and splits off work addressed to teammates; `follow_ups` runs on a finished
// response and picks up hand-offs the agent announced. The passes use
// different phrasings and are intentionally kept apart.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::warn;

use super::types::{Delegation, DelegationPlan};
use crate::domain::agent::{Agent, AgentStatus};

/// Remainders this short or shorter are dropped
pub const DEFAULT_MIN_REMAINDER_LEN: usize = 10;

const LEADING_CONNECTIVES: &[&str] = &["and also", "and then", "and", "then", "also", "but", "while"];

/// Finds sub-tasks addressed to other agents
pub trait DelegationAnalyzer: Send + Sync {
    /// Split a command into delegated tasks and what the source keeps
    fn analyze(&self, text: &str, source: &Agent, roster: &[Agent]) -> DelegationPlan;

    /// Hand-offs announced in a completed response
    fn follow_ups(&self, response: &str, source: &Agent, roster: &[Agent]) -> Vec<Delegation>;
}

/// Keyword and regex based analyzer
#[derive(Debug, Clone)]
pub struct PatternDelegationAnalyzer {
    min_remainder_len: usize,
}

impl Default for PatternDelegationAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_REMAINDER_LEN)
    }
}

fn task_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| {
        Regex::new(
            r"(?i)[.!?;\n]|,?\s+(?:and\s+(?:also|then)|then|but|while)\s+|,?\s+(?:and\s+)?(?:ask|have|tell|delegate)\b",
        )
        .expect("valid task boundary pattern")
    })
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "Skipping invalid delegation pattern");
            None
        }
    }
}

fn trim_task(task: &str) -> &str {
    task.trim_matches(|c: char| c.is_whitespace() || ",.;:!?\"“”".contains(c))
}

/// Trim punctuation and any leading connective words
fn clean_remainder(text: &str) -> String {
    let mut rest = trim_task(text);
    loop {
        let stripped = LEADING_CONNECTIVES.iter().find_map(|word| {
            let head = rest.get(..word.len())?;
            let after = &rest[word.len()..];
            (head.eq_ignore_ascii_case(word) && after.starts_with(char::is_whitespace))
                .then(|| trim_task(after))
        });
        match stripped {
            Some(next) => rest = next,
            None => break,
        }
    }
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sentence around `span`, bounded by terminators
fn containing_sentence(text: &str, span: Range<usize>) -> &str {
    let is_end = |c: char| matches!(c, '.' | '!' | '?' | '\n');
    let start = text[..span.start]
        .rfind(is_end)
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = text[span.end..]
        .find(is_end)
        .map(|i| span.end + i)
        .unwrap_or(text.len());
    text[start..end].trim()
}

impl PatternDelegationAnalyzer {
    pub fn new(min_remainder_len: usize) -> Self {
        Self { min_remainder_len }
    }

    fn delegation_pattern(name: &str) -> Option<Regex> {
        compile(&format!(
            r"(?i)\b(?:ask|have|tell|delegate(?:\s+to)?)\s+{}\b[,:]?\s*(?:to\s+)?",
            regex::escape(name)
        ))
    }

    fn follow_up_patterns(name: &str) -> Vec<Regex> {
        let n = regex::escape(name);
        [
            format!(r"(?i)\bI(?:'ve|’ve| have) asked {n}\b[,:]?\s*(?:to\s+)?(?P<task>[^.!?\n]*)"),
            format!(r"(?i)\b{n} will\s+(?P<task>[^.!?\n]*)"),
            format!(r"(?i)\b{n}(?:'s|’s| is) on it\b"),
            format!(r"(?i)\bhere(?:'s|’s| is) {n}(?:'s|’s) review\b"),
            format!(r"(?i)\bhanding (?:this|it) (?:off|over) to {n}\b"),
        ]
        .iter()
        .filter_map(|p| compile(p))
        .collect()
    }
}

impl DelegationAnalyzer for PatternDelegationAnalyzer {
    fn analyze(&self, text: &str, source: &Agent, roster: &[Agent]) -> DelegationPlan {
        let mut delegations = Vec::new();
        let mut spans: Vec<Range<usize>> = Vec::new();

        for agent in roster.iter().filter(|a| a.id() != source.id()) {
            let Some(pattern) = Self::delegation_pattern(agent.name()) else {
                continue;
            };
            let Some(found) = pattern.find(text) else {
                continue;
            };

            let rest = &text[found.end()..];
            let task_end = task_boundary()
                .find(rest)
                .map(|b| found.end() + b.start())
                .unwrap_or(text.len());
            let task = trim_task(&text[found.end()..task_end]);
            if task.is_empty() {
                continue;
            }

            spans.push(found.start()..task_end);
            delegations.push(Delegation {
                target_agent_id: agent.id().to_string(),
                target_name: agent.name().to_string(),
                task: task.to_string(),
            });
        }

        if delegations.is_empty() {
            return DelegationPlan::keep(text);
        }

        spans.sort_by_key(|s| s.start);
        let mut kept = String::new();
        let mut cursor = 0;
        for span in spans {
            if span.start > cursor {
                kept.push_str(&text[cursor..span.start]);
                kept.push(' ');
            }
            cursor = cursor.max(span.end);
        }
        kept.push_str(&text[cursor..]);

        let remainder = clean_remainder(&kept);
        let remainder =
            (remainder.chars().count() > self.min_remainder_len).then_some(remainder);

        DelegationPlan {
            remainder,
            delegations,
        }
    }

    fn follow_ups(&self, response: &str, source: &Agent, roster: &[Agent]) -> Vec<Delegation> {
        roster
            .iter()
            .filter(|a| a.id() != source.id() && a.status() != AgentStatus::Busy)
            .filter_map(|agent| {
                Self::follow_up_patterns(agent.name())
                    .iter()
                    .find_map(|pattern| {
                        let caps = pattern.captures(response)?;
                        let whole = caps.get(0)?;
                        let task = caps
                            .name("task")
                            .map(|m| trim_task(m.as_str()))
                            .filter(|t| !t.is_empty())
                            .unwrap_or_else(|| containing_sentence(response, whole.range()));
                        Some(task.to_string())
                    })
                    .map(|task| Delegation {
                        target_agent_id: agent.id().to_string(),
                        target_name: agent.name().to_string(),
                        task,
                    })
            })
            .collect()
    }
}
