//! Log metrics shared by the engines.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Figures extracted from an engine run log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogMetrics {
    pub error_count: usize,
    pub warning_count: usize,
    pub token_usage: u64,
    pub estimated_cost: f64,
}

static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\berror\b").expect("Invalid error line regex"));

static WARNING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwarn(ing)?\b").expect("Invalid warning line regex"));

const TOKEN_KEYS: [&str; 4] = ["total_tokens", "totalTokens", "tokens", "tokenCount"];
const COST_KEYS: [&str; 3] = ["total_cost_usd", "cost_usd", "cost"];

/// Scan a log line by line.
///
/// Lines carrying a JSON object contribute token counts (the maximum seen is
/// kept) and costs (summed). `tokens` extracts a token count from plain text
/// lines. Other lines are counted as errors or warnings by keyword.
pub fn scan_lines(log: &str, tokens: Option<&Regex>, verbose: bool) -> LogMetrics {
    let mut metrics = LogMetrics::default();

    for line in log.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(fragment) = json_fragment(line) {
            match serde_json::from_str::<Value>(fragment) {
                Ok(value) => {
                    if let Some(count) = token_count(&value) {
                        metrics.token_usage = metrics.token_usage.max(count);
                    }
                    metrics.estimated_cost += cost(&value).unwrap_or(0.0);
                    continue;
                }
                Err(e) => {
                    if verbose {
                        tracing::debug!(error = %e, "Skipping unreadable JSON fragment");
                    }
                }
            }
        }

        if let Some(count) = tokens
            .and_then(|regex| regex.captures(line))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().replace(',', ""))
            .filter(|digits| !digits.is_empty())
            .map(|digits| digits.parse::<u64>().unwrap_or(u64::MAX))
        {
            metrics.token_usage = metrics.token_usage.max(count);
            continue;
        }

        if ERROR_LINE.is_match(line) {
            metrics.error_count = metrics.error_count.saturating_add(1);
        } else if WARNING_LINE.is_match(line) {
            metrics.warning_count = metrics.warning_count.saturating_add(1);
        }
    }
    metrics
}

/// The `{...}` part of a line, if it has one.
fn json_fragment(line: &str) -> Option<&str> {
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    (end > start).then(|| &line[start..=end])
}

/// Token count from a JSON record: a direct total, or input plus output
/// tokens of a `usage` object.
pub fn token_count(value: &Value) -> Option<u64> {
    for key in TOKEN_KEYS {
        if let Some(count) = value.get(key).and_then(Value::as_u64) {
            return Some(count);
        }
    }
    let usage = value.get("usage")?;
    let input = usage.get("input_tokens").and_then(Value::as_u64);
    let output = usage.get("output_tokens").and_then(Value::as_u64);
    match (input, output) {
        (None, None) => TOKEN_KEYS
            .iter()
            .find_map(|key| usage.get(*key).and_then(Value::as_u64)),
        (input, output) => Some(input.unwrap_or(0).saturating_add(output.unwrap_or(0))),
    }
}

pub fn cost(value: &Value) -> Option<f64> {
    COST_KEYS
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64))
}
