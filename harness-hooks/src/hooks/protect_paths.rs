use regex::Regex;

use super::types::HookOutput;
use crate::commands::config::HooksConfig;
use crate::commands::tool_call::{EditRequest, normalize_tool_name};

/// Outcome of evaluating one edit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block { offending: Vec<String> },
}

/// Compiled protected-path rules.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    substrings: Vec<String>,
    patterns: Vec<Regex>,
    mutating: Vec<String>,
}

impl PathPolicy {
    /// Build from config. Regexes that fail to compile are skipped with a warning.
    pub fn from_config(config: &HooksConfig) -> Self {
        let patterns = config
            .protected_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "skipping invalid protected pattern");
                    None
                }
            })
            .collect();

        Self {
            substrings: config
                .protected_paths
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
            patterns,
            mutating: config
                .mutating_tools
                .iter()
                .map(|t| normalize_tool_name(t))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_mutating(&self, tool_kind: &str) -> bool {
        self.mutating.iter().any(|m| m == tool_kind)
    }

    /// True when `path` contains a protected substring or matches a protected pattern.
    pub fn is_protected(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        self.substrings.iter().any(|s| path.contains(s.as_str()))
            || self.patterns.iter().any(|re| re.is_match(&path))
    }

    pub fn evaluate(&self, request: &EditRequest) -> Decision {
        if !self.is_mutating(&request.tool_kind) {
            return Decision::Allow;
        }

        let offending: Vec<String> = request
            .paths
            .iter()
            .filter(|p| self.is_protected(p))
            .cloned()
            .collect();

        if offending.is_empty() {
            Decision::Allow
        } else {
            Decision::Block { offending }
        }
    }
}

/// PreToolUse handler: approve or block a proposed file operation.
///
/// Exit 0 = allowed, 1 = blocked by policy, 2 = payload not understood.
pub fn handle(payload: &str, policy: &PathPolicy) -> HookOutput {
    let request = match EditRequest::parse(payload) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting tool call payload");
            return HookOutput::malformed(format!("❌ ERROR: Invalid tool call payload: {}\n", e));
        }
    };

    match policy.evaluate(&request) {
        Decision::Allow => {
            tracing::debug!(tool = %request.tool_name, paths = request.paths.len(), "approved");
            let target = if request.paths.is_empty() {
                format!("{} (no file paths)", request.tool_name)
            } else {
                request.paths.join(", ")
            };
            HookOutput::ok(format!("✅ APPROVED: Operation on {}\n", target))
        }
        Decision::Block { offending } => {
            tracing::debug!(tool = %request.tool_name, ?offending, "blocked");
            let mut out = String::new();
            for path in &offending {
                out.push_str(&format!("❌ BLOCKED: Attempt to modify protected path: {}\n", path));
            }
            out.push_str("📋 Protected paths require explicit approval for modifications\n");
            out.push_str("💡 Use /review-architecture-change to propose modifications\n");
            HookOutput::block(out)
        }
    }
}
