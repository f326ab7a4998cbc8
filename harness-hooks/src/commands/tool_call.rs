//! Typed view of a tool-invocation payload, validated at the boundary.
//!
//! Harness payloads name their path in several ways (`file_path`, `path`,
//! `files: [..]`) under either `parameters` or `tool_input`. Everything is
//! folded into an [`EditRequest`] here so the guard never touches raw JSON.

use serde::Deserialize;

use super::errors::{HookError, Result};

/// Raw payload as delivered on stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    #[serde(alias = "tool_name")]
    pub name: String,
    #[serde(default)]
    pub parameters: Option<ToolParams>,
    #[serde(default)]
    pub tool_input: Option<ToolParams>,
}

/// Path-bearing fields of a tool's arguments. Other argument keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolParams {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<FileRef>>,
}

/// One entry of a `files` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    Bare(String),
    Entry {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        file_path: Option<String>,
    },
}

impl FileRef {
    fn resolve(&self) -> Result<Option<&str>> {
        match self {
            FileRef::Bare(p) => Ok(Some(p.as_str())),
            FileRef::Entry { path, file_path } => match path.as_deref().or(file_path.as_deref()) {
                Some(p) => Ok(Some(p)),
                None => Err(HookError::UnrecognizedShape {
                    field: "files",
                    details: "object entry has neither `path` nor `file_path`".to_string(),
                }),
            },
        }
    }
}

/// A validated edit request: normalized operation name plus candidate paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Name as supplied by the harness, for messages.
    pub tool_name: String,
    /// Lower-cased name with `-` and `_` removed.
    pub tool_kind: String,
    /// Non-empty candidate paths, deduplicated, in payload order.
    pub paths: Vec<String>,
}

/// Normalize a tool name so `MultiEdit`, `multi-edit` and `multi_edit` compare equal.
pub fn normalize_tool_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl EditRequest {
    /// Parse and validate a stdin payload.
    pub fn parse(payload: &str) -> Result<Self> {
        if payload.trim().is_empty() {
            return Err(HookError::MalformedInput {
                details: "empty payload".to_string(),
            });
        }

        let call: ToolCall = serde_json::from_str(payload).map_err(|e| HookError::MalformedInput {
            details: e.to_string(),
        })?;
        Self::from_call(call)
    }

    pub fn from_call(call: ToolCall) -> Result<Self> {
        let tool_kind = normalize_tool_name(&call.name);
        if tool_kind.is_empty() {
            return Err(HookError::MalformedInput {
                details: "tool name is empty".to_string(),
            });
        }

        // tool_input is the harness-native key; it wins when both are sent
        let params = call.tool_input.or(call.parameters).unwrap_or_default();

        let mut paths: Vec<String> = Vec::new();
        let mut push = |p: &str| {
            if !p.is_empty() && !paths.iter().any(|existing| existing == p) {
                paths.push(p.to_string());
            }
        };

        if let Some(p) = params.file_path.as_deref() {
            push(p);
        }
        if let Some(p) = params.path.as_deref() {
            push(p);
        }
        for entry in params.files.iter().flatten() {
            if let Some(p) = entry.resolve()? {
                push(p);
            }
        }

        Ok(Self {
            tool_name: call.name,
            tool_kind,
            paths,
        })
    }
}
