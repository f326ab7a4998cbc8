/// Exit code for an allowed operation or a successful run.
pub const EXIT_OK: i32 = 0;
/// Exit code for an operation vetoed by policy.
pub const EXIT_BLOCKED: i32 = 1;
/// Exit code for a payload that could not be understood.
pub const EXIT_MALFORMED: i32 = 2;
/// Exit code for an unexpected runtime failure.
pub const EXIT_FAILURE: i32 = 1;

/// Harness events the dispatcher can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    PreToolUse,
    TaskCompleted,
}

impl HookEvent {
    /// Parse an event name from CLI argument (case-insensitive).
    pub fn from_arg(s: &str) -> Option<HookEvent> {
        match s.to_lowercase().as_str() {
            "pretooluse" | "pre-tool-use" | "pre_tool_use" => Some(HookEvent::PreToolUse),
            "taskcompleted" | "task-completed" | "task_completed" => Some(HookEvent::TaskCompleted),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::PreToolUse => "PreToolUse",
            HookEvent::TaskCompleted => "TaskCompleted",
        }
    }
}

/// Result returned by a hook handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutput {
    /// Status lines for stdout (may be empty).
    pub stdout: String,
    pub exit_code: i32,
}

impl HookOutput {
    pub fn ok(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_OK,
        }
    }

    pub fn block(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_BLOCKED,
        }
    }

    pub fn malformed(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_MALFORMED,
        }
    }

    pub fn failure(stdout: String) -> Self {
        Self {
            stdout,
            exit_code: EXIT_FAILURE,
        }
    }

    pub fn into_pair(self) -> (String, i32) {
        (self.stdout, self.exit_code)
    }
}
