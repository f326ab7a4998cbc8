use std::io::Read;
use std::path::Path;

use crate::commands::metrics_report;
use crate::hooks::dispatcher::{self, HookContext};
use crate::hooks::protect_paths::{self, PathPolicy};
use crate::hooks::types::{HookEvent, HookOutput};
use crate::hooks::update_metrics;

const USAGE: &str = "Usage: harness-hooks <command> [args...]

Commands:
  protect-paths      Approve or block a tool call read from stdin
  update-metrics     Record a task-completion event read from stdin
  hook <event>       Dispatch a harness event (pre-tool-use, task-completed)
  metrics-report     Summarize the delivery, quality and team metrics
  help               Show this message
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ProtectPaths,
    UpdateMetrics,
    Hook,
    MetricsReport,
    Help,
}

impl Command {
    pub fn from_arg(s: &str) -> Option<Command> {
        match s {
            "protect-paths" => Some(Command::ProtectPaths),
            "update-metrics" => Some(Command::UpdateMetrics),
            "hook" => Some(Command::Hook),
            "metrics-report" => Some(Command::MetricsReport),
            "help" | "--help" | "-h" => Some(Command::Help),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::ProtectPaths => "protect-paths",
            Command::UpdateMetrics => "update-metrics",
            Command::Hook => "hook",
            Command::MetricsReport => "metrics-report",
            Command::Help => "help",
        }
    }
}

/// Read the whole payload. Invalid UTF-8 is reported as an error string.
fn read_payload(stdin: &mut dyn Read) -> Result<String, String> {
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .map_err(|e| format!("failed to read stdin: {}", e))?;
    Ok(buf)
}

/// Output for an event whose stdin could not be read.
fn unreadable_stdin(event: HookEvent, err: &str) -> HookOutput {
    match event {
        HookEvent::PreToolUse => {
            HookOutput::malformed(format!("❌ ERROR: Invalid tool call payload: {}\n", err))
        }
        HookEvent::TaskCompleted => {
            HookOutput::failure(format!("❌ Error updating metrics: {}\n", err))
        }
    }
}

pub fn run_cli(args: Vec<String>, cwd: &Path, stdin: &mut dyn Read) -> Result<(String, i32), String> {
    if args.len() < 2 {
        return Err(USAGE.to_string());
    }

    let command = Command::from_arg(args[1].as_str());
    if let Some(cmd) = command {
        tracing::debug!(command = cmd.name(), "running command");
    }
    match command {
        Some(Command::ProtectPaths) => {
            let ctx = HookContext::from_cwd(cwd);
            let output = match read_payload(stdin) {
                Ok(payload) => protect_paths::handle(&payload, &PathPolicy::from_config(&ctx.config)),
                Err(e) => unreadable_stdin(HookEvent::PreToolUse, &e),
            };
            Ok(output.into_pair())
        }
        Some(Command::UpdateMetrics) => {
            let ctx = HookContext::from_cwd(cwd);
            let output = match read_payload(stdin) {
                Ok(payload) => update_metrics::handle(
                    &payload,
                    &ctx.store(),
                    ctx.config.window(),
                    chrono::Utc::now(),
                ),
                Err(e) => unreadable_stdin(HookEvent::TaskCompleted, &e),
            };
            Ok(output.into_pair())
        }
        Some(Command::Hook) => {
            if args.len() < 3 {
                return Err("Usage: harness-hooks hook <event-name>".to_string());
            }
            let event_name = &args[2];
            let event = HookEvent::from_arg(event_name)
                .ok_or_else(|| format!("Unknown hook event: {}", event_name))?;

            let ctx = HookContext::from_cwd(cwd);
            match read_payload(stdin) {
                Ok(payload) => Ok(dispatcher::dispatch(&event, &payload, &ctx)),
                Err(e) => Ok(unreadable_stdin(event, &e).into_pair()),
            }
        }
        Some(Command::MetricsReport) => {
            let ctx = HookContext::from_cwd(cwd);
            metrics_report::generate_report(&ctx.store())
                .map(|s| (s, 0))
                .map_err(|e| e.to_string())
        }
        Some(Command::Help) => Ok((USAGE.to_string(), 0)),
        None => Err(format!("Unknown command: {}\n\n{}", args[1], USAGE)),
    }
}
