//! Native hook handlers for agent harness events.
//!
//! Supported hook events and their handlers:
//!   - **PreToolUse**: `protect_paths` (blocks edits to protected paths)
//!   - **TaskCompleted**: `update_metrics` (delivery, quality and team metrics)
//!
//! All events are dispatched via `dispatcher::dispatch()`.
//! Entry point: `harness-hooks hook <event-name>` (reads JSON from stdin).

pub mod dispatcher;
pub mod types;
pub mod utils;

pub mod protect_paths;
pub mod update_metrics;
