use chrono::{DateTime, Utc};

use super::types::HookOutput;
use crate::commands::errors::Result;
use crate::commands::metrics_recorder::{RecordOutcome, Recorder};
use crate::commands::metrics_store::MetricsStore;
use crate::commands::metrics_types::TaskEvent;

/// TaskCompleted handler: fold the event on stdin into the metric documents.
///
/// Exit 0 on success (including an empty event), 1 on any failure. Documents
/// written before a failure stay written.
pub fn handle<S: MetricsStore + ?Sized>(
    payload: &str,
    store: &S,
    window: usize,
    now: DateTime<Utc>,
) -> HookOutput {
    match record(payload, store, window, now) {
        Ok(outcome) => HookOutput::ok(render(&outcome)),
        Err(e) => {
            tracing::debug!(error = %e, "metrics update failed");
            HookOutput::failure(format!("❌ Error updating metrics: {}\n", e))
        }
    }
}

fn record<S: MetricsStore + ?Sized>(
    payload: &str,
    store: &S,
    window: usize,
    now: DateTime<Utc>,
) -> Result<RecordOutcome> {
    let event = TaskEvent::parse(payload)?;
    Recorder::new(store).with_window(window).record(&event, now)
}

fn render(outcome: &RecordOutcome) -> String {
    let mut out = String::new();
    if let Some(task_id) = &outcome.delivered_task {
        out.push_str(&format!("📊 Updated delivery metrics: Task {} completed\n", task_id));
    }
    if let Some(avg) = outcome.rolling_average {
        // Debug keeps the stored value's shortest form: 8.0, 8.12
        out.push_str(&format!("📈 Updated quality metrics: Average score {:?}\n", avg));
    }
    if let Some(agent) = &outcome.team_agent {
        out.push_str(&format!("👥 Updated team metrics for agent: {}\n", agent));
    }
    out.push_str("✅ Metrics update completed successfully\n");
    out
}
