use serde_json::Value;

use super::errors::Result;
use super::metrics_store::{MetricsStore, load_doc};
use super::metrics_types::{AgentPerformance, DeliveryMetrics, MetricsDoc, QualityMetrics, TeamMetrics};

fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Render a plain-text summary of the three metric documents.
pub fn generate_report<S: MetricsStore + ?Sized>(store: &S) -> Result<String> {
    let delivery: DeliveryMetrics = load_doc(store, MetricsDoc::Delivery)?;
    let quality: QualityMetrics = load_doc(store, MetricsDoc::Quality)?;
    let team: TeamMetrics = load_doc(store, MetricsDoc::Team)?;

    let mut out = String::new();
    out.push_str("# Task Metrics Report\n\n");

    out.push_str("## Delivery\n");
    if delivery.completions.is_empty() {
        out.push_str("- No completed tasks recorded\n");
    } else {
        let total = delivery
            .total_tasks_completed
            .unwrap_or(delivery.completions.len());
        out.push_str(&format!("- Tasks completed: {}\n", total));
        if let Some(last) = delivery.completions.last() {
            let field = |key: &str| last.get(key).and_then(Value::as_str).unwrap_or("?").to_string();
            out.push_str(&format!("- Last task: {} ({})\n", field("task_id"), field("agent")));
        }
        if let Some(ts) = &delivery.last_updated {
            out.push_str(&format!("- Last updated: {}\n", ts));
        }
    }
    out.push('\n');

    out.push_str("## Quality\n");
    if quality.quality_scores.is_empty() {
        out.push_str("- No quality scores recorded\n");
    } else {
        out.push_str(&format!("- Scores recorded: {}\n", quality.quality_scores.len()));
        match quality.rolling_average {
            Some(avg) => out.push_str(&format!("- Rolling average: {:.2}\n", avg)),
            None => out.push_str("- Rolling average: N/A\n"),
        }
    }
    out.push('\n');

    out.push_str("## Team\n");
    if team.agent_performance.is_empty() {
        out.push_str("- No agent activity recorded\n");
    } else {
        for (agent, record) in &team.agent_performance {
            let Ok(perf) = serde_json::from_value::<AgentPerformance>(record.clone()) else {
                out.push_str(&format!("- {}: unrecognized record\n", agent));
                continue;
            };
            let avg = perf
                .avg_quality
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "N/A".to_string());
            out.push_str(&format!(
                "- {}: {} task(s), {} min, avg quality {}\n",
                agent,
                perf.tasks_completed,
                fmt_number(perf.total_duration),
                avg
            ));
        }
    }

    Ok(out)
}
