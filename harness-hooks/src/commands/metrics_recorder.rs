//! Merges task-completion events into the delivery, quality and team documents.
//!
//! Each document is updated only when the event carries its trigger field:
//! `task_id` for delivery, `quality_score` for quality, a named agent for team.
//! Documents are loaded, updated and saved one after another, so a failure
//! part-way leaves earlier documents written.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::errors::{HookError, Result};
use super::metrics_store::{MetricsStore, load_doc, save_doc};
use super::metrics_types::{
    AgentPerformance, CompletionRecord, DeliveryMetrics, MetricsDoc, QualityEntry, QualityMetrics,
    TaskEvent, TeamMetrics, UNKNOWN_AGENT, entry_score,
};

/// Default number of recent scores in the quality rolling average.
pub const DEFAULT_ROLLING_WINDOW: usize = 10;

/// What a single event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOutcome {
    /// Task id appended to the delivery document.
    pub delivered_task: Option<String>,
    /// New rolling average, when the quality document changed.
    pub rolling_average: Option<f64>,
    /// Agent whose team record changed.
    pub team_agent: Option<String>,
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Round to two decimals, exact ties going to the even neighbour.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    Some(values.sum::<f64>() / n as f64)
}

/// Mean score over the last `window` entries, rounded to two decimals.
/// Entries without a numeric `score` are left out of the mean.
pub fn rolling_average(entries: &[Value], window: usize) -> Option<f64> {
    let start = entries.len().saturating_sub(window.max(1));
    let scores: Vec<f64> = entries[start..].iter().filter_map(entry_score).collect();
    mean(scores.into_iter()).map(round2)
}

fn to_entry<T: Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| HookError::Serialization {
        context: "metrics record",
        details: e.to_string(),
    })
}

/// Append a completion record when the event has a task id.
pub fn apply_delivery(doc: &mut DeliveryMetrics, event: &TaskEvent, timestamp: &str) -> Result<bool> {
    let Some(task_id) = event.task_id.as_deref() else {
        return Ok(false);
    };

    doc.completions.push(to_entry(&CompletionRecord {
        task_id: task_id.to_string(),
        completed_at: timestamp.to_string(),
        agent: event.agent_or_unknown().to_string(),
        duration: event.duration_or_zero(),
        quality_score: event.quality_score.unwrap_or(0.0),
    })?);
    doc.total_tasks_completed = Some(doc.completions.len());
    doc.last_updated = Some(timestamp.to_string());
    Ok(true)
}

/// Append a quality entry and recompute the rolling average when the event has a score.
pub fn apply_quality(
    doc: &mut QualityMetrics,
    event: &TaskEvent,
    timestamp: &str,
    window: usize,
) -> Result<Option<f64>> {
    let Some(score) = event.quality_score else {
        return Ok(None);
    };

    doc.quality_scores.push(to_entry(&QualityEntry {
        timestamp: timestamp.to_string(),
        score,
        agent: event.agent_or_unknown().to_string(),
        feature: event.feature_or_unknown().to_string(),
    })?);
    doc.rolling_average = rolling_average(&doc.quality_scores, window);
    doc.last_updated = Some(timestamp.to_string());
    Ok(doc.rolling_average)
}

/// Update the per-agent record when the event names a real agent.
///
/// Records of other agents are not decoded. A record for this agent that does
/// not fit the expected shape fails the update.
pub fn apply_team(doc: &mut TeamMetrics, event: &TaskEvent, timestamp: &str) -> Result<bool> {
    let agent = event.agent_or_unknown();
    if agent == UNKNOWN_AGENT {
        return Ok(false);
    }

    let mut perf: AgentPerformance = match doc.agent_performance.get(agent) {
        Some(existing) => {
            serde_json::from_value(existing.clone()).map_err(|e| HookError::ForeignDocument {
                doc: format!("{} (agent {})", MetricsDoc::Team, agent),
                details: e.to_string(),
            })?
        }
        None => AgentPerformance::default(),
    };

    perf.tasks_completed += 1;
    perf.total_duration += event.duration_or_zero();
    if let Some(score) = event.quality_score {
        perf.quality_scores.push(score);
        perf.avg_quality = mean(perf.quality_scores.iter().copied());
    }

    doc.agent_performance.insert(agent.to_string(), to_entry(&perf)?);
    doc.last_updated = Some(timestamp.to_string());
    Ok(true)
}

/// Applies events against a [`MetricsStore`].
pub struct Recorder<'a, S: MetricsStore + ?Sized> {
    store: &'a S,
    window: usize,
}

impl<'a, S: MetricsStore + ?Sized> Recorder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            window: DEFAULT_ROLLING_WINDOW,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn record(&self, event: &TaskEvent, now: DateTime<Utc>) -> Result<RecordOutcome> {
        let timestamp = format_timestamp(now);
        let mut outcome = RecordOutcome::default();

        if event.task_id.is_some() {
            let mut delivery: DeliveryMetrics = load_doc(self.store, MetricsDoc::Delivery)?;
            if apply_delivery(&mut delivery, event, &timestamp)? {
                save_doc(self.store, MetricsDoc::Delivery, &delivery)?;
                outcome.delivered_task = event.task_id.clone();
                tracing::debug!(total = delivery.completions.len(), "delivery metrics saved");
            }
        }

        if event.quality_score.is_some() {
            let mut quality: QualityMetrics = load_doc(self.store, MetricsDoc::Quality)?;
            if let Some(avg) = apply_quality(&mut quality, event, &timestamp, self.window)? {
                save_doc(self.store, MetricsDoc::Quality, &quality)?;
                outcome.rolling_average = Some(avg);
                tracing::debug!(rolling_average = avg, "quality metrics saved");
            }
        }

        if event.agent_or_unknown() != UNKNOWN_AGENT {
            let mut team: TeamMetrics = load_doc(self.store, MetricsDoc::Team)?;
            if apply_team(&mut team, event, &timestamp)? {
                save_doc(self.store, MetricsDoc::Team, &team)?;
                outcome.team_agent = Some(event.agent_or_unknown().to_string());
                tracing::debug!(agent = event.agent_or_unknown(), "team metrics saved");
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::metrics_store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    fn event(task: Option<&str>, agent: Option<&str>, duration: Option<f64>, score: Option<f64>) -> TaskEvent {
        TaskEvent {
            task_id: task.map(String::from),
            agent: agent.map(String::from),
            duration_minutes: duration,
            quality_score: score,
            feature: None,
        }
    }

    fn entry(score: f64) -> Value {
        json!({"timestamp": "t", "score": score, "agent": "a", "feature": "f"})
    }

    fn doc_json(store: &MemoryStore, doc: MetricsDoc) -> Value {
        serde_json::from_str(&store.get(doc).unwrap()).unwrap()
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(8.0), 8.0);
        assert_eq!(round2(8.333333), 8.33);
        assert_eq!(round2(8.666666), 8.67);
        // exact ties go to the even neighbour
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(8.125), 8.12);
        assert_eq!(round2(0.375), 0.38);
    }

    #[test]
    fn test_rolling_average_tie_rounds_to_even() {
        let entries = vec![entry(8.0), entry(8.25)];
        assert_eq!(rolling_average(&entries, 10), Some(8.12));
    }

    #[test]
    fn test_rolling_average_skips_entries_without_score() {
        let entries = vec![entry(6.0), json!({"score": null}), json!("legacy"), entry(8.0)];
        assert_eq!(rolling_average(&entries, 10), Some(7.0));
        assert_eq!(rolling_average(&[json!({})], 10), None);
    }

    #[test]
    fn test_rolling_average_short_list() {
        let entries = vec![entry(8.0), entry(9.0), entry(7.0)];
        assert_eq!(rolling_average(&entries, 10), Some(8.0));
        assert_eq!(rolling_average(&[], 10), None);
    }

    #[test]
    fn test_rolling_average_uses_last_window_only() {
        // 12 scores: 0, 0, then ten 5s -> window of 10 sees only the 5s
        let mut entries = vec![entry(0.0), entry(0.0)];
        entries.extend((0..10).map(|_| entry(5.0)));
        assert_eq!(rolling_average(&entries, 10), Some(5.0));

        let entries: Vec<Value> = (1..=12).map(|i| entry(i as f64)).collect();
        // last 10 of 1..=12 is 3..=12 -> mean 7.5
        assert_eq!(rolling_average(&entries, 10), Some(7.5));
        // last 3 is 10, 11, 12 -> 11
        assert_eq!(rolling_average(&entries, 3), Some(11.0));
    }

    #[test]
    fn test_rolling_average_rounds() {
        let entries = vec![entry(1.0), entry(2.0), entry(2.0)];
        assert_eq!(rolling_average(&entries, 10), Some(1.67));
    }

    #[test]
    fn test_three_runs_scenario() {
        let store = MemoryStore::new();
        let recorder = Recorder::new(&store);

        for score in [8.0, 9.0, 7.0] {
            let ev = event(Some("T1"), Some("alice"), Some(30.0), Some(score));
            recorder.record(&ev, now()).unwrap();
        }

        let quality = doc_json(&store, MetricsDoc::Quality);
        assert_eq!(quality["rolling_average"], 8.0);
        assert_eq!(quality["quality_scores"].as_array().unwrap().len(), 3);

        let team = doc_json(&store, MetricsDoc::Team);
        let alice = &team["agent_performance"]["alice"];
        assert_eq!(alice["tasks_completed"], 3);
        assert_eq!(alice["total_duration"], 90.0);
        assert_eq!(alice["avg_quality"], 8.0);
        assert_eq!(alice["quality_scores"].as_array().unwrap().len(), 3);

        let delivery = doc_json(&store, MetricsDoc::Delivery);
        assert_eq!(delivery["total_tasks_completed"], 3);
        assert_eq!(delivery["completions"][0]["task_id"], "T1");
        assert_eq!(delivery["completions"][0]["completed_at"], "2026-03-14T09:30:00Z");
        assert_eq!(delivery["last_updated"], "2026-03-14T09:30:00Z");
    }

    #[test]
    fn test_team_average_is_unrounded() {
        let store = MemoryStore::new();
        let recorder = Recorder::new(&store);
        for score in [1.0, 2.0, 2.0] {
            recorder
                .record(&event(None, Some("bob"), None, Some(score)), now())
                .unwrap();
        }
        let team = doc_json(&store, MetricsDoc::Team);
        let avg = team["agent_performance"]["bob"]["avg_quality"].as_f64().unwrap();
        assert!((avg - 5.0 / 3.0).abs() < 1e-12);

        let quality: QualityMetrics = load_doc(&store, MetricsDoc::Quality).unwrap();
        assert_eq!(quality.rolling_average, Some(1.67));
    }

    #[test]
    fn test_empty_event_touches_nothing() {
        let store = MemoryStore::new();
        let outcome = Recorder::new(&store).record(&TaskEvent::default(), now()).unwrap();
        assert_eq!(outcome, RecordOutcome::default());
        for doc in MetricsDoc::ALL {
            assert!(store.get(doc).is_none());
        }
    }

    #[test]
    fn test_task_without_agent_or_score() {
        let store = MemoryStore::new();
        let outcome = Recorder::new(&store)
            .record(&event(Some("T9"), None, None, None), now())
            .unwrap();
        assert_eq!(outcome.delivered_task.as_deref(), Some("T9"));
        assert_eq!(outcome.rolling_average, None);
        assert_eq!(outcome.team_agent, None);

        let delivery = doc_json(&store, MetricsDoc::Delivery);
        let rec = &delivery["completions"][0];
        assert_eq!(rec["agent"], "unknown");
        assert_eq!(rec["duration"], 0.0);
        assert_eq!(rec["quality_score"], 0.0);
        assert!(store.get(MetricsDoc::Quality).is_none());
        assert!(store.get(MetricsDoc::Team).is_none());
    }

    #[test]
    fn test_score_without_task_id() {
        let store = MemoryStore::new();
        let mut ev = event(None, None, None, Some(6.5));
        ev.feature = Some("search".into());
        let outcome = Recorder::new(&store).record(&ev, now()).unwrap();
        assert_eq!(outcome.rolling_average, Some(6.5));
        assert!(store.get(MetricsDoc::Delivery).is_none());

        let quality = doc_json(&store, MetricsDoc::Quality);
        assert_eq!(quality["quality_scores"][0]["feature"], "search");
        assert_eq!(quality["quality_scores"][0]["agent"], "unknown");
    }

    #[test]
    fn test_unknown_agent_sentinel_skips_team() {
        let store = MemoryStore::new();
        Recorder::new(&store)
            .record(&event(Some("T1"), Some("unknown"), Some(5.0), None), now())
            .unwrap();
        assert!(store.get(MetricsDoc::Team).is_none());
    }

    #[test]
    fn test_team_without_score_keeps_average_absent() {
        let store = MemoryStore::new();
        Recorder::new(&store)
            .record(&event(None, Some("carol"), Some(12.0), None), now())
            .unwrap();
        let team = doc_json(&store, MetricsDoc::Team);
        let carol = &team["agent_performance"]["carol"];
        assert_eq!(carol["tasks_completed"], 1);
        assert_eq!(carol["total_duration"], 12.0);
        assert!(carol.get("avg_quality").is_none());
    }

    #[test]
    fn test_corrupt_existing_document_starts_over() {
        let store = MemoryStore::new().with(MetricsDoc::Delivery, "not json at all");
        Recorder::new(&store)
            .record(&event(Some("T2"), None, None, None), now())
            .unwrap();
        let delivery = doc_json(&store, MetricsDoc::Delivery);
        assert_eq!(delivery["total_tasks_completed"], 1);
    }

    #[test]
    fn test_appends_to_existing_document() {
        let existing = r#"{"completions":[{"task_id":"T0","completed_at":"x","agent":"a","duration":1,"quality_score":2}],"total_tasks_completed":1}"#;
        let store = MemoryStore::new().with(MetricsDoc::Delivery, existing);
        Recorder::new(&store)
            .record(&event(Some("T1"), None, None, None), now())
            .unwrap();
        let delivery = doc_json(&store, MetricsDoc::Delivery);
        assert_eq!(delivery["total_tasks_completed"], 2);
        assert_eq!(delivery["completions"][0]["task_id"], "T0");
        assert_eq!(delivery["completions"][1]["task_id"], "T1");
    }

    #[test]
    fn test_existing_records_of_any_shape_are_kept() {
        let existing = json!({
            "completions": [
                {"task_id": "T-old", "completed_at": "2025-01-01T00:00:00", "agent": null, "duration": 0, "quality_score": 0},
                {"task_id": "T00", "completed_at": "x", "agent": "a", "duration": 1, "quality_score": 2}
            ],
            "total_tasks_completed": 2,
            "source": "legacy-import"
        });
        let store = MemoryStore::new().with(MetricsDoc::Delivery, existing.to_string());
        Recorder::new(&store)
            .record(&event(Some("T1"), None, None, None), now())
            .unwrap();

        let delivery = doc_json(&store, MetricsDoc::Delivery);
        assert_eq!(delivery["total_tasks_completed"], 3);
        assert_eq!(delivery["completions"][0]["task_id"], "T-old");
        assert_eq!(delivery["completions"][0]["agent"], Value::Null);
        assert_eq!(delivery["completions"][2]["task_id"], "T1");
        assert_eq!(delivery["source"], "legacy-import");
    }

    #[test]
    fn test_wrong_shaped_document_is_left_untouched() {
        let existing = r#"{"quality_scores": {"not": "a list"}}"#;
        let store = MemoryStore::new().with(MetricsDoc::Quality, existing);
        let err = Recorder::new(&store)
            .record(&event(None, None, None, Some(7.0)), now())
            .unwrap_err();
        assert_eq!(err.code(), "HH-1003");
        assert_eq!(store.get(MetricsDoc::Quality).as_deref(), Some(existing));
    }

    #[test]
    fn test_team_update_sets_last_updated_and_keeps_other_agents() {
        let existing = json!({
            "agent_performance": {
                "legacy": "retired",
                "alice": {"tasks_completed": 1, "total_duration": 10, "quality_scores": [6], "avg_quality": 6.0, "role": "lead"}
            },
            "last_updated": "2025-01-01T00:00:00"
        });
        let store = MemoryStore::new().with(MetricsDoc::Team, existing.to_string());
        Recorder::new(&store)
            .record(&event(None, Some("alice"), Some(5.0), Some(8.0)), now())
            .unwrap();

        let team = doc_json(&store, MetricsDoc::Team);
        assert_eq!(team["last_updated"], "2026-03-14T09:30:00Z");
        assert_eq!(team["agent_performance"]["legacy"], "retired");
        let alice = &team["agent_performance"]["alice"];
        assert_eq!(alice["tasks_completed"], 2);
        assert_eq!(alice["total_duration"], 15.0);
        assert_eq!(alice["avg_quality"], 7.0);
        assert_eq!(alice["role"], "lead");
    }

    #[test]
    fn test_wrong_shaped_agent_record_fails_update() {
        let existing = r#"{"agent_performance": {"bob": {"tasks_completed": "many"}}}"#;
        let store = MemoryStore::new().with(MetricsDoc::Team, existing);
        let err = Recorder::new(&store)
            .record(&event(None, Some("bob"), None, None), now())
            .unwrap_err();
        assert_eq!(err.code(), "HH-1003");
        assert_eq!(store.get(MetricsDoc::Team).as_deref(), Some(existing));
    }

    #[test]
    fn test_custom_window() {
        let store = MemoryStore::new();
        let recorder = Recorder::new(&store).with_window(2);
        for score in [1.0, 4.0, 6.0] {
            recorder.record(&event(None, None, None, Some(score)), now()).unwrap();
        }
        let quality: QualityMetrics = load_doc(&store, MetricsDoc::Quality).unwrap();
        assert_eq!(quality.rolling_average, Some(5.0));
    }

    struct FailingTeamStore {
        inner: MemoryStore,
    }

    impl MetricsStore for FailingTeamStore {
        fn load_raw(&self, doc: MetricsDoc) -> Result<Option<String>> {
            self.inner.load_raw(doc)
        }

        fn save_raw(&self, doc: MetricsDoc, content: &str) -> Result<()> {
            if doc == MetricsDoc::Team {
                return Err(HookError::io(
                    "team-metrics.json",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            self.inner.save_raw(doc, content)
        }
    }

    #[test]
    fn test_failure_keeps_earlier_writes() {
        let store = FailingTeamStore {
            inner: MemoryStore::new(),
        };
        let err = Recorder::new(&store)
            .record(&event(Some("T1"), Some("dave"), Some(3.0), Some(9.0)), now())
            .unwrap_err();
        assert_eq!(err.code(), "HH-2001");
        assert!(store.inner.get(MetricsDoc::Delivery).is_some());
        assert!(store.inner.get(MetricsDoc::Quality).is_some());
        assert!(store.inner.get(MetricsDoc::Team).is_none());
    }
}
