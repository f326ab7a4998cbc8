use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable that overrides `metrics_dir`.
pub const METRICS_DIR_ENV: &str = "HARNESS_METRICS_DIR";

/// Typed config struct for `.claude/hooks.json`.
/// Uses `#[serde(default)]` so missing keys fall back to defaults
/// and unknown keys are silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Substrings; any candidate path containing one is protected.
    pub protected_paths: Vec<String>,
    /// Regexes matched against candidate paths in addition to substrings.
    pub protected_patterns: Vec<String>,
    /// Tool names that mutate files. Compared after normalization.
    pub mutating_tools: Vec<String>,
    /// Directory holding the metric documents, relative to the project root.
    pub metrics_dir: String,
    /// Number of most recent quality scores in the rolling average.
    pub rolling_window: usize,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            protected_paths: vec![
                ".claude/settings.json".into(),
                ".claude/workflows/".into(),
                ".claude/hooks/".into(),
                "scripts/".into(),
                "analytics/dashboards/".into(),
                ".env".into(),
                "package-lock.json".into(),
                ".github/workflows/".into(),
            ],
            protected_patterns: Vec::new(),
            mutating_tools: vec![
                "Edit".into(),
                "MultiEdit".into(),
                "Write".into(),
                "NotebookEdit".into(),
            ],
            metrics_dir: "analytics".into(),
            rolling_window: 10,
        }
    }
}

impl HooksConfig {
    /// Rolling window, never smaller than one entry.
    pub fn window(&self) -> usize {
        self.rolling_window.max(1)
    }

    /// Resolve the metrics directory. An override (normally from
    /// `HARNESS_METRICS_DIR`) replaces the configured value; relative
    /// paths are joined onto `project_root`.
    pub fn resolve_metrics_dir(&self, project_root: &Path, override_dir: Option<&str>) -> PathBuf {
        let dir = override_dir
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.metrics_dir);
        let dir = Path::new(dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            project_root.join(dir)
        }
    }
}

/// Location of the config file under a project root.
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(".claude").join("hooks.json")
}

/// Load config from a JSON file, falling back to defaults on any error.
pub fn load_config(config_path: &Path) -> HooksConfig {
    match fs::read_to_string(config_path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %config_path.display(), error = %e, "invalid hooks config, using defaults");
            HooksConfig::default()
        }),
        Err(_) => HooksConfig::default(),
    }
}
