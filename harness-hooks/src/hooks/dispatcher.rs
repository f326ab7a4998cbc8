use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::protect_paths::{self, PathPolicy};
use super::types::{EXIT_OK, HookEvent, HookOutput};
use super::update_metrics;
use super::utils;
use crate::commands::config::{self, HooksConfig, METRICS_DIR_ENV};
use crate::commands::metrics_store::FsStore;

/// Everything a handler needs that comes from the environment.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub project_root: PathBuf,
    pub config: HooksConfig,
    pub metrics_dir: PathBuf,
}

impl HookContext {
    pub fn new(project_root: PathBuf, config: HooksConfig, metrics_override: Option<&str>) -> Self {
        let metrics_dir = config.resolve_metrics_dir(&project_root, metrics_override);
        Self {
            project_root,
            config,
            metrics_dir,
        }
    }

    /// Resolve project root, config file and `HARNESS_METRICS_DIR` from `cwd`.
    pub fn from_cwd(cwd: &Path) -> Self {
        let project_root = utils::project_root_or_cwd(cwd);
        let config = config::load_config(&config::config_path(&project_root));
        let metrics_override = env::var(METRICS_DIR_ENV).ok();
        Self::new(project_root, config, metrics_override.as_deref())
    }

    pub fn store(&self) -> FsStore {
        FsStore::new(&self.metrics_dir)
    }
}

/// Dispatch a hook event to the appropriate handler.
///
/// - Routes `stdin_json` to the handler for `event`
/// - Non-zero results are also written to `.claude/.hook-errors.log`
/// - Never panics
pub fn dispatch(event: &HookEvent, stdin_json: &str, ctx: &HookContext) -> (String, i32) {
    let output = route_event(event, stdin_json, ctx);

    if output.exit_code != EXIT_OK {
        utils::log_hook_error(&ctx.project_root, event.name(), output.exit_code, &output.stdout);
    }

    output.into_pair()
}

fn route_event(event: &HookEvent, stdin_json: &str, ctx: &HookContext) -> HookOutput {
    match event {
        HookEvent::PreToolUse => {
            let policy = PathPolicy::from_config(&ctx.config);
            protect_paths::handle(stdin_json, &policy)
        }
        HookEvent::TaskCompleted => {
            let store = ctx.store();
            update_metrics::handle(stdin_json, &store, ctx.config.window(), Utc::now())
        }
    }
}
