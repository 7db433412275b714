//! Analytics consent, event sink and daemon.
//!
//! Consent and the sticky properties live in `<home>/analytics/analytics.json`.
//! Events are emitted as structured log records under the `analytics` target
//! and are dropped unless the user opted in.

use crate::analytics::Props;
use crate::ports::{AnalyticsClient, AnalyticsDaemon, AnalyticsToggle, Ui};
use async_trait::async_trait;
use devstart_shared::errors::{DevstartError, DevstartResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ToggleState {
    /// `None` until the user has answered the opt-in prompt.
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    props: Map<String, Value>,
}

pub struct FileAnalyticsToggle {
    path: PathBuf,
    state: Mutex<ToggleState>,
}

impl FileAnalyticsToggle {
    /// Load persisted state; a missing or unreadable file means "not asked yet".
    pub fn load(path: PathBuf) -> Self {
        let state = std::fs::read(&path)
            .ok()
            .and_then(|raw| match serde_json::from_slice(&raw) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Ignoring corrupt analytics file: {}", e);
                    None
                }
            })
            .unwrap_or_default();
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn decided(&self) -> bool {
        self.lock().enabled.is_some()
    }

    pub fn set_enabled(&self, enabled: bool) -> DevstartResult<()> {
        let mut state = self.lock();
        state.enabled = Some(enabled);
        self.persist(&state)
    }

    pub fn props(&self) -> Map<String, Value> {
        self.lock().props.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ToggleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &ToggleState) -> DevstartResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(state)?;
        std::fs::write(&self.path, raw).map_err(|e| {
            DevstartError::Storage(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl AnalyticsToggle for FileAnalyticsToggle {
    fn enabled(&self) -> bool {
        self.lock().enabled.unwrap_or(false)
    }

    fn set_prop(&self, key: &str, value: &str) -> DevstartResult<()> {
        let mut state = self.lock();
        state.props.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(&state)
    }
}

pub struct TracingAnalytics {
    toggle: Arc<FileAnalyticsToggle>,
    ui: Arc<dyn Ui>,
}

impl TracingAnalytics {
    pub fn new(toggle: Arc<FileAnalyticsToggle>, ui: Arc<dyn Ui>) -> Self {
        Self { toggle, ui }
    }
}

#[async_trait]
impl AnalyticsClient for TracingAnalytics {
    async fn event(&self, name: &str, props: Props) -> DevstartResult<()> {
        if !self.toggle.enabled() {
            return Ok(());
        }

        let mut merged = self.toggle.props();
        merged.extend(props);
        tracing::info!(
            target: "analytics",
            event = %name,
            props = %serde_json::Value::Object(merged),
            "Analytics event"
        );
        Ok(())
    }

    /// Ask once on an interactive terminal; elsewhere stay opted out and ask
    /// again next time.
    async fn prompt_opt_in_if_needed(&self, message: &str) -> DevstartResult<()> {
        if self.toggle.decided() || !std::io::stdin().is_terminal() {
            return Ok(());
        }

        self.ui.say(message);
        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .map_err(|e| DevstartError::Internal(format!("prompt task failed: {e}")))??;

        self.toggle.set_enabled(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Events are logged inline, so there is no background sender to run.
#[derive(Default)]
pub struct NoopAnalyticsDaemon;

#[async_trait]
impl AnalyticsDaemon for NoopAnalyticsDaemon {
    async fn start(&self) -> DevstartResult<()> {
        Ok(())
    }

    async fn stop(&self) -> DevstartResult<()> {
        Ok(())
    }

    async fn is_running(&self) -> DevstartResult<bool> {
        Ok(false)
    }
}
