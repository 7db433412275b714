//! Session watchdog.
//!
//! Armed once per start, it waits for whichever comes first: the normal-exit
//! signal, or a dependent daemon reporting that it died. Only the failure path
//! has side effects: the VM is stopped and the process exits with
//! [`WATCHDOG_EXIT_CODE`].

use crate::constants::WATCHDOG_EXIT_CODE;
use crate::ports::{ShutdownHook, Ui, VmDriver};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How the watchdog resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// Normal exit signalled, or every exit sender was dropped.
    Disarmed,
    /// The named daemon stopped; the VM was stopped and the fatal hook called.
    Failed(String),
}

/// Sending half, held by whoever owns the session.
pub struct WatchdogSignals {
    exit: oneshot::Sender<()>,
    failure: mpsc::Sender<String>,
}

impl WatchdogSignals {
    /// Disarm the watchdog.
    pub fn exit(self) {
        let _ = self.exit.send(());
    }

    /// Cloneable handle for daemon supervisors.
    pub fn failure_notifier(&self) -> FailureNotifier {
        FailureNotifier {
            tx: self.failure.clone(),
        }
    }
}

/// Reports a dead daemon to the watchdog.
#[derive(Clone)]
pub struct FailureNotifier {
    tx: mpsc::Sender<String>,
}

impl FailureNotifier {
    /// Returns false when the watchdog has already resolved.
    pub fn notify(&self, daemon: impl Into<String>) -> bool {
        self.tx.try_send(daemon.into()).is_ok()
    }
}

/// Receiving half, consumed when the watchdog is armed.
pub struct WatchdogListener {
    exit: oneshot::Receiver<()>,
    failure: mpsc::Receiver<String>,
}

pub fn watchdog_channel() -> (WatchdogSignals, WatchdogListener) {
    let (exit_tx, exit_rx) = oneshot::channel();
    let (failure_tx, failure_rx) = mpsc::channel(4);
    (
        WatchdogSignals {
            exit: exit_tx,
            failure: failure_tx,
        },
        WatchdogListener {
            exit: exit_rx,
            failure: failure_rx,
        },
    )
}

#[derive(Clone)]
pub struct WatchdogMonitor {
    driver: Arc<dyn VmDriver>,
    ui: Arc<dyn Ui>,
    hook: Arc<dyn ShutdownHook>,
}

impl WatchdogMonitor {
    pub fn new(driver: Arc<dyn VmDriver>, ui: Arc<dyn Ui>, hook: Arc<dyn ShutdownHook>) -> Self {
        Self { driver, ui, hook }
    }

    /// Spawn the watchdog task.
    pub fn arm(&self, listener: WatchdogListener) -> JoinHandle<WatchdogOutcome> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.watch(listener).await })
    }

    async fn watch(self, listener: WatchdogListener) -> WatchdogOutcome {
        let WatchdogListener {
            exit,
            mut failure,
        } = listener;

        let daemon = tokio::select! {
            biased;
            _ = exit => None,
            Some(name) = failure.recv() => Some(name),
        };

        let Some(name) = daemon else {
            tracing::debug!("Watchdog disarmed");
            return WatchdogOutcome::Disarmed;
        };

        tracing::error!(daemon = %name, "Dependent daemon stopped, shutting down VM");
        self.ui.say(&format!("ERROR: {} has stopped", name));

        if let Err(e) = self.driver.stop().await {
            tracing::warn!("Failed to stop VM after {} stopped: {}", name, e);
        }

        self.hook.fatal_exit(WATCHDOG_EXIT_CODE);
        WatchdogOutcome::Failed(name)
    }
}
