use super::*;
use crate::analytics::Props;
use crate::metadata::{Metadata, Service};
use crate::ports::{
    AnalyticsClient, AnalyticsDaemon, AnalyticsToggle, Cache, Env, Host, HostNet, MemoryProfiler,
    MetadataReader, PrivilegedSetup, ProvisionExecutor, Provisioner, ShutdownHook, Teardown, Ui,
    VmDriver,
};
use crate::resource::{Catalog, Item};
use crate::watchdog::{WatchdogOutcome, WatchdogSignals, watchdog_channel};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const GIB: u64 = 1024 * 1024 * 1024;

/// One fake standing in for every collaborator, recording calls in order.
struct World {
    calls: StdMutex<Vec<String>>,
    said: StdMutex<Vec<String>>,
    events: StdMutex<Vec<(String, Props)>>,
    props: StdMutex<Vec<(String, String)>>,
    synced: StdMutex<Vec<Vec<String>>>,
    state_from: StdMutex<Option<PathBuf>>,
    started_with: StdMutex<Option<(u32, u64, PathBuf)>>,
    exits: StdMutex<Vec<i32>>,
    failing: StdMutex<HashSet<&'static str>>,
    running: AtomicBool,
    analytics_enabled: AtomicBool,
    /// Number of leading `available_memory` calls that fail.
    available_failures: AtomicUsize,
    available_bytes: u64,
    metadata: StdMutex<Option<Metadata>>,
}

impl World {
    fn new() -> Self {
        Self {
            calls: StdMutex::new(Vec::new()),
            said: StdMutex::new(Vec::new()),
            events: StdMutex::new(Vec::new()),
            props: StdMutex::new(Vec::new()),
            synced: StdMutex::new(Vec::new()),
            state_from: StdMutex::new(None),
            started_with: StdMutex::new(None),
            exits: StdMutex::new(Vec::new()),
            failing: StdMutex::new(HashSet::new()),
            running: AtomicBool::new(false),
            analytics_enabled: AtomicBool::new(true),
            available_failures: AtomicUsize::new(0),
            available_bytes: 16 * GIB,
            metadata: StdMutex::new(Some(compatible_metadata())),
        }
    }

    fn fail_on(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn call(&self, op: &'static str) -> DevstartResult<()> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.failing.lock().unwrap().contains(op) {
            return Err(DevstartError::External(format!("{op} failed")));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn called(&self, op: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == op)
    }

    fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn event(&self, name: &str) -> Option<Props> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, props)| props.clone())
    }

    fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }
}

fn compatible_metadata() -> Metadata {
    Metadata {
        version: "v4".into(),
        deployment_name: "cf".into(),
        artifact_version: "2.1.0".into(),
        analytics_message: "Help improve devstart?".into(),
        default_memory: 0,
        services: vec![Service {
            name: "Mysql".into(),
            flagname: "mysql".into(),
            ..Default::default()
        }],
    }
}

impl Ui for World {
    fn say(&self, message: &str) {
        self.said.lock().unwrap().push(message.to_string());
    }
}

#[async_trait]
impl Host for World {
    async fn check_requirements(&self) -> DevstartResult<()> {
        self.call("check_requirements")
    }
}

#[async_trait]
impl MemoryProfiler for World {
    async fn available_memory(&self) -> DevstartResult<u64> {
        self.call("available_memory")?;
        let failed = self
            .available_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DevstartError::External("sysinfo unavailable".into()));
        }
        Ok(self.available_bytes)
    }

    async fn total_memory(&self) -> DevstartResult<u64> {
        self.call("total_memory")?;
        Ok(32 * GIB)
    }
}

#[async_trait]
impl Cache for World {
    async fn sync(&self, catalog: &Catalog) -> DevstartResult<()> {
        self.synced
            .lock()
            .unwrap()
            .push(catalog.items.iter().map(|i| i.name.clone()).collect());
        self.call("cache_sync")
    }
}

#[async_trait]
impl Teardown for World {
    async fn run(&self) -> DevstartResult<()> {
        self.call("teardown")
    }
}

#[async_trait]
impl Env for World {
    async fn create_dirs(&self) -> DevstartResult<()> {
        self.call("create_dirs")
    }

    async fn setup_state(&self, deps_path: &Path) -> DevstartResult<()> {
        *self.state_from.lock().unwrap() = Some(deps_path.to_path_buf());
        self.call("setup_state")
    }
}

#[async_trait]
impl PrivilegedSetup for World {
    async fn setup(&self) -> DevstartResult<()> {
        self.call("privileged_setup")
    }
}

#[async_trait]
impl HostNet for World {
    async fn add_loopback_aliases(&self, _switch: &str, _addrs: &[String]) -> DevstartResult<()> {
        self.call("add_aliases")
    }
}

#[async_trait]
impl VmDriver for World {
    async fn start(&self, cpus: u32, memory_mb: u64, firmware: &Path) -> DevstartResult<()> {
        self.call("vm_start")?;
        *self.started_with.lock().unwrap() = Some((cpus, memory_mb, firmware.to_path_buf()));
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> DevstartResult<()> {
        self.call("vm_stop")?;
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_running(&self) -> DevstartResult<bool> {
        self.call("is_running")?;
        Ok(self.running.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl MetadataReader for World {
    async fn read(&self, _path: &Path) -> DevstartResult<Metadata> {
        self.call("metadata_read")?;
        self.metadata
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DevstartError::Storage("metadata.json missing".into()))
    }
}

#[async_trait]
impl Provisioner for World {
    async fn ping(&self, timeout: Duration) -> DevstartResult<()> {
        assert_eq!(timeout, Duration::from_secs(120));
        self.call("ping")
    }
}

#[async_trait]
impl ProvisionExecutor for World {
    async fn execute(&self, _args: &StartupArgs) -> DevstartResult<()> {
        self.call("provision")
    }
}

#[async_trait]
impl AnalyticsClient for World {
    async fn event(&self, name: &str, props: Props) -> DevstartResult<()> {
        self.events.lock().unwrap().push((name.to_string(), props));
        Ok(())
    }

    async fn prompt_opt_in_if_needed(&self, _message: &str) -> DevstartResult<()> {
        self.call("prompt_opt_in")
    }
}

impl AnalyticsToggle for World {
    fn enabled(&self) -> bool {
        self.analytics_enabled.load(Ordering::SeqCst)
    }

    fn set_prop(&self, key: &str, value: &str) -> DevstartResult<()> {
        self.props
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

#[async_trait]
impl AnalyticsDaemon for World {
    async fn start(&self) -> DevstartResult<()> {
        self.call("analyticsd_start")
    }

    async fn stop(&self) -> DevstartResult<()> {
        self.call("analyticsd_stop")
    }

    async fn is_running(&self) -> DevstartResult<bool> {
        Ok(false)
    }
}

impl ShutdownHook for World {
    fn fatal_exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }
}

fn collaborators(world: &Arc<World>) -> Collaborators {
    Collaborators {
        ui: Arc::clone(world) as Arc<dyn Ui>,
        host: Arc::clone(world) as Arc<dyn Host>,
        profiler: Arc::clone(world) as Arc<dyn MemoryProfiler>,
        cache: Arc::clone(world) as Arc<dyn Cache>,
        teardown: Arc::clone(world) as Arc<dyn Teardown>,
        env: Arc::clone(world) as Arc<dyn Env>,
        privileged: Arc::clone(world) as Arc<dyn PrivilegedSetup>,
        host_net: Arc::clone(world) as Arc<dyn HostNet>,
        driver: Arc::clone(world) as Arc<dyn VmDriver>,
        metadata_reader: Arc::clone(world) as Arc<dyn MetadataReader>,
        provisioner: Arc::clone(world) as Arc<dyn Provisioner>,
        provision: Arc::clone(world) as Arc<dyn ProvisionExecutor>,
        analytics: Arc::clone(world) as Arc<dyn AnalyticsClient>,
        toggle: Arc::clone(world) as Arc<dyn AnalyticsToggle>,
        analytics_daemon: Arc::clone(world) as Arc<dyn AnalyticsDaemon>,
        shutdown: Arc::clone(world) as Arc<dyn ShutdownHook>,
    }
}

fn item(name: &str) -> Item {
    Item {
        name: name.to_string(),
        url: format!("https://example.invalid/{name}"),
        sha256: None,
        size: None,
    }
}

struct Harness {
    home: TempDir,
    world: Arc<World>,
    orchestrator: Orchestrator,
    signals: WatchdogSignals,
}

impl Harness {
    fn new(world: World) -> Self {
        Self::with_catalog(world, Catalog::default())
    }

    fn with_catalog(world: World, dependencies: Catalog) -> Self {
        let home = TempDir::new().unwrap();
        let options = DevstartOptions {
            home_dir: home.path().to_path_buf(),
            dependencies,
            ..Default::default()
        };
        let world = Arc::new(world);
        let (signals, listener) = watchdog_channel();
        let orchestrator = Orchestrator::new(options, collaborators(&world), listener);
        Self {
            home,
            world,
            orchestrator,
            signals,
        }
    }

    fn args(&self) -> StartupArgs {
        StartupArgs::new(self.home.path().join("bin").join("devstart-efi-v2.iso"))
    }

    fn default_deps(&self) -> PathBuf {
        self.home.path().join("cache").join("devstart-deps.tgz")
    }
}

#[tokio::test]
async fn test_full_start_reaches_done() {
    let h = Harness::new(World::new());

    let report = h.orchestrator.execute(h.args()).await.unwrap();

    assert_eq!(report.state, StartupState::Done);
    assert_eq!(report.outcome, StartOutcome::Completed);
    assert!(report.metrics.finished_by.is_none());
    assert_eq!(report.memory.as_ref().unwrap().allocated_mb, 4192);

    let calls = h.world.calls();
    let sequence: Vec<&str> = calls
        .iter()
        .map(String::as_str)
        .filter(|c| !matches!(*c, "available_memory" | "total_memory" | "check_requirements"))
        .collect();
    assert_eq!(
        sequence,
        vec![
            "is_running",
            "teardown",
            "create_dirs",
            "privileged_setup",
            "add_aliases",
            "cache_sync",
            "setup_state",
            "metadata_read",
            "prompt_opt_in",
            "vm_start",
            "ping",
            "provision",
            "analyticsd_start",
        ]
    );
    assert_eq!(h.world.event_names(), vec!["start_begin", "start_end"]);
    assert_eq!(
        *h.world.props.lock().unwrap(),
        vec![
            ("type".to_string(), "cf".to_string()),
            ("artifact".to_string(), "2.1.0".to_string()),
        ]
    );
    assert_eq!(
        *h.world.started_with.lock().unwrap(),
        Some((4, 4192, h.home.path().join("bin").join("devstart-efi-v2.iso")))
    );
    assert_eq!(*h.world.state_from.lock().unwrap(), Some(h.default_deps()));
    assert!(report.metrics.task_duration_ms("memory_probe").is_some());
}

#[tokio::test]
async fn test_already_running_touches_nothing() {
    let world = World::new();
    world.running.store(true, Ordering::SeqCst);
    let h = Harness::new(world);

    let report = h.orchestrator.execute(h.args()).await.unwrap();

    assert_eq!(report.outcome, StartOutcome::AlreadyRunning);
    assert_eq!(report.state, StartupState::RequirementsChecked);
    assert_eq!(report.metrics.finished_by.as_deref(), Some("running_guard"));
    for op in ["teardown", "create_dirs", "add_aliases", "cache_sync", "vm_start"] {
        assert!(!h.world.called(op), "{op} should not run");
    }
    assert_eq!(
        *h.world.events.lock().unwrap(),
        vec![(
            "start_end".to_string(),
            json!({"alreadyrunning": true}).as_object().unwrap().clone()
        )]
    );
    assert!(h.world.said().contains(&"devstart is already running...".to_string()));
}

#[tokio::test]
async fn test_incompatible_metadata_fails_before_vm_start() {
    let world = World::new();
    world.metadata.lock().unwrap().as_mut().unwrap().version = "v3".into();
    let h = Harness::new(world);

    let err = h.orchestrator.execute(h.args()).await.unwrap_err();

    assert!(matches!(err, DevstartError::Incompatible(_)));
    assert_eq!(
        err.to_string(),
        format!(
            "{} is not compatible with devstart. Please use a compatible file",
            h.default_deps().display()
        )
    );
    assert!(!h.world.called("vm_start"));
    assert!(h.world.event_names().is_empty());
    assert_eq!(h.world.props.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreadable_metadata_is_reported_as_incompatible() {
    let world = World::new();
    *world.metadata.lock().unwrap() = None;
    let h = Harness::new(world);

    let err = h.orchestrator.execute(h.args()).await.unwrap_err();

    let prefix = format!(
        "{} is not compatible with devstart. Please use a compatible file.: ",
        h.default_deps().display()
    );
    assert!(err.to_string().starts_with(&prefix), "{err}");
    assert!(!h.world.called("vm_start"));
}

#[tokio::test]
async fn test_unsupported_service_is_rejected() {
    let h = Harness::new(World::new());
    let mut args = h.args();
    args.deploy_single_service = Some("mysql,mongodb".into());

    let err = h.orchestrator.execute(args).await.unwrap_err();

    assert_eq!(err.to_string(), "Service: 'mysql,mongodb' is not supported");
    assert!(!h.world.called("vm_start"));
    assert!(h.world.event("selected_service").is_none());
}

#[tokio::test]
async fn test_supported_service_is_reported() {
    let h = Harness::new(World::new());
    let mut args = h.args();
    args.deploy_single_service = Some("MySQL".into());

    h.orchestrator.execute(args).await.unwrap();

    assert_eq!(
        h.world.event("selected_service").unwrap()["services_requested"],
        json!("MySQL")
    );
}

#[tokio::test]
async fn test_missing_explicit_deps_fails_first() {
    let h = Harness::new(World::new());
    let mut args = h.args();
    let missing = h.home.path().join("nowhere.tgz");
    args.deps_path = Some(missing.clone());

    let err = h.orchestrator.execute(args).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("no file found at: {}", missing.display())
    );
    assert!(h.world.calls().is_empty());
}

#[tokio::test]
async fn test_explicit_deps_skip_download() {
    let catalog = Catalog::new(vec![
        item("devstart-deps.tgz"),
        item("devstart-network-helper"),
        item("devstart-efi-v2.iso"),
    ]);
    let h = Harness::with_catalog(World::new(), catalog);
    let deps = h.home.path().join("custom.tgz");
    std::fs::write(&deps, b"archive").unwrap();
    let mut args = h.args();
    args.deps_path = Some(deps.clone());

    h.orchestrator.execute(args).await.unwrap();

    assert_eq!(
        *h.world.synced.lock().unwrap(),
        vec![
            vec!["devstart-network-helper".to_string()],
            vec!["devstart-efi-v2.iso".to_string()],
        ]
    );
    assert_eq!(*h.world.state_from.lock().unwrap(), Some(deps));
    assert!(
        h.world
            .said()
            .contains(&"Downloading Network Helper...".to_string())
    );
}

#[tokio::test]
async fn test_no_provision_finishes_after_ping() {
    let h = Harness::new(World::new());
    let mut args = h.args();
    args.no_provision = true;

    let report = h.orchestrator.execute(args).await.unwrap();

    assert_eq!(report.outcome, StartOutcome::SkippedProvision);
    assert_eq!(report.state, StartupState::SkippedByFlag);
    assert!(h.world.called("ping"));
    assert!(!h.world.called("provision"));
    assert!(!h.world.called("analyticsd_start"));
    assert_eq!(h.world.event_names(), vec!["start_begin"]);
}

#[tokio::test]
async fn test_failed_probe_reports_unknown_and_requeries() {
    let world = World::new();
    world.available_failures.store(1, Ordering::SeqCst);
    let h = Harness::new(world);

    let report = h.orchestrator.execute(h.args()).await.unwrap();

    let begin = h.world.event("start_begin").unwrap();
    assert_eq!(begin["available memory"], json!(null));
    assert_eq!(begin["total memory"], json!(32 * 1024));
    assert_eq!(report.memory.unwrap().available_mb, 16 * 1024);
}

#[tokio::test]
async fn test_unavailable_memory_is_fatal_at_allocation() {
    let world = World::new();
    world.available_failures.store(2, Ordering::SeqCst);
    let h = Harness::new(world);

    let err = h.orchestrator.execute(h.args()).await.unwrap_err();

    assert!(
        err.to_string()
            .starts_with("error retrieving available system memory")
    );
    assert!(!h.world.called("vm_start"));
}

#[tokio::test]
async fn test_memory_warnings_are_shown() {
    let world = World {
        available_bytes: 3 * GIB,
        ..World::new()
    };
    let h = Harness::new(world);
    let mut args = h.args();
    args.memory_mb = 2000;

    let report = h.orchestrator.execute(args).await.unwrap();

    assert_eq!(report.memory.unwrap().allocated_mb, 2000);
    assert!(h.world.said().contains(
        &"WARNING: It is recommended that you run CF Dev with at least 4192 MB of RAM."
            .to_string()
    ));
}

#[tokio::test]
async fn test_stage_errors_carry_labels() {
    for (op, label) in [
        ("is_running", "is running"),
        ("teardown", "stopping devstart"),
        ("create_dirs", "setting up devstart home dir"),
        ("privileged_setup", "privileged setup"),
        ("add_aliases", "adding aliases"),
        ("cache_sync", "unable to sync assets"),
        ("setup_state", "unable to setup directories"),
        ("ping", "timed out waiting for the VM"),
    ] {
        let world = World::new();
        world.fail_on(op);
        let h = Harness::new(world);

        let err = h.orchestrator.execute(h.args()).await.unwrap_err();

        assert_eq!(err.to_string(), format!("{label}: {op} failed"));
    }
}

#[tokio::test]
async fn test_unlabelled_failures_pass_through() {
    for op in ["check_requirements", "vm_start", "provision"] {
        let world = World::new();
        world.fail_on(op);
        let h = Harness::new(world);

        let err = h.orchestrator.execute(h.args()).await.unwrap_err();

        assert_eq!(err.to_string(), format!("{op} failed"));
    }
}

#[tokio::test]
async fn test_soft_failures_do_not_abort() {
    let world = World::new();
    world.fail_on("prompt_opt_in");
    world.fail_on("analyticsd_start");
    let h = Harness::new(world);

    let report = h.orchestrator.execute(h.args()).await.unwrap();

    assert_eq!(report.state, StartupState::Done);
    assert_eq!(h.world.event_names(), vec!["start_begin", "start_end"]);
}

#[tokio::test]
async fn test_analytics_daemon_skipped_when_disabled() {
    let world = World::new();
    world.analytics_enabled.store(false, Ordering::SeqCst);
    let h = Harness::new(world);

    h.orchestrator.execute(h.args()).await.unwrap();

    assert!(!h.world.called("analyticsd_start"));
}

#[tokio::test]
async fn test_watchdog_is_armed_once_per_session() {
    let h = Harness::new(World::new());

    h.orchestrator.execute(h.args()).await.unwrap();
    let err = h.orchestrator.execute(h.args()).await.unwrap_err();

    assert!(err.to_string().contains("watchdog already armed"));
}

#[tokio::test]
async fn test_daemon_failure_after_start_stops_vm() {
    let h = Harness::new(World::new());
    let report = h.orchestrator.execute(h.args()).await.unwrap();

    h.signals.failure_notifier().notify("vpnkit");

    assert_eq!(
        report.watchdog.await.unwrap(),
        WatchdogOutcome::Failed("vpnkit".into())
    );
    assert!(h.world.called("vm_stop"));
    assert_eq!(*h.world.exits.lock().unwrap(), vec![128]);
    assert!(
        h.world
            .said()
            .contains(&"ERROR: vpnkit has stopped".to_string())
    );
}

#[tokio::test]
async fn test_normal_exit_disarms_watchdog() {
    let Harness {
        home: _home,
        world,
        orchestrator,
        signals,
    } = Harness::new(World::new());
    let args = StartupArgs::new(PathBuf::from("efi.iso"));
    let report = orchestrator.execute(args).await.unwrap();

    signals.exit();

    assert_eq!(report.watchdog.await.unwrap(), WatchdogOutcome::Disarmed);
    assert!(!world.called("vm_stop"));
    assert!(world.exits.lock().unwrap().is_empty());
}
