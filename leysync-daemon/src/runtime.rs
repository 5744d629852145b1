use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::Instant;

use leysync_core::layout::SETTINGS_FILE;
use leysync_core::registry::{self, leysync_root};
use leysync_core::Settings;

use crate::context::WorkspaceContext;
use crate::error::{io_err, DaemonError};
use crate::paths::{socket_path, DEBOUNCE_WINDOW, INDEX_FILE};
use crate::protocol::{DaemonRequest, DaemonResponse};
use crate::scheduler::{SchedulerHandle, SyncScheduler};

/// A registered workspace with its running scheduler.
pub struct AttachedWorkspace {
    pub name: String,
    /// Settings the current scheduler was built from.
    pub settings: Settings,
    pub scheduler: SyncScheduler,
}

/// Attached workspaces keyed by canonical root.
pub type Workspaces = HashMap<PathBuf, AttachedWorkspace>;

type SharedWorkspaces = Arc<RwLock<Workspaces>>;

/// How a settings edit affects a running workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingsChange {
    None,
    /// Only deployment toggles changed: redeploy from the cache.
    Toggles,
    /// Repository, cache, schedule or contribution changed: restart.
    Schedule,
}

impl SettingsChange {
    fn between(old: &Settings, new: &Settings) -> Self {
        if old == new {
            SettingsChange::None
        } else if old.repository != new.repository
            || old.cache != new.cache
            || old.update != new.update
            || old.contribute != new.contribute
        {
            SettingsChange::Schedule
        } else {
            SettingsChange::Toggles
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchTarget {
    Registry,
    /// `.leysync.yaml` of the workspace rooted here.
    Settings(PathBuf),
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;
    let started_at_unix = unix_seconds_now();

    let workspaces: SharedWorkspaces = Arc::new(RwLock::new(Workspaces::new()));
    sync_registry(&home, &workspaces).await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let workspaces = workspaces.clone();
        tokio::spawn(async move {
            let result = watcher_task(home, workspaces, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let workspaces = workspaces.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                workspaces,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, socket_result, signal_result) =
        tokio::join!(watcher_handle, socket_handle, signal_handle);

    detach_all(&workspaces).await;

    handle_join("watcher", watcher_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Attach every registered workspace that is not attached yet and detach
/// the ones no longer registered.
async fn sync_registry(home: &Path, workspaces: &SharedWorkspaces) -> Result<(), DaemonError> {
    let home_for_load = home.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || registry::list_at(&home_for_load))
        .await
        .map_err(|err| DaemonError::Protocol(format!("registry load join error: {err}")))??;
    let wanted: HashSet<&PathBuf> = entries.iter().map(|entry| &entry.path).collect();

    let detached: Vec<AttachedWorkspace> = {
        let mut guard = workspaces.write().await;
        let gone: Vec<PathBuf> = guard
            .keys()
            .filter(|root| !wanted.contains(root))
            .cloned()
            .collect();
        gone.iter().filter_map(|root| guard.remove(root)).collect()
    };
    for workspace in detached {
        tracing::info!(workspace = %workspace.name, "workspace detached");
        workspace.scheduler.shutdown().await;
    }

    for entry in &entries {
        if workspaces.read().await.contains_key(&entry.path) {
            continue;
        }
        if !entry.path.is_dir() {
            tracing::warn!(root = %entry.path.display(), "registered workspace is missing; skipping");
            continue;
        }
        match attach_workspace(&entry.path).await {
            Ok(attached) => {
                workspaces.write().await.insert(entry.path.clone(), attached);
            }
            Err(err) => {
                tracing::warn!(root = %entry.path.display(), error = %err, "could not attach workspace");
            }
        }
    }
    Ok(())
}

async fn attach_workspace(root: &Path) -> Result<AttachedWorkspace, DaemonError> {
    let context = WorkspaceContext::load(root)?;
    let name = context.name().to_string();
    let settings = context.settings().clone();
    let scheduler = SyncScheduler::spawn(name.clone(), Arc::new(context));
    scheduler.start(false).await;
    tracing::info!(workspace = %name, root = %root.display(), "workspace attached");
    Ok(AttachedWorkspace {
        name,
        settings,
        scheduler,
    })
}

/// Rebuild a workspace's context after its settings file changed.
///
/// Unreadable settings keep the previous configuration running.
async fn reload_workspace(workspaces: &SharedWorkspaces, root: &Path) {
    let context = match WorkspaceContext::load(root) {
        Ok(context) => context,
        Err(err) => {
            tracing::warn!(
                root = %root.display(),
                error = %err,
                "settings unreadable; keeping previous configuration",
            );
            return;
        }
    };
    let settings = context.settings().clone();

    let mut guard = workspaces.write().await;
    let Some(attached) = guard.get_mut(root) else {
        return;
    };
    let change = SettingsChange::between(&attached.settings, &settings);
    if change == SettingsChange::None {
        return;
    }
    attached.settings = settings;
    attached.scheduler.replace_runner(Arc::new(context)).await;

    match change {
        SettingsChange::Schedule => {
            tracing::info!(workspace = %attached.name, "settings changed; restarting scheduler");
            attached.scheduler.restart().await;
        }
        SettingsChange::Toggles => {
            tracing::info!(workspace = %attached.name, "integration toggles changed; redeploying");
            if let Err(err) = attached.scheduler.reconcile_now().await {
                tracing::warn!(workspace = %attached.name, error = %err, "could not queue reconcile");
            }
        }
        SettingsChange::None => {}
    }
}

async fn detach_all(workspaces: &SharedWorkspaces) {
    let drained: Vec<AttachedWorkspace> = workspaces
        .write()
        .await
        .drain()
        .map(|(_, workspace)| workspace)
        .collect();
    for workspace in drained {
        workspace.scheduler.shutdown().await;
    }
}

async fn watcher_task(
    home: PathBuf,
    workspaces: SharedWorkspaces,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let root = leysync_root(&home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }

    // Canonicalize so that FSEvents paths (which arrive as real paths, e.g.
    // /private/var/... on macOS) match the comparisons below.
    let root = fs::canonicalize(&root).unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&root, RecursiveMode::NonRecursive)?;

    let mut watched = HashSet::new();
    refresh_watches(&mut watcher, &mut watched, &workspaces).await;

    let mut debounce = HashMap::<PathBuf, Instant>::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    let Some(target) = classify_path(&path, &root) else {
                        continue;
                    };
                    if !should_process_event(&mut debounce, &path, Instant::now()) {
                        continue;
                    }

                    // Editors may truncate before writing; read once the burst settles.
                    tokio::time::sleep(DEBOUNCE_WINDOW).await;

                    match target {
                        WatchTarget::Registry => {
                            if let Err(err) = sync_registry(&home, &workspaces).await {
                                tracing::error!(error = %err, "registry reload failed");
                            }
                            refresh_watches(&mut watcher, &mut watched, &workspaces).await;
                        }
                        WatchTarget::Settings(workspace_root) => {
                            reload_workspace(&workspaces, &workspace_root).await;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Watch each attached workspace root for its settings file.
async fn refresh_watches(
    watcher: &mut RecommendedWatcher,
    watched: &mut HashSet<PathBuf>,
    workspaces: &SharedWorkspaces,
) {
    let wanted: HashSet<PathBuf> = workspaces.read().await.keys().cloned().collect();

    let stale: Vec<PathBuf> = watched.difference(&wanted).cloned().collect();
    for root in stale {
        if let Err(err) = watcher.unwatch(&root) {
            tracing::debug!(root = %root.display(), error = %err, "unwatch failed");
        }
        watched.remove(&root);
    }

    for root in wanted {
        if watched.contains(&root) {
            continue;
        }
        match watcher.watch(&root, RecursiveMode::NonRecursive) {
            Ok(()) => {
                tracing::debug!(root = %root.display(), "watching workspace settings");
                watched.insert(root);
            }
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "could not watch workspace");
            }
        }
    }
}

async fn socket_server_task(
    home: PathBuf,
    workspaces: SharedWorkspaces,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let home = home.clone();
                let workspaces = workspaces.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        home,
                        workspaces,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    workspaces: SharedWorkspaces,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match &request {
            DaemonRequest::Status => {
                DaemonResponse::ok(build_status_payload(&home, &workspaces, started_at_unix).await)
            }
            DaemonRequest::Update { workspace } => {
                match update_workspaces(&workspaces, workspace.as_deref()).await {
                    Ok(payload) => DaemonResponse::ok(payload),
                    Err(err) => DaemonResponse::error(err.to_string()),
                }
            }
            DaemonRequest::Stop => {
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
        };

        write_response(&mut writer, &response).await?;
        if request.ends_session() {
            break;
        }
    }

    Ok(())
}

async fn build_status_payload(
    home: &Path,
    workspaces: &SharedWorkspaces,
    started_at_unix: u64,
) -> Value {
    let mut rows: Vec<(PathBuf, Value)> = {
        let guard = workspaces.read().await;
        guard
            .iter()
            .map(|(root, attached)| {
                let row = json!({
                    "name": attached.name,
                    "path": root.display().to_string(),
                    "scheduler": attached.scheduler.status(),
                });
                (root.clone(), row)
            })
            .collect()
    };
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    json!({
        "running": true,
        "started_at_unix": started_at_unix,
        "socket": socket_path(home).display().to_string(),
        "registry": registry::index_path_at(home).display().to_string(),
        "workspaces": rows.into_iter().map(|(_, row)| row).collect::<Vec<_>>(),
    })
}

/// Force-update one workspace (by root path) or every attached workspace.
///
/// Each update queues behind that workspace's in-flight cycle.
async fn update_workspaces(
    workspaces: &SharedWorkspaces,
    target: Option<&str>,
) -> Result<Value, DaemonError> {
    let mut handles: Vec<(String, PathBuf, SchedulerHandle)> = {
        let guard = workspaces.read().await;
        match target {
            Some(raw) => {
                let root = fs::canonicalize(raw).unwrap_or_else(|_| PathBuf::from(raw));
                let attached = guard
                    .get(&root)
                    .ok_or_else(|| DaemonError::UnknownWorkspace { path: root.clone() })?;
                vec![(attached.name.clone(), root, attached.scheduler.handle())]
            }
            None => guard
                .iter()
                .map(|(root, attached)| {
                    (attached.name.clone(), root.clone(), attached.scheduler.handle())
                })
                .collect(),
        }
    };
    handles.sort_by(|a, b| a.1.cmp(&b.1));

    let mut results = Vec::with_capacity(handles.len());
    for (name, root, handle) in handles {
        let row = match handle.force_update().await {
            Ok(report) => json!({
                "workspace": name,
                "path": root.display().to_string(),
                "ok": true,
                "report": report,
            }),
            Err(err) => json!({
                "workspace": name,
                "path": root.display().to_string(),
                "ok": false,
                "error": err.to_string(),
            }),
        };
        results.push(row);
    }
    Ok(json!({ "workspaces": results }))
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn classify_path(path: &Path, leysync_root: &Path) -> Option<WatchTarget> {
    let name = path.file_name()?.to_str()?;
    let parent = path.parent()?;
    if name == INDEX_FILE && parent == leysync_root {
        return Some(WatchTarget::Registry);
    }
    if name == SETTINGS_FILE {
        return Some(WatchTarget::Settings(parent.to_path_buf()));
    }
    None
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= Duration::from_secs(30));
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = leysync_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use leysync_core::settings::settings_path;
    use tempfile::TempDir;
    use tokio::time::advance;

    use crate::protocol::{request_status, request_stop, request_update};
    use crate::scheduler::SchedulerState;

    fn write_settings(root: &Path, yaml: &str) {
        fs::write(settings_path(root), yaml).expect("write settings");
    }

    /// A registered workspace whose scheduler never ticks on its own.
    fn quiet_workspace(home: &Path, parent: &Path, name: &str) -> PathBuf {
        let root = parent.join(name);
        fs::create_dir_all(&root).expect("create workspace");
        write_settings(&root, "update:\n  enabled: false\n");
        registry::register_at(home, &root).expect("register").path
    }

    async fn wait_for_cycles(workspaces: &SharedWorkspaces, root: &Path, n: u64) {
        for _ in 0..200 {
            let cycles = workspaces
                .read()
                .await
                .get(root)
                .map(|w| w.scheduler.status().cycles)
                .unwrap_or(0);
            if cycles >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workspace {} did not finish {n} cycles", root.display());
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_coalesces_rapid_events() {
        let threshold = Duration::from_millis(100);
        let mut debounce = HashMap::<PathBuf, Instant>::new();
        let path = PathBuf::from("/work/app/.leysync.yaml");
        let mut triggers = 0usize;

        for _ in 0..5 {
            if should_process_event_with_threshold(&mut debounce, &path, Instant::now(), threshold)
            {
                triggers += 1;
            }
            advance(Duration::from_millis(10)).await;
        }

        advance(Duration::from_millis(150)).await;
        assert_eq!(triggers, 1, "rapid saves should collapse to one reload");
        assert!(should_process_event_with_threshold(
            &mut debounce,
            &path,
            Instant::now(),
            threshold
        ));
    }

    #[test]
    fn classify_path_recognises_registry_and_settings() {
        let root = Path::new("/home/me/.leysync");
        assert_eq!(
            classify_path(&root.join(INDEX_FILE), root),
            Some(WatchTarget::Registry)
        );
        assert_eq!(
            classify_path(Path::new("/work/app/.leysync.yaml"), root),
            Some(WatchTarget::Settings(PathBuf::from("/work/app")))
        );
        assert_eq!(classify_path(&root.join("workspaces.yaml.tmp"), root), None);
        assert_eq!(classify_path(Path::new("/work/app/workspaces.yaml"), root), None);
        assert_eq!(classify_path(Path::new("/work/app/README.md"), root), None);
    }

    #[test]
    fn settings_change_classification() {
        let old = Settings::default();
        assert_eq!(SettingsChange::between(&old, &old.clone()), SettingsChange::None);

        let mut toggles = old.clone();
        toggles.agentic.cursor = false;
        assert_eq!(SettingsChange::between(&old, &toggles), SettingsChange::Toggles);

        let mut ignore = old.clone();
        ignore.gitignore.auto_update = false;
        assert_eq!(SettingsChange::between(&old, &ignore), SettingsChange::Toggles);

        let mut interval = old.clone();
        interval.update.interval = 60;
        assert_eq!(SettingsChange::between(&old, &interval), SettingsChange::Schedule);

        let mut branch = old.clone();
        branch.repository.branch = "next".to_string();
        assert_eq!(SettingsChange::between(&old, &branch), SettingsChange::Schedule);
    }

    #[tokio::test]
    async fn status_payload_lists_no_workspaces_before_registration() {
        let home = TempDir::new().expect("home");
        let workspaces: SharedWorkspaces = Arc::new(RwLock::new(Workspaces::new()));

        let payload = build_status_payload(home.path(), &workspaces, 1_000_000).await;

        assert_eq!(payload["running"], json!(true));
        assert_eq!(payload["started_at_unix"], json!(1_000_000u64));
        assert!(payload["workspaces"].as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn registry_sync_attaches_and_detaches_workspaces() {
        let home = TempDir::new().expect("home");
        let parent = TempDir::new().expect("parent");
        let app = quiet_workspace(home.path(), parent.path(), "app");
        let api = quiet_workspace(home.path(), parent.path(), "api");
        let workspaces: SharedWorkspaces = Arc::new(RwLock::new(Workspaces::new()));

        sync_registry(home.path(), &workspaces).await.expect("sync");
        assert_eq!(workspaces.read().await.len(), 2);

        registry::unregister_at(home.path(), &api).expect("unregister");
        sync_registry(home.path(), &workspaces).await.expect("resync");
        {
            let guard = workspaces.read().await;
            assert_eq!(guard.len(), 1);
            assert_eq!(guard.get(&app).expect("app attached").name, "app");
        }

        let payload = build_status_payload(home.path(), &workspaces, 0).await;
        let rows = payload["workspaces"].as_array().expect("array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["scheduler"]["state"], json!("idle"));
        assert_eq!(rows[0]["scheduler"]["timer_armed"], json!(false));

        detach_all(&workspaces).await;
        assert!(workspaces.read().await.is_empty());
    }

    #[tokio::test]
    async fn toggle_edit_triggers_a_reconcile_cycle() {
        let home = TempDir::new().expect("home");
        let parent = TempDir::new().expect("parent");
        let app = quiet_workspace(home.path(), parent.path(), "app");
        let workspaces: SharedWorkspaces = Arc::new(RwLock::new(Workspaces::new()));
        sync_registry(home.path(), &workspaces).await.expect("sync");

        write_settings(&app, "update:\n  enabled: false\nagentic:\n  cursor: false\n");
        reload_workspace(&workspaces, &app).await;
        wait_for_cycles(&workspaces, &app, 1).await;

        let guard = workspaces.read().await;
        let attached = guard.get(&app).expect("attached");
        assert!(!attached.settings.agentic.cursor);
        assert_eq!(attached.scheduler.status().state, SchedulerState::Idle);
    }

    #[tokio::test]
    async fn invalid_settings_keep_the_previous_configuration() {
        let home = TempDir::new().expect("home");
        let parent = TempDir::new().expect("parent");
        let app = quiet_workspace(home.path(), parent.path(), "app");
        let workspaces: SharedWorkspaces = Arc::new(RwLock::new(Workspaces::new()));
        sync_registry(home.path(), &workspaces).await.expect("sync");

        write_settings(&app, "update: [broken");
        reload_workspace(&workspaces, &app).await;

        let guard = workspaces.read().await;
        assert!(!guard.get(&app).expect("attached").settings.update.enabled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn socket_serves_status_update_and_stop() {
        let home = TempDir::new().expect("home");
        ensure_runtime_dirs(home.path()).expect("dirs");
        let workspaces: SharedWorkspaces = Arc::new(RwLock::new(Workspaces::new()));
        let (shutdown_tx, _) = broadcast::channel::<()>(4);

        let server = tokio::spawn(socket_server_task(
            home.path().to_path_buf(),
            workspaces.clone(),
            shutdown_tx.clone(),
            shutdown_tx.subscribe(),
            42,
        ));

        let client_home = home.path().to_path_buf();
        let (status, unknown, stopped) = tokio::task::spawn_blocking(move || {
            let status = request_status(&client_home);
            let unknown = request_update(&client_home, Some(Path::new("/not/a/registered/ws")));
            let stopped = request_stop(&client_home);
            (status, unknown, stopped)
        })
        .await
        .expect("client thread");

        let status = status.expect("status");
        assert_eq!(status["running"], json!(true));
        assert_eq!(status["started_at_unix"], json!(42));

        let err = unknown.unwrap_err();
        assert!(err.to_string().contains("not registered"), "got: {err}");

        stopped.expect("stop");
        server.await.expect("join").expect("server");
        assert!(!socket_path(home.path()).exists());
    }
}
