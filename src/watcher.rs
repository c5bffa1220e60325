// =============================================================================
// CHANGE WATCHER
// =============================================================================
// Auto-sync mode: watch the catalog file and push it to the API whenever it
// changes.
//
// Two-stage timer per change event:
//   1. debounce - drop the event if the last accepted one is younger than the
//      cooldown (Idle -> CoolingDown only after the window has passed)
//   2. settle   - after accepting, wait a fixed delay so the writer finishes,
//      then reload the catalog and push it
//
// NOTES:
// - Reload/push errors are logged, the watcher keeps going
// - Accepted syncs take turns: a sync accepted while another is pushing
//   waits for it, then reads the file. An edit made during a slow push is
//   therefore always pushed by the sync that follows it.
// - On shutdown the filesystem watch is dropped first, then in-flight syncs
//   are awaited, so nothing is left running
// =============================================================================

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::InventoryData;
use crate::store;
use crate::sync::SyncEngine;

/// Minimum spacing between accepted change events.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

/// Wait after an accepted event before reading the file.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

// -----------------------------------------------------------------------------
// DEBOUNCER
// -----------------------------------------------------------------------------
/// Stage one of the timer: accept at most one event per cooldown window.
pub struct Debouncer {
    cooldown: Duration,
    last_accepted: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl Debouncer {
    pub fn new(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown,
            last_accepted: None,
            clock,
        }
    }

    /// Returns true if the event should trigger a sync.
    pub fn accept(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}

// -----------------------------------------------------------------------------
// SUMMARY
// -----------------------------------------------------------------------------

/// How one triggered sync ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRun {
    Succeeded,
    CompletedWithErrors,
    Failed,
    /// The engine was busy with a sync started elsewhere
    Skipped,
}

/// Counters for one watcher session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub events: usize,
    pub accepted: usize,
    pub dropped: usize,
    pub succeeded: usize,
    pub with_errors: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl WatchSummary {
    /// Syncs that actually ran a push.
    pub fn syncs(&self) -> usize {
        self.succeeded + self.with_errors
    }

    fn record(&mut self, run: SyncRun) {
        match run {
            SyncRun::Succeeded => self.succeeded += 1,
            SyncRun::CompletedWithErrors => self.with_errors += 1,
            SyncRun::Failed => self.failed += 1,
            SyncRun::Skipped => self.skipped += 1,
        }
    }
}

// -----------------------------------------------------------------------------
// WATCHER
// -----------------------------------------------------------------------------
/// Called once per finished sync, in completion order.
pub type SyncListener = Arc<dyn Fn(SyncRun) + Send + Sync>;

pub struct ChangeWatcher {
    path: PathBuf,
    engine: Arc<SyncEngine>,
    debouncer: Debouncer,
    settle: Duration,
    /// Held for the reload + push of one sync
    turn: Arc<Mutex<()>>,
    tasks: JoinSet<SyncRun>,
    summary: WatchSummary,
    listener: Option<SyncListener>,
}

impl ChangeWatcher {
    pub fn new(path: impl Into<PathBuf>, engine: Arc<SyncEngine>) -> Self {
        Self::with_timing(
            path,
            engine,
            DEFAULT_COOLDOWN,
            DEFAULT_SETTLE,
            Arc::new(SystemClock),
        )
    }

    pub fn with_timing(
        path: impl Into<PathBuf>,
        engine: Arc<SyncEngine>,
        cooldown: Duration,
        settle: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            path: path.into(),
            engine,
            debouncer: Debouncer::new(cooldown, clock),
            settle,
            turn: Arc::new(Mutex::new(())),
            tasks: JoinSet::new(),
            summary: WatchSummary::default(),
            listener: None,
        }
    }

    /// Report every finished sync to `listener` (console status lines).
    pub fn on_sync_complete(
        mut self,
        listener: impl Fn(SyncRun) + Send + Sync + 'static,
    ) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Feed one change notification. Returns true if it started a sync.
    pub fn on_change(&mut self) -> bool {
        self.summary.events += 1;
        let accepted = self.debouncer.accept();
        metrics::record_watcher_event(accepted);

        if !accepted {
            self.summary.dropped += 1;
            debug!(path = %self.path.display(), "Change dropped (cooldown)");
            return false;
        }

        self.summary.accepted += 1;
        info!(path = %self.path.display(), "File change detected, syncing");
        let path = self.path.clone();
        let engine = Arc::clone(&self.engine);
        let settle = self.settle;
        let turn = Arc::clone(&self.turn);
        self.tasks
            .spawn(async move { settled_sync(path, engine, settle, turn).await });
        true
    }

    fn collect(&mut self, joined: Result<SyncRun, JoinError>) {
        let run = match joined {
            Ok(run) => run,
            Err(e) => {
                error!(error = %e, "Sync task panicked");
                SyncRun::Failed
            }
        };
        self.summary.record(run);
        if let Some(listener) = &self.listener {
            listener(run);
        }
    }

    /// Wait for every in-flight sync and return the session counters.
    pub async fn drain(&mut self) -> WatchSummary {
        while let Some(joined) = self.tasks.join_next().await {
            self.collect(joined);
        }
        self.summary.clone()
    }

    /// Watch the catalog file until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> AppResult<WatchSummary>
    where
        F: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::channel(100);
        let fs_watcher = watch_file(&self.path, tx)?;
        info!(path = %self.path.display(), "Watching for changes");

        let summary = self.run_with_events(rx, shutdown, fs_watcher).await;
        Ok(summary)
    }

    /// Event loop over an arbitrary source of change notifications.
    ///
    /// Ends when `shutdown` resolves or the channel closes. `keep_alive` is
    /// dropped before in-flight syncs are awaited.
    pub async fn run_with_events<F, K>(
        mut self,
        mut events: mpsc::Receiver<()>,
        shutdown: F,
        keep_alive: K,
    ) -> WatchSummary
    where
        F: Future<Output = ()>,
    {
        // Three sources, polled in this order (`biased`):
        //   shutdown  -> leave the loop, then drain below
        //   events    -> debounce, maybe spawn a sync
        //   join_next -> collect finished syncs as they end, so the summary
        //                and listener see them live (guarded: an empty
        //                JoinSet would resolve to None immediately)
        // A closed event channel also ends the loop.
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Stopping auto-sync mode");
                    break;
                }
                event = events.recv() => match event {
                    Some(()) => {
                        self.on_change();
                    }
                    None => break,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.collect(joined);
                }
            }
        }

        drop(keep_alive);
        events.close();
        let summary = self.drain().await;
        info!(
            events = summary.events,
            accepted = summary.accepted,
            dropped = summary.dropped,
            succeeded = summary.succeeded,
            with_errors = summary.with_errors,
            failed = summary.failed,
            "Auto-sync mode stopped"
        );
        summary
    }
}

/// Stage two: wait out the settle delay, wait for our turn, reload, push.
async fn settled_sync(
    path: PathBuf,
    engine: Arc<SyncEngine>,
    settle: Duration,
    turn: Arc<Mutex<()>>,
) -> SyncRun {
    tokio::time::sleep(settle).await;
    // the file is read only once the previous push is done with the engine
    let _turn = turn.lock().await;

    let inventory: InventoryData = match store::load_document(&path).await {
        Ok(inventory) => inventory,
        Err(e) => {
            error!(error_code = e.code(), error = %e, path = %path.display(), "Reload failed");
            return SyncRun::Failed;
        }
    };

    match engine.push_all(&inventory).await {
        Ok(report) if report.is_success() => {
            info!(
                created = report.created,
                updated = report.updated,
                "Sync completed successfully"
            );
            SyncRun::Succeeded
        }
        Ok(report) => {
            warn!(failed = report.failed, succeeded = report.succeeded(), "Sync completed with errors");
            SyncRun::CompletedWithErrors
        }
        Err(AppError::SyncInProgress) => {
            // only reachable when something outside this watcher holds the engine
            warn!("Engine busy with another sync, change skipped");
            SyncRun::Skipped
        }
        Err(e) => {
            error!(error_code = e.code(), error = %e, "Error during sync");
            SyncRun::Failed
        }
    }
}

// -----------------------------------------------------------------------------
// FILESYSTEM BRIDGE
// -----------------------------------------------------------------------------

/// Start a notify watcher that sends `()` for every relevant event on
/// `path`. The parent directory is watched so that write-temp-then-rename
/// saves are seen too. Keep the returned watcher alive for as long as
/// events are wanted.
pub fn watch_file(path: &Path, tx: mpsc::Sender<()>) -> AppResult<RecommendedWatcher> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| AppError::InvalidInput(format!("not a file path: {}", path.display())))?;

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let targets_file = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if targets_file && is_change(&event.kind) {
                // a full channel already has a pending change queued
                let _ = tx.try_send(());
            }
        }
        Err(e) => warn!(error = %e, "File watcher error"),
    })?;
    watcher.watch(&parent, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn is_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => false,
        EventKind::Modify(_) | EventKind::Create(_) => true,
        _ => false,
    }
}
