// =============================================================================
// SYNC ENGINE
// =============================================================================
// Push: upsert every local coffee to the remote API, one at a time.
// Pull: replace every local coffee with the remote list.
//
// NOTES:
// - A failed item never stops a push; it is counted and the run goes on
// - A failed pull changes nothing, in memory or on disk
// - One engine runs one push/pull at a time; a second caller gets
//   `AppError::SyncInProgress` instead of overlapping
// =============================================================================

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::InventoryData;
use crate::remote::RemoteClient;
use crate::store;

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ItemOutcome {
    Created,
    Updated,
    Failed(String),
}

/// What happened to one coffee during a push.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub id: String,
    pub name: String,
    pub outcome: ItemOutcome,
}

/// Aggregated push result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub items: Vec<ItemResult>,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl SyncReport {
    fn record(&mut self, id: &str, name: &str, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Updated => self.updated += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
        self.items.push(ItemResult {
            id: id.to_string(),
            name: name.to_string(),
            outcome,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated
    }

    /// A push is successful only when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Result of a successful pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Local coffees were replaced by this many remote ones
    Replaced(usize),
    /// The server had nothing; local data was left alone
    NothingToPull,
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct SyncEngine {
    http: Client,
    busy: AtomicBool,
}

/// Clears the busy flag when a push/pull ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncEngine {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn acquire(&self) -> AppResult<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::SyncInProgress)?;
        Ok(BusyGuard(&self.busy))
    }

    /// Client for the catalog's API settings.
    pub fn client_for(&self, inventory: &InventoryData) -> AppResult<RemoteClient> {
        RemoteClient::for_inventory(self.http.clone(), inventory)
    }

    // -------------------------------------------------------------------------
    // PUSH
    // -------------------------------------------------------------------------
    /// Upsert every coffee, in catalog order, exactly once.
    pub async fn push_all(&self, inventory: &InventoryData) -> AppResult<SyncReport> {
        let client = self.client_for(inventory)?;
        let _guard = self.acquire()?;

        info!(
            url = %client.base_url(),
            coffees = inventory.coffees.len(),
            "Pushing inventory"
        );
        metrics::set_catalog_size(inventory.coffees.len());

        let mut report = SyncReport::default();
        for coffee in &inventory.coffees {
            let outcome = client.upsert(coffee).await;
            let item = match (outcome.success, outcome.was_update) {
                (true, true) => ItemOutcome::Updated,
                (true, false) => ItemOutcome::Created,
                (false, _) => ItemOutcome::Failed(
                    outcome
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown error".to_string()),
                ),
            };
            metrics::record_sync_item(match &item {
                ItemOutcome::Created => "created",
                ItemOutcome::Updated => "updated",
                ItemOutcome::Failed(_) => "failed",
            });
            report.record(&coffee.id, &coffee.name, item);
        }

        if report.is_success() {
            info!(
                created = report.created,
                updated = report.updated,
                "Push complete"
            );
        } else {
            warn!(
                succeeded = report.succeeded(),
                created = report.created,
                updated = report.updated,
                failed = report.failed,
                "Push completed with errors"
            );
        }
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // PULL
    // -------------------------------------------------------------------------
    /// Replace the local coffees with the server's list and persist.
    ///
    /// An empty server list is "nothing to pull". Any failure, including a
    /// failed save, leaves `inventory` untouched.
    pub async fn pull_all(
        &self,
        inventory: &mut InventoryData,
        local_path: &Path,
    ) -> AppResult<PullOutcome> {
        let client = self.client_for(inventory)?;
        let _guard = self.acquire()?;

        info!(url = %client.base_url(), "Pulling inventory");
        let remote = match client.fetch_all().await {
            Ok(coffees) => coffees,
            Err(e) => {
                error!(error_code = e.code(), error = %e, "Pull failed");
                return Err(e);
            }
        };

        if remote.is_empty() {
            info!("No coffees found on API server");
            return Ok(PullOutcome::NothingToPull);
        }

        let count = remote.len();
        let replaced = InventoryData {
            coffees: remote,
            ..inventory.clone()
        };
        store::save_document(local_path, &replaced).await?;
        *inventory = replaced;

        metrics::set_catalog_size(count);
        info!(coffees = count, path = %local_path.display(), "Pull complete");
        Ok(PullOutcome::Replaced(count))
    }
}
