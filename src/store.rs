// =============================================================================
// STORE MODULE
// =============================================================================
// Loads and saves the two JSON documents: the catalog (inventory.json) and
// the order log (orders.json).
//
// NOTES:
// - A missing file is created with defaults on first load
// - Malformed JSON is returned as an error, never patched up
// - Saves go through a temp file + rename so a crash mid-write cannot leave
//   a truncated document behind
// =============================================================================

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{normalize_keys, InventoryData, OrderData};

// -----------------------------------------------------------------------------
// DOCUMENT TRAIT
// -----------------------------------------------------------------------------
/// A JSON document persisted as a whole file.
pub trait Document: Serialize + DeserializeOwned + Default {
    /// Short label used in log fields
    const KIND: &'static str;
}

impl Document for InventoryData {
    const KIND: &'static str = "inventory";
}

impl Document for OrderData {
    const KIND: &'static str = "orders";
}

// -----------------------------------------------------------------------------
// STORE WRAPPER
// -----------------------------------------------------------------------------
/// Knows where both documents live and reads/writes them.
#[derive(Debug, Clone)]
pub struct LocalStore {
    inventory_path: PathBuf,
    orders_path: PathBuf,
}

impl LocalStore {
    pub fn new(inventory_path: impl Into<PathBuf>, orders_path: impl Into<PathBuf>) -> Self {
        Self {
            inventory_path: inventory_path.into(),
            orders_path: orders_path.into(),
        }
    }

    pub fn inventory_path(&self) -> &Path {
        &self.inventory_path
    }

    pub fn orders_path(&self) -> &Path {
        &self.orders_path
    }

    pub async fn load_inventory(&self) -> AppResult<InventoryData> {
        load_document(&self.inventory_path).await
    }

    pub async fn save_inventory(&self, data: &InventoryData) -> AppResult<()> {
        save_document(&self.inventory_path, data).await
    }

    pub async fn load_orders(&self) -> AppResult<OrderData> {
        load_document(&self.orders_path).await
    }

    pub async fn save_orders(&self, data: &OrderData) -> AppResult<()> {
        save_document(&self.orders_path, data).await
    }
}

// =============================================================================
// LOAD / SAVE
// =============================================================================

/// Read a document, creating and persisting the default one if the file
/// does not exist yet.
pub async fn load_document<T: Document>(path: &Path) -> AppResult<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let doc = parse_document(&bytes)?;
            debug!(kind = T::KIND, path = %path.display(), "Loaded document");
            Ok(doc)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let doc = T::default();
            save_document(path, &doc).await?;
            info!(kind = T::KIND, path = %path.display(), "Created default document");
            Ok(doc)
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse document bytes with case-insensitive field names.
/// A literal `null` document is treated as the default document.
pub fn parse_document<T: Document>(bytes: &[u8]) -> AppResult<T> {
    let value: Value = serde_json::from_slice(bytes)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(normalize_keys(value))?)
}

/// Serialize with indentation and replace the file atomically.
pub async fn save_document<T: Document>(path: &Path, doc: &T) -> AppResult<()> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).await?;
    debug!(kind = T::KIND, path = %path.display(), bytes = bytes.len(), "Saved document");
    Ok(())
}

// -----------------------------------------------------------------------------
// ATOMIC REPLACE
// -----------------------------------------------------------------------------
// 1. write the full document to `.{name}.tmp.{pid}` next to the target
//    (same directory, so the rename never crosses filesystems)
// 2. fsync the temp file, so the rename cannot expose unflushed data
// 3. rename over the target; readers see either the old or the new file
// On any failure the temp file is removed and the target is untouched.
// The watcher sees step 3 as a rename-to event on the target name.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let tmp = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

// =============================================================================
// IDS
// =============================================================================
/// Short opaque id: the first 12 hex digits of a random v4 UUID (48 random
/// bits; the version nibble comes after them).
pub fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}
