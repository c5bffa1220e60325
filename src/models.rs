// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures for the catalog document, the order log and the API
// payloads.
//
// NOTES:
// - Field names are camelCase both on disk and on the wire
// - Reading is case-insensitive; see `normalize_keys` below
// - `#[serde(default)]` lets hand-edited files omit fields
// - Reading is also lenient about values the remote API produces: null for
//   strings and lists, and timestamps without a UTC offset (see LENIENT
//   READERS at the bottom). Writing is always strict camelCase + RFC 3339.
// =============================================================================

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Placeholder API URL written into a freshly created catalog.
pub const DEFAULT_API_URL: &str = "https://api.weroasting.com";

// =============================================================================
// COFFEE
// =============================================================================
// A single catalog item.
//
// `is_available` starts out as `stock_quantity > 0` and is recomputed by the
// stock-changing operations, but the toggle operation may flip it on its own.
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coffee {
    /// Opaque id, client- or server-assigned
    #[serde(deserialize_with = "null_as_empty")]
    pub id: String,

    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,

    /// Country or region, e.g. "Ethiopia"
    #[serde(deserialize_with = "null_as_empty")]
    pub origin: String,

    /// Free text, conventionally Light / Medium / Dark
    #[serde(deserialize_with = "null_as_empty")]
    pub roast_level: String,

    #[serde(deserialize_with = "null_as_empty")]
    pub description: String,

    /// Price of one bag
    pub price_per_bag: f64,

    /// Bags on hand
    pub stock_quantity: u32,

    #[serde(deserialize_with = "null_as_empty_list")]
    pub flavor_notes: Vec<String>,

    /// Never null: the remote schema rejects null, so null reads as ""
    #[serde(deserialize_with = "null_as_empty")]
    pub image_url: String,

    pub is_available: bool,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub roasted_date: DateTime<Utc>,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Coffee {
    /// Set the stock level and re-derive availability from it.
    pub fn set_stock(&mut self, quantity: u32, now: DateTime<Utc>) {
        self.stock_quantity = quantity;
        self.is_available = quantity > 0;
        self.updated_at = now;
    }
}

// =============================================================================
// CATALOG DOCUMENT
// =============================================================================
/// The catalog file: API settings plus every coffee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryData {
    /// Base URL of the remote API; empty disables sync
    pub api_url: String,

    /// Shared secret sent as `X-Deploy-Key`
    pub api_key: Option<String>,

    pub coffees: Vec<Coffee>,
}

impl Default for InventoryData {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            coffees: Vec::new(),
        }
    }
}

impl InventoryData {
    /// Sync is only possible once an API URL is set.
    pub fn is_sync_configured(&self) -> bool {
        !self.api_url.trim().is_empty()
    }

    /// The API key, ignoring an empty string.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

// =============================================================================
// ORDERS
// =============================================================================
/// One recorded sale. Name and price are snapshots taken at order time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    #[serde(deserialize_with = "null_as_empty")]
    pub id: String,

    /// Not enforced: deleting or renaming the coffee does not touch orders
    #[serde(deserialize_with = "null_as_empty")]
    pub coffee_id: String,

    #[serde(deserialize_with = "null_as_empty")]
    pub coffee_name: String,

    pub quantity_bags: u32,

    pub price_per_bag: f64,

    /// quantity_bags * price_per_bag, computed once
    pub total_price: f64,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub order_date: DateTime<Utc>,
}

/// The order log file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderData {
    pub orders: Vec<Order>,
}

// =============================================================================
// REQUEST STRUCTURES
// =============================================================================
// Input shapes for the inventory operations, filled in by the CLI or menu.

/// Everything needed to add a coffee; id and timestamps are generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCoffee {
    pub name: String,
    pub origin: String,
    pub roast_level: String,
    pub description: String,
    pub price_per_bag: f64,
    pub stock_quantity: u32,
    pub flavor_notes: Vec<String>,
    pub image_url: Option<String>,
}

/// Split a comma-separated flavor list, dropping blanks.
pub fn parse_flavor_notes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// CASE-INSENSITIVE KEYS
// =============================================================================
// Hand-edited files may use `RoastLevel` or `roastlevel`, and the remote API
// may answer in PascalCase. Before handing a document to serde we rewrite
// every known key to its camelCase spelling.
//
// Flow: raw bytes -> serde_json::Value -> normalize_keys -> from_value::<T>
//
// - FIELD_NAMES is one flat list for every struct in this file; a key is
//   only ever renamed to a field some struct declares
// - the match is ASCII case-insensitive, nothing else (no snake_case)
// - the walk is recursive, so nested `coffees[*]` and `orders[*]` are covered
// - keys inside string values are never touched

const FIELD_NAMES: &[&str] = &[
    "id",
    "name",
    "origin",
    "roastLevel",
    "description",
    "pricePerBag",
    "stockQuantity",
    "flavorNotes",
    "imageUrl",
    "isAvailable",
    "roastedDate",
    "createdAt",
    "updatedAt",
    "apiUrl",
    "apiKey",
    "coffees",
    "orders",
    "coffeeId",
    "coffeeName",
    "quantityBags",
    "totalPrice",
    "orderDate",
];

fn canonical_field(key: &str) -> Option<&'static str> {
    FIELD_NAMES
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(key))
}

/// Rewrite object keys (recursively) to their canonical camelCase form.
///
/// Unknown keys pass through untouched. When two spellings of the same
/// field appear, the last one wins, same as a duplicate key in JSON.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let key = canonical_field(&key).map(str::to_string).unwrap_or(key);
                out.insert(key, normalize_keys(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

// =============================================================================
// LENIENT READERS
// =============================================================================
// The remote API (and catalogs saved by older tools after a pull) may carry:
//   - null where we keep a plain String or Vec      -> "" / []
//   - "2024-03-01T09:30:00" (no offset, no Z)        -> read as UTC
//   - "2024-03-01T09:30:00.1234567Z" (7 digits)      -> RFC 3339, fine as is
// An absent field never reaches these; `#[serde(default)]` covers it.

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(DateTime::default()),
        Some(raw) => parse_timestamp(&raw)
            .ok_or_else(|| <D::Error as serde::de::Error>::custom(format!("invalid timestamp '{}'", raw))),
    }
}

/// Parse an RFC 3339 timestamp, or an offset-less one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
