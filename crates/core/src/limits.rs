//! Size and concurrency limits for the session tracker.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Batch Limits ===

/// Maximum items in one batch-tracking call.
///
/// Matches the store's native batch-write ceiling.
pub const MAX_BATCH_EVENTS: usize = 25;

/// Event writes in flight at once during batch ingestion.
pub const BATCH_WINDOW_SIZE: usize = 5;

/// Items per request for bulk puts (store-imposed).
pub const STORE_BATCH_WRITE_LIMIT: usize = 25;

// === Listing Limits ===

/// Default page size for sessions-by-user.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Maximum page size for sessions-by-user.
pub const MAX_LIST_LIMIT: usize = 100;

// === String Field Limits (chars) ===

/// Session ID max length.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// External (user) ID max length. Emails are ~50, custom IDs up to 256.
pub const MAX_EXTERNAL_ID_LEN: usize = 256;

/// User agent string max length.
/// Browser UAs: 100-300 typical, 500+ with extensions.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// IP address max length (IPv6 = 45 chars).
pub const MAX_IP_LEN: usize = 45;

// === Payload Limits ===

/// Maximum serialized size of `metadata` / `eventData` in bytes (16KB).
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024;
