/// Process identifiers are random v4 UUIDs handed out by `initiate`.
pub type ProcessId = uuid::Uuid;

/// Page identifiers are random v4 UUIDs, unique within their process.
pub type PageId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
