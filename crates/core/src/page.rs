//! Page state machine and the caller-visible status record.
//!
//! A page moves strictly forward through
//! `Pending -> Processing -> {Completed, Failed}`. Skipping a step is allowed
//! (a page can fail before it ever reaches `Processing`), going back or
//! leaving a terminal state is not.

use serde::{Deserialize, Serialize};

use crate::types::{PageId, ProcessId, Timestamp};

// ---------------------------------------------------------------------------
// PageState
// ---------------------------------------------------------------------------

/// Internal state of one page. Payload lives only on the variants that have
/// one, so a pending page can never carry a stale url or error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageState {
    Pending,
    Processing,
    Completed { url: String },
    Failed { error: String },
}

impl PageState {
    /// The status label without payload.
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::Pending => StatusKind::Pending,
            Self::Processing => StatusKind::Processing,
            Self::Completed { .. } => StatusKind::Completed,
            Self::Failed { .. } => StatusKind::Failed,
        }
    }

    /// `Completed` and `Failed` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    /// Whether moving from `self` to `next` is a forward transition.
    pub fn can_transition_to(&self, next: &PageState) -> bool {
        !self.is_terminal() && next.kind().rank() > self.kind().rank()
    }
}

/// Status label as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl StatusKind {
    /// Position in the lifecycle; both terminal states share the last rank.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PageEntry
// ---------------------------------------------------------------------------

/// A page's state together with the time it was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    #[serde(flatten)]
    pub state: PageState,
    pub updated_at: Timestamp,
}

impl PageEntry {
    /// Entry stamped with the current time.
    pub fn now(state: PageState) -> Self {
        Self {
            state,
            updated_at: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// PageStatus
// ---------------------------------------------------------------------------

/// Caller-visible status of one page, as returned by status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageStatus {
    pub process_id: ProcessId,
    pub page_id: PageId,
    pub status: StatusKind,
    pub url: Option<String>,
    pub error: Option<String>,
    pub updated_at: Timestamp,
}

impl PageStatus {
    /// Flatten an entry into the wire shape.
    pub fn from_entry(process_id: ProcessId, page_id: PageId, entry: &PageEntry) -> Self {
        let (url, error) = match &entry.state {
            PageState::Completed { url } => (Some(url.clone()), None),
            PageState::Failed { error } => (None, Some(error.clone())),
            PageState::Pending | PageState::Processing => (None, None),
        };
        Self {
            process_id,
            page_id,
            status: entry.state.kind(),
            url,
            error,
            updated_at: entry.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
