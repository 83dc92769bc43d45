//! Read-only projection of registry state into caller-facing statuses.

use taleify_core::error::CoreError;
use taleify_core::page::PageStatus;
use taleify_core::types::{PageId, ProcessId};

use crate::registry::JobRegistry;

/// Statuses for one page, or for every page of the process in submission
/// order when `page_id` is `None`.
///
/// Never mutates the registry and never refreshes a TTL.
pub fn get_status(
    registry: &JobRegistry,
    process_id: ProcessId,
    page_id: Option<PageId>,
) -> Result<Vec<PageStatus>, CoreError> {
    let record = registry
        .record(process_id)
        .ok_or_else(|| CoreError::not_found("Process", process_id))?;

    match page_id {
        Some(page_id) => {
            let entry = record
                .get(&page_id)
                .ok_or_else(|| CoreError::not_found("Page", page_id))?;
            Ok(vec![PageStatus::from_entry(process_id, page_id, entry)])
        }
        None => Ok(record
            .iter()
            .map(|(page_id, entry)| PageStatus::from_entry(process_id, *page_id, entry))
            .collect()),
    }
}
