//! End-to-end page lifecycle through `JobService` with fake capabilities.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use taleify_core::error::CoreError;
use taleify_core::page::StatusKind;
use taleify_jobs::service::SubmitPage;
use uuid::Uuid;

use common::{build_service, poll_until_terminal, FAILING_PROMPT};

fn page(prompt: &str) -> SubmitPage {
    SubmitPage {
        source_ref: "src.png".into(),
        target_ref: "tgt.png".into(),
        prompt: json!({ "prompt": prompt }),
    }
}

fn is_forward_subsequence(seen: &[StatusKind]) -> bool {
    let ranks: Vec<u8> = seen
        .iter()
        .map(|kind| match kind {
            StatusKind::Pending => 0,
            StatusKind::Processing => 1,
            StatusKind::Completed | StatusKind::Failed => 2,
        })
        .collect();
    ranks.windows(2).all(|w| w[0] < w[1])
}

// ---------------------------------------------------------------------------
// Status reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn uninitiated_process_is_not_found() {
    let jobs = build_service(Duration::from_secs(60));
    assert_matches!(
        jobs.service.get_status(Uuid::new_v4(), None),
        Err(CoreError::NotFound { entity: "Process", .. })
    );
}

#[tokio::test]
async fn initiated_process_has_no_pages() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();
    assert!(jobs.service.get_status(pid, None).unwrap().is_empty());
}

#[tokio::test]
async fn submitted_page_starts_pending() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();

    let status = jobs.service.submit_page(pid, page("hello")).unwrap();
    assert_eq!(status.process_id, pid);
    assert_eq!(status.status, StatusKind::Pending);
    assert_eq!(status.url, None);
}

#[tokio::test]
async fn submit_to_unknown_process_is_not_found_and_schedules_nothing() {
    let jobs = build_service(Duration::from_secs(60));
    assert_matches!(
        jobs.service.submit_page(Uuid::new_v4(), page("hello")),
        Err(CoreError::NotFound { .. })
    );
    assert_eq!(jobs.service.runner().active(), 0);
}

#[tokio::test]
async fn invalid_page_payload_is_rejected_synchronously() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();

    let mut bad_ref = page("hello");
    bad_ref.source_ref = "ftp://elsewhere/a.png".into();
    assert_matches!(jobs.service.submit_page(pid, bad_ref), Err(CoreError::Validation(_)));

    let mut bad_prompt = page("hello");
    bad_prompt.prompt = json!({ "prompt": 42 });
    assert_matches!(jobs.service.submit_page(pid, bad_prompt), Err(CoreError::Validation(_)));

    assert!(jobs.service.get_status(pid, None).unwrap().is_empty());
}

#[tokio::test]
async fn status_reads_are_idempotent() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();
    let page_id = jobs.service.submit_page(pid, page("hello")).unwrap().page_id;
    let (terminal, _) = poll_until_terminal(&jobs.service, pid, page_id).await;

    let first = jobs.service.get_status(pid, Some(page_id)).unwrap();
    let second = jobs.service.get_status(pid, Some(page_id)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0], terminal);
}

// ---------------------------------------------------------------------------
// Pipeline outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_page_completes_with_url() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();
    let page_id = jobs.service.submit_page(pid, page("hello")).unwrap().page_id;

    let (status, seen) = poll_until_terminal(&jobs.service, pid, page_id).await;
    assert_eq!(status.status, StatusKind::Completed);
    let url = status.url.unwrap();
    assert!(url.starts_with(&format!("http://test.local/storage/uploads/p_{page_id}_")));
    assert_eq!(status.error, None);
    assert!(is_forward_subsequence(&seen), "{seen:?}");
}

#[tokio::test]
async fn failing_synthesis_marks_page_failed() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();
    let page_id = jobs.service.submit_page(pid, page(FAILING_PROMPT)).unwrap().page_id;

    let (status, seen) = poll_until_terminal(&jobs.service, pid, page_id).await;
    assert_eq!(status.status, StatusKind::Failed);
    assert_eq!(status.url, None);
    let error = status.error.unwrap();
    assert!(error.contains("synthesis backend unavailable"), "{error}");
    assert!(is_forward_subsequence(&seen), "{seen:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sibling_pages_finish_independently() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();

    let ok = jobs.service.submit_page(pid, page("hello")).unwrap().page_id;
    let bad = jobs.service.submit_page(pid, page(FAILING_PROMPT)).unwrap().page_id;

    let (ok_status, _) = poll_until_terminal(&jobs.service, pid, ok).await;
    let (bad_status, _) = poll_until_terminal(&jobs.service, pid, bad).await;
    assert_eq!(ok_status.status, StatusKind::Completed);
    assert_eq!(bad_status.status, StatusKind::Failed);

    let all = jobs.service.get_status(pid, None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].page_id, ok);
    assert_eq!(all[1].page_id, bad);
    assert_eq!(jobs.synthesizer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_pages_of_one_process_all_land() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();

    let pages: Vec<_> = (0..20)
        .map(|i| {
            let prompt = if i % 3 == 0 { FAILING_PROMPT } else { "hello" };
            jobs.service.submit_page(pid, page(prompt)).unwrap().page_id
        })
        .collect();

    assert!(jobs.service.runner().drain(Duration::from_secs(10)).await);

    let all = jobs.service.get_status(pid, None).unwrap();
    assert_eq!(all.iter().map(|s| s.page_id).collect::<Vec<_>>(), pages);
    for (i, status) in all.iter().enumerate() {
        let expected = if i % 3 == 0 { StatusKind::Failed } else { StatusKind::Completed };
        assert_eq!(status.status, expected, "page {i}");
    }
}

// ---------------------------------------------------------------------------
// Expiry and introspection
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn untouched_process_expires() {
    let jobs = build_service(Duration::from_secs(1));
    let pid = jobs.service.initiate().unwrap();

    tokio::time::advance(Duration::from_millis(1050)).await;
    assert_matches!(jobs.service.get_status(pid, None), Err(CoreError::NotFound { .. }));
}

#[tokio::test]
async fn cache_status_lists_live_processes() {
    let jobs = build_service(Duration::from_secs(60));
    let pid = jobs.service.initiate().unwrap();
    jobs.service.submit_page(pid, page("hello")).unwrap();
    jobs.service.runner().drain(Duration::from_secs(5)).await;

    let status = jobs.service.cache_status();
    assert_eq!(status.current_size, 1);
    assert_eq!(status.max_size, 100);
    assert_eq!(status.ttl_secs, 60);
    assert_eq!(status.entries[0].process_id, pid);
    assert_eq!(status.entries[0].pages, 1);
    assert!(status.entries[0].ttl_remaining_secs <= 60);
}
