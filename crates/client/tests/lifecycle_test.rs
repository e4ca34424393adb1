// crates/client/tests/lifecycle_test.rs
//! Full upload → trigger → poll → completion lifecycle over a mocked
//! REST backend.

use std::sync::Arc;

use mockito::Matcher;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use batchtrack_client::{DefaultProgressStrategy, JobController, RestJobDataProvider};
use batchtrack_store::{JobStore, SessionStore};
use batchtrack_types::{JobProviderConfig, JobStatus};

fn config() -> JobProviderConfig {
    JobProviderConfig {
        service: "pricing-import".to_string(),
        upload_endpoint: "uploadpricing".to_string(),
        search_endpoint: "searchpricingentries".to_string(),
        overview_endpoint: "searchpricingfiles".to_string(),
        translation_key: "pricing.import".to_string(),
        required_columns: vec!["Article".to_string(), "Price".to_string()],
        overview_task: None,
    }
}

fn row(id: &str, row_status: &str, error: Option<&str>, updated: &str) -> serde_json::Value {
    json!({
        "id": id,
        "excelfile": "a.xlsx",
        "rowStatus": row_status,
        "errorMessage": error,
        "createdAt": "2026-02-05T12:00:00Z",
        "updatedAt": updated,
    })
}

struct Harness {
    _dir: TempDir,
    store: Arc<JobStore>,
    controller: Arc<JobController>,
}

fn harness(server: &mockito::ServerGuard) -> Harness {
    let dir = TempDir::new().unwrap();
    let session = Arc::new(SessionStore::open(dir.path()).unwrap());
    let store = Arc::new(JobStore::new(Arc::clone(&session)));
    let provider = Arc::new(RestJobDataProvider::new(
        server.url(),
        config(),
        reqwest::Client::new(),
    ));
    let controller = JobController::new(
        provider,
        Arc::new(DefaultProgressStrategy),
        Arc::clone(&store),
        session,
    );
    Harness {
        _dir: dir,
        store,
        controller,
    }
}

async fn mock_entries(server: &mut mockito::ServerGuard, rows: serde_json::Value) -> mockito::Mock {
    server.reset_async().await;
    server
        .mock("GET", "/searchpricingentries")
        .match_query(Matcher::UrlEncoded("filename".into(), "a.xlsx".into()))
        .with_status(200)
        .with_body(rows.to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn upload_poll_and_terminal_detection() {
    let mut server = mockito::Server::new_async().await;
    let h = harness(&server);

    // Upload and trigger: 3 rows, none processed yet.
    let _upload = server
        .mock("POST", "/uploadfile")
        .with_status(200)
        .with_body(json!({"filename": "a.xlsx"}).to_string())
        .create_async()
        .await;
    let _trigger = server
        .mock("PUT", "/uploadpricing")
        .match_query(Matcher::UrlEncoded("filename".into(), "a.xlsx".into()))
        .with_status(200)
        .with_body(
            json!({
                "excelfile": "a.xlsx",
                "entries": [
                    row("r0", "QUEUED", None, "2026-02-05T12:00:00Z"),
                    row("r1", "QUEUED", None, "2026-02-05T12:00:00Z"),
                    row("r2", "QUEUED", None, "2026-02-05T12:00:00Z"),
                ],
            })
            .to_string(),
        )
        .create_async()
        .await;

    let progress = h
        .controller
        .process_file_and_create_job("pricing.xlsx", b"sheet".to_vec())
        .await
        .unwrap();
    assert_eq!(progress.status, JobStatus::Running);
    assert_eq!(progress.progress, 0);
    assert_eq!(progress.total, 3);

    let running = h.store.running_jobs("pricing-import");
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].progress, 0);

    // Second poll: 2 of 3 processed, no failures.
    let _entries = mock_entries(
        &mut server,
        json!([
            row("r0", "PROCESSED", None, "2026-02-05T12:01:00Z"),
            row("r1", "PROCESSED", None, "2026-02-05T12:02:00Z"),
            row("r2", "QUEUED", None, "2026-02-05T12:00:00Z"),
        ]),
    )
    .await;

    let still_running = h.controller.get_running_jobs().await.unwrap();
    assert_eq!(still_running.len(), 1);
    assert_eq!(still_running[0].progress, 66);
    assert_eq!(still_running[0].status, JobStatus::Running);
    assert_eq!(h.store.running_jobs("pricing-import")[0].progress, 66);

    // Final poll: all processed, one failure.
    let _entries = mock_entries(
        &mut server,
        json!([
            row("r0", "PROCESSED", None, "2026-02-05T12:01:00Z"),
            row("r1", "PROCESSED", None, "2026-02-05T12:02:00Z"),
            row("r2", "PROCESSED", Some("invalid price"), "2026-02-05T12:03:00Z"),
        ]),
    )
    .await;

    let still_running = h.controller.get_running_jobs().await.unwrap();
    assert!(still_running.is_empty());
    assert!(h.store.running_jobs("pricing-import").is_empty());

    let completed = h.store.completed_jobs("pricing-import");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].status, JobStatus::Failed);
    assert_eq!(completed[0].failed, 1);
    assert_eq!(completed[0].successful, 2);
    assert_eq!(
        completed[0].end_time.unwrap().to_rfc3339(),
        "2026-02-05T12:03:00+00:00"
    );

    // The detail view reuses the rows fetched by the final poll.
    let details = h.controller.load_job_details("a.xlsx").await.unwrap();
    assert_eq!(details.entries.len(), 3);
    assert_eq!(
        details.entry_statuses,
        vec![
            batchtrack_types::EntryStatus::Success,
            batchtrack_types::EntryStatus::Success,
            batchtrack_types::EntryStatus::Failed,
        ]
    );
}

#[tokio::test]
async fn upload_error_propagates_and_creates_no_job() {
    let mut server = mockito::Server::new_async().await;
    let h = harness(&server);

    let _upload = server
        .mock("POST", "/uploadfile")
        .with_status(500)
        .create_async()
        .await;

    let result = h
        .controller
        .process_file_and_create_job("pricing.xlsx", b"sheet".to_vec())
        .await;
    assert!(result.is_err());
    assert!(h.store.running_jobs("pricing-import").is_empty());
    assert!(h.controller.active_jobs_snapshot().is_empty());
}
