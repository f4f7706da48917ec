//! Batch upload against a live HTTP server

use std::time::Duration;

use costguard_core::batch::{BatchUploadOrchestrator, FileSelection, FileUploader, UploadState};
use costguard_core::{InvoiceCreate, RetryPolicy, SourceFile};
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};


fn csv(name: &str) -> SourceFile {
    SourceFile::new(name, 1_700_000_000_000, format!("file,{}\n", name).into_bytes())
}

async fn mount_upload(server: &MockServer, file_name: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/invoices/"))
        .and(body_string_contains(format!("filename=\"{}\"", file_name)))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_one_failing_file_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    mount_upload(
        &server,
        "jan.csv",
        ResponseTemplate::new(201).set_body_json(test_support::invoice_json("inv-jan")),
    )
    .await;
    mount_upload(&server, "feb.csv", ResponseTemplate::new(503)).await;
    mount_upload(
        &server,
        "mar.csv",
        ResponseTemplate::new(201).set_body_json(test_support::invoice_json("inv-mar")),
    )
    .await;

    let mut selection = FileSelection::new();
    selection.add(vec![csv("jan.csv"), csv("feb.csv"), csv("mar.csv")]);

    let uploader = FileUploader::new(
        test_support::client_for(&server),
        InvoiceCreate::new("user-1", "USD").with_vendor_id("vendor-acme"),
    );
    let mut observed = 0;
    let session =
        BatchUploadOrchestrator::upload_files(selection.into_files(), &uploader, |_| observed += 1).await;

    assert!(!session.is_processing());
    assert_eq!(session.success_count(), 2);
    assert_eq!(session.error_count(), 1);
    assert_eq!(observed, 8);

    let names: Vec<_> = session.items().iter().map(|i| i.file().name()).collect();
    assert_eq!(names, vec!["jan.csv", "feb.csv", "mar.csv"]);
    assert_eq!(session.items()[0].invoice().unwrap().id, "inv-jan");
    assert_eq!(
        session.items()[1].state(),
        &UploadState::Error("503 Service Unavailable".to_string())
    );
    assert_eq!(session.items()[2].invoice().unwrap().id, "inv-mar");

    // No automatic retry for uploads
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retrying_uploader_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/invoices/"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/invoices/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(test_support::invoice_json("inv-1")))
        .mount(&server)
        .await;

    let uploader = FileUploader::new(test_support::client_for(&server), InvoiceCreate::new("user-1", "USD"))
        .with_retry(RetryPolicy::new(2).with_base_delay(Duration::from_millis(10)));

    let session = BatchUploadOrchestrator::upload_files(vec![csv("jan.csv")], &uploader, |_| {}).await;

    assert_eq!(session.summary().succeeded, 1);
    assert!(session.summary().all_succeeded());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_validation_failure_message_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/invoices/"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(serde_json::json!({"detail": [{"msg": "Could not parse invoice date"}]})),
        )
        .mount(&server)
        .await;

    let uploader = FileUploader::new(test_support::client_for(&server), InvoiceCreate::new("user-1", "USD"))
        .with_retry(RetryPolicy::default());

    let session = BatchUploadOrchestrator::upload_files(vec![csv("bad.csv")], &uploader, |_| {}).await;

    assert_eq!(session.items()[0].error_message(), Some("Could not parse invoice date"));
    // Client errors are not retried even when retry is enabled
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
