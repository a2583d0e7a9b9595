mod common;

use std::time::Duration;

use common::{item, pdf, session, RecordingApi, RecordingNotifier};
use prep101_client::model::{CandidateFile, FileType};
use prep101_client::notify::Notice;
use prep101_client::upload::{UploadCoordinator, UploadState, CANCELLED};
use prep101_client::ClientError;

const MIB: usize = 1024 * 1024;
const LIMIT: u64 = 10 * 1024 * 1024;

#[tokio::test]
async fn two_sides_pdfs_become_one_batch() {
    let api = RecordingApi::default();
    api.push_upload(Ok(item("up-a", "sceneA.pdf", 500, &["ALEX"]))).await;
    api.push_upload(Ok(item("up-b", "sceneB.pdf", 700, &["ALEX", "JORDAN"]))).await;
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    let files = vec![pdf("sceneA.pdf", 2 * MIB), pdf("sceneB.pdf", 3 * MIB)];
    let mut delivered = Vec::new();
    let batch = uploader
        .run(&session(), &files, FileType::Sides, |b| delivered.push(b.clone()))
        .await
        .unwrap();

    assert_eq!(batch.file_count, 2);
    assert_eq!(batch.total_word_count, 1200);
    assert_eq!(
        batch.character_names.iter().cloned().collect::<Vec<_>>(),
        vec!["ALEX".to_string(), "JORDAN".to_string()]
    );
    assert_eq!(batch.upload_ids, vec!["up-a", "up-b"]);
    assert_eq!(batch.file_types, vec![FileType::Sides, FileType::Sides]);
    assert_eq!(delivered, vec![batch.clone()]);
    assert_eq!(uploader.state(), &UploadState::Aggregated(batch.clone()));
    assert_eq!(uploader.batch(), Some(&batch));

    let calls = api.upload_calls().await;
    assert_eq!(
        calls.iter().map(|c| c.filename.as_str()).collect::<Vec<_>>(),
        vec!["sceneA.pdf", "sceneB.pdf"]
    );
    assert!(calls.iter().all(|c| c.token == "test-token"));
    assert!(calls.iter().all(|c| c.file_type == FileType::Sides));

    let notices = notifier.notices();
    assert!(matches!(&notices[0], Notice::Success(m) if m.contains("Uploaded 2 file(s)")));
    assert_eq!(
        notices[1],
        Notice::Info("Characters detected: ALEX, JORDAN".into())
    );
}

#[tokio::test]
async fn invalid_selection_never_touches_the_network() {
    let api = RecordingApi::default();
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    let files = vec![
        pdf("ok.pdf", MIB),
        CandidateFile::new("headshot.png", "image/png", vec![0; 10]),
        pdf("huge.pdf", 11 * MIB),
    ];
    let mut called = false;
    let err = uploader
        .run(&session(), &files, FileType::FullScript, |_| called = true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::InvalidFiles {
            invalid: 1,
            oversized: 1
        }
    ));
    assert!(!called);
    assert!(api.upload_calls().await.is_empty());
    assert!(uploader.batch().is_none());
    assert!(matches!(uploader.state(), UploadState::Failed(_)));
    assert_eq!(notifier.notices().len(), 1);
}

#[tokio::test]
async fn failed_upload_stops_the_rest() {
    let api = RecordingApi::default();
    api.push_upload(Ok(item("up-1", "one.pdf", 10, &[]))).await;
    api.push_upload(Err(ClientError::Server {
        status: 500,
        message: "Extraction service unavailable".into(),
    }))
    .await;
    api.push_upload(Ok(item("up-3", "three.pdf", 10, &[]))).await;
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    let files = vec![pdf("one.pdf", 10), pdf("two.pdf", 10), pdf("three.pdf", 10)];
    let mut called = false;
    let err = uploader
        .run(&session(), &files, FileType::Sides, |_| called = true)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Server { status: 500, .. }));
    assert!(!called);
    assert_eq!(api.upload_calls().await.len(), 2);
    assert!(uploader.batch().is_none());
    assert_eq!(
        notifier.notices(),
        vec![Notice::Error("Extraction service unavailable".into())]
    );
}

#[tokio::test]
async fn missing_upload_id_fails_the_batch() {
    let api = RecordingApi::default();
    api.push_upload(Err(ClientError::MissingUploadId)).await;
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    let files = vec![pdf("one.pdf", 10), pdf("two.pdf", 10)];
    let err = uploader
        .run(&session(), &files, FileType::Sides, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingUploadId));
    assert_eq!(api.upload_calls().await.len(), 1);
}

#[tokio::test]
async fn unauthorized_is_reported_as_authentication_failure() {
    let api = RecordingApi::default();
    api.push_upload(Err(ClientError::Unauthorized)).await;
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    let _ = uploader
        .run(&session(), &[pdf("one.pdf", 10)], FileType::Sides, |_| {})
        .await;
    assert_eq!(
        uploader.state(),
        &UploadState::Failed("Authentication failed. Please log in again.".into())
    );
}

#[tokio::test]
async fn new_run_supersedes_previous_batch() {
    let api = RecordingApi::default();
    api.push_upload(Ok(item("up-1", "one.pdf", 10, &["ALEX"]))).await;
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    uploader
        .run(&session(), &[pdf("one.pdf", 10)], FileType::Sides, |_| {})
        .await
        .unwrap();
    assert!(uploader.batch().is_some());

    let _ = uploader
        .run(&session(), &[], FileType::Sides, |_| {})
        .await
        .unwrap_err();
    assert!(uploader.batch().is_none());
}

#[tokio::test]
async fn dropped_run_releases_the_coordinator() {
    let api = RecordingApi {
        upload_delay: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    api.push_upload(Ok(item("up-1", "one.pdf", 10, &[]))).await;
    let notifier = RecordingNotifier::default();
    let mut uploader = UploadCoordinator::new(&api, &notifier, LIMIT);

    let aborted = tokio::time::timeout(
        Duration::from_millis(20),
        uploader.run(&session(), &[pdf("one.pdf", 10)], FileType::Sides, |_| {}),
    )
    .await;
    assert!(aborted.is_err());
    assert_eq!(uploader.state(), &UploadState::Failed(CANCELLED.into()));
    assert!(!uploader.is_busy());
    assert!(uploader.batch().is_none());

    // The next run is evaluated on its own merits rather than refused as busy.
    let err = uploader
        .run(&session(), &[], FileType::Sides, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoFiles));
    assert!(!uploader.is_busy());
}
