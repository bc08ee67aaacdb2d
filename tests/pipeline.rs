//! Media pipeline and queue tests

use std::sync::Arc;
use std::time::Duration;

use line_gemini_gateway::channels::line::Source;
use line_gemini_gateway::config::MediaConfig;
use line_gemini_gateway::media::{FALLBACK_TEXT, MediaJob, MediaPipeline, MediaQueue, UPLOAD_FAILED_PREFIX};
use line_gemini_gateway::storage::{MediaKind, ObjectNamer};

mod common;
use common::{BUCKET, MockMessenger, MockStorage, MockTranscriber, rendered};

fn group_source(group: &str) -> Source {
    Source {
        kind: "group".to_string(),
        user_id: Some("U1".to_string()),
        group_id: Some(group.to_string()),
        room_id: None,
    }
}

fn pipeline(
    messenger: &Arc<MockMessenger>,
    storage: MockStorage,
    transcriber: MockTranscriber,
) -> MediaPipeline {
    MediaPipeline::new(
        messenger.clone(),
        Arc::new(storage),
        Arc::new(transcriber),
        ObjectNamer::new("test-files/"),
    )
}

#[tokio::test]
async fn empty_transcript_pushes_fallback_with_url() {
    let messenger = Arc::new(MockMessenger::default());
    let pipeline = pipeline(&messenger, MockStorage::default(), MockTranscriber::returning("   "));
    let job = MediaJob::for_event("v1", MediaKind::Video, &group_source("G1")).unwrap();

    let report = pipeline.run(&job).await;

    assert!(report.delivered);
    assert_eq!(report.message_text, FALLBACK_TEXT);
    assert!(report.transcript.is_empty());
    let object = report.object.expect("video stored");
    assert_eq!(object.bucket, BUCKET);
    assert!(object.key.starts_with("test-files/"));
    assert!(object.key.ends_with(".mp4"));

    let pushes = messenger.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "G1");
    let pushed = rendered(&pushes[0].1[0]);
    assert!(pushed.contains(FALLBACK_TEXT));
    assert!(pushed.contains(&object.public_url()));
}

#[tokio::test]
async fn upload_failure_pushes_error_text() {
    let messenger = Arc::new(MockMessenger::default());
    let storage = MockStorage {
        fail: true,
        ..MockStorage::default()
    };
    let transcriber = MockTranscriber::returning("never used");
    let pipeline = pipeline(&messenger, storage, transcriber);
    let job = MediaJob::for_event("v1", MediaKind::Video, &group_source("G1")).unwrap();

    let report = pipeline.run(&job).await;

    assert!(report.delivered);
    assert!(report.object.is_none());
    assert!(report.message_text.starts_with(UPLOAD_FAILED_PREFIX), "{}", report.message_text);
    assert!(report.message_text.contains("bucket unavailable"));
    assert_eq!(report.failures.len(), 1);

    let pushes = messenger.pushes();
    assert_eq!(pushes[0].0, "G1");
    assert_eq!(rendered(&pushes[0].1[0]), report.message_text);
}

#[tokio::test]
async fn fetch_failure_skips_upload() {
    let messenger = Arc::new(MockMessenger {
        fail_fetch: true,
        ..MockMessenger::default()
    });
    let pipeline = pipeline(&messenger, MockStorage::default(), MockTranscriber::default());
    let job = MediaJob::for_event("v1", MediaKind::Video, &group_source("G1")).unwrap();

    let report = pipeline.run(&job).await;

    assert!(report.object.is_none());
    assert!(report.message_text.starts_with(UPLOAD_FAILED_PREFIX));
    assert!(report.message_text.contains("content for v1 unavailable"));
    assert!(report.delivered);
}

#[tokio::test]
async fn transcription_error_reads_as_empty() {
    let messenger = Arc::new(MockMessenger::default());
    let transcriber = MockTranscriber {
        fail: true,
        ..MockTranscriber::default()
    };
    let pipeline = pipeline(&messenger, MockStorage::default(), transcriber);
    let job = MediaJob::for_event("v1", MediaKind::Video, &group_source("G1")).unwrap();

    let report = pipeline.run(&job).await;

    assert_eq!(report.message_text, FALLBACK_TEXT);
    assert!(report.object.is_some());
    assert_eq!(report.failures.len(), 1);
    assert!(report.delivered);
}

#[tokio::test]
async fn queue_runs_jobs_and_reports() {
    let messenger = Arc::new(MockMessenger::default());
    let pipeline = Arc::new(pipeline(&messenger, MockStorage::default(), MockTranscriber::returning("hello")));
    let queue = MediaQueue::start(
        pipeline,
        &MediaConfig {
            queue_capacity: 8,
            max_concurrent_jobs: 2,
        },
    );

    let mut handles = Vec::new();
    for i in 0..5 {
        let job = MediaJob::for_event(format!("v{i}"), MediaKind::Video, &group_source(&format!("G{i}"))).unwrap();
        handles.push(queue.submit(job).unwrap());
    }

    let mut keys = Vec::new();
    for handle in handles {
        let job_id = handle.job_id();
        let report = tokio::time::timeout(Duration::from_secs(5), handle.report())
            .await
            .expect("job finished")
            .unwrap();
        assert_eq!(report.job_id, job_id);
        assert_eq!(report.transcript, "hello");
        keys.push(report.object.unwrap().key);
    }

    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 5, "object names must be unique");
    assert_eq!(messenger.pushes().len(), 5);
}
