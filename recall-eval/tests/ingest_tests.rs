//! Media ingestion and submission tests

mod helpers;

use helpers::{memory_pool, seed_questions, temp_store, StubJudge, StubTranscoder, StubTranscriber};
use recall_common::events::EventBus;
use recall_eval::db;
use recall_eval::domain::{Domain, MediaKind};
use recall_eval::ingest::{IngestError, MediaIngestor, Upload};
use recall_eval::pipeline::{EvaluationPipeline, PipelineEvent, SubmitError, Submission, WorkerPool};
use recall_eval::router::ResultRouter;
use recall_eval::storage::MediaStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WAV_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt \x10\x00\x00\x00";
const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

fn scratch_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path().join("scratch"))
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[tokio::test]
async fn test_audio_upload_stores_raw_and_normalized() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let transcoder = StubTranscoder::copying();
    let ingestor = MediaIngestor::new(store.clone(), transcoder.clone(), "uploads", dir.path().join("scratch"));

    let receipt = ingestor
        .ingest(
            &Upload::new(Some("interview.mp4".to_string()), b"....ftypmp42".to_vec()),
            Domain::Basic,
            MediaKind::Audio,
        )
        .await
        .unwrap();

    let raw = receipt.media_path.strip_suffix(".mp4").expect("raw key keeps extension");
    let normalized = receipt.storage_key.strip_suffix(".wav").expect("normalized key is wav");
    assert_eq!(raw, normalized);
    assert!(raw.starts_with("uploads/basic/"));
    assert!(raw.ends_with("_interview"));

    assert!(store.exists(&receipt.media_path).await.unwrap());
    assert!(store.exists(&receipt.storage_key).await.unwrap());
    assert!(store.get(&receipt.storage_key).await.unwrap().starts_with(b"RIFF"));
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
    assert!(scratch_is_empty(&dir));
}

#[tokio::test]
async fn test_wav_upload_gets_distinct_normalized_key() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let ingestor = MediaIngestor::new(store.clone(), StubTranscoder::copying(), "", dir.path().join("scratch"));

    let receipt = ingestor
        .ingest(
            &Upload::new(Some("memo.wav".to_string()), WAV_HEADER.to_vec()),
            Domain::Personal,
            MediaKind::Audio,
        )
        .await
        .unwrap();

    assert!(receipt.media_path.starts_with("personal/"));
    assert!(receipt.media_path.ends_with("_memo.wav"));
    assert_eq!(
        receipt.storage_key,
        format!("{}_16k.wav", receipt.media_path.trim_end_matches(".wav"))
    );
    assert_eq!(store.get(&receipt.media_path).await.unwrap(), WAV_HEADER);
}

#[tokio::test]
async fn test_image_upload_is_stored_once() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let transcoder = StubTranscoder::copying();
    let ingestor = MediaIngestor::new(store.clone(), transcoder.clone(), "", dir.path().join("scratch"));

    let receipt = ingestor
        .ingest(
            &Upload::new(Some("drawing.jpg".to_string()), JPEG_HEADER.to_vec()),
            Domain::CognitiveImage,
            MediaKind::Image,
        )
        .await
        .unwrap();

    assert_eq!(receipt.storage_key, receipt.media_path);
    assert!(receipt.storage_key.starts_with("cognitive-image/"));
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);

    let stored: Vec<_> = walk(&dir.path().join("recall-media"));
    assert_eq!(stored.len(), 1);
}

fn walk(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(walk(&path));
        } else {
            files.push(path);
        }
    }
    files
}

#[tokio::test]
async fn test_raw_upload_skips_transcoding() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let transcoder = StubTranscoder::copying();
    let ingestor = MediaIngestor::new(store, transcoder.clone(), "", dir.path().join("scratch"));

    let receipt = ingestor
        .ingest(&Upload::new(None, WAV_HEADER.to_vec()), Domain::Basic, MediaKind::Raw)
        .await
        .unwrap();

    assert_eq!(receipt.storage_key, receipt.media_path);
    assert!(receipt.storage_key.ends_with(".wav"), "sniffed extension: {}", receipt.storage_key);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_image_with_audio_content_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let ingestor = MediaIngestor::new(store, StubTranscoder::copying(), "", dir.path().join("scratch"));

    let err = ingestor
        .ingest(
            &Upload::new(Some("photo.jpg".to_string()), WAV_HEADER.to_vec()),
            Domain::CognitiveImage,
            MediaKind::Image,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ContentMismatch { .. }));
}

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let ingestor = MediaIngestor::new(store, StubTranscoder::copying(), "", dir.path().join("scratch"));

    let err = ingestor
        .ingest(&Upload::new(Some("a.mp4".to_string()), Vec::new()), Domain::Basic, MediaKind::Audio)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::EmptyUpload));
}

#[tokio::test]
async fn test_transcode_failure_cleans_scratch() {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let ingestor = MediaIngestor::new(
        store,
        StubTranscoder::failing("exit status 1"),
        "",
        dir.path().join("scratch"),
    );

    let err = ingestor
        .ingest(
            &Upload::new(Some("broken.mp4".to_string()), b"not media".to_vec()),
            Domain::Basic,
            MediaKind::Audio,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Transcode(_)));
    assert!(scratch_is_empty(&dir));
}

struct Harness {
    _dir: TempDir,
    pool: sqlx::SqlitePool,
    submission: Submission,
    workers: Arc<WorkerPool>,
    transcriber: Arc<StubTranscriber>,
    events: EventBus<PipelineEvent>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = temp_store(dir.path()).await;
    let pool = memory_pool().await;
    let transcriber = StubTranscriber::returning("서울");

    let pipeline = EvaluationPipeline::new(
        pool.clone(),
        transcriber.clone(),
        Arc::new(StubJudge::scoring(90)),
        ResultRouter::standard(pool.clone()),
    );
    let events = EventBus::new(16);
    let workers = Arc::new(WorkerPool::start(
        Arc::new(pipeline),
        2,
        8,
        Duration::from_millis(200),
        events.clone(),
    ));
    let ingestor = Arc::new(MediaIngestor::new(
        store,
        StubTranscoder::copying(),
        "",
        dir.path().join("scratch"),
    ));

    Harness {
        submission: Submission::new(ingestor, workers.clone()),
        _dir: dir,
        pool,
        workers,
        transcriber,
        events,
    }
}

#[tokio::test]
async fn test_submit_returns_key_then_evaluates() {
    let h = harness().await;
    let q = seed_questions(&h.pool, Domain::Basic, None, 1).await[0];
    let mut rx = h.events.subscribe();

    let key = h
        .submission
        .submit(
            Domain::Basic,
            q,
            5,
            Upload::new(Some("interview.mp4".to_string()), b"....ftypmp42".to_vec()),
            None,
        )
        .await
        .unwrap();
    assert!(key.starts_with("basic/") && key.ends_with("_interview.wav"));

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, PipelineEvent::Completed { .. }));
    assert_eq!(h.transcriber.keys.lock().unwrap().as_slice(), [key.clone()]);

    h.workers.shutdown().await;
    let rows = db::answers::list_answers(&h.pool, Domain::Basic, 5).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].media_path.as_deref().unwrap().ends_with("_interview.mp4"));
}

#[tokio::test]
async fn test_submit_rejects_incoherent_kind_before_storing() {
    let h = harness().await;

    let err = h
        .submission
        .submit(
            Domain::CognitiveImage,
            1,
            5,
            Upload::new(Some("voice.mp4".to_string()), b"data".to_vec()),
            Some(MediaKind::Audio),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SubmitError::UnsupportedMediaKind {
            domain: Domain::CognitiveImage,
            kind: MediaKind::Audio
        }
    ));
    assert!(!h._dir.path().join("recall-media/cognitive-image").exists());
}

#[tokio::test]
async fn test_submit_surfaces_ingest_errors() {
    let h = harness().await;

    let err = h
        .submission
        .submit(Domain::Basic, 1, 5, Upload::new(None, Vec::new()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Ingest(IngestError::EmptyUpload)));
}
