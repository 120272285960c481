//! Speech synthesis against a scripted local endpoint.

mod common;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Router;
use axum::routing::get;
use common::{spawn_server, test_config};
use di::Ref;
use krishi_mitra::core::language::Language;
use krishi_mitra::core::speech::GoogleSpeechSynthesizer;
use krishi_mitra::core::traits::SpeechSynthesizer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

type Reply = (StatusCode, &'static str, &'static [u8]);

const AUDIO: Reply = (StatusCode::OK, "audio/mpeg", b"ID3fake-mp3-bytes");
const FAILURE: Reply = (StatusCode::INTERNAL_SERVER_ERROR, "text/plain", b"unavailable");

/// Answers the n-th request with the n-th reply, repeating the last one.
#[derive(Clone)]
struct Script {
    replies: Arc<Vec<Reply>>,
    delay: Duration,
    seen: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Script {
    fn queries(&self) -> Vec<HashMap<String, String>> {
        self.seen.lock().unwrap().clone()
    }
}

async fn translate_tts(
    State(script): State<Script>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let hit = {
        let mut seen = script.seen.lock().unwrap();
        seen.push(query);
        seen.len() - 1
    };
    tokio::time::sleep(script.delay).await;

    let (status, content_type, body) = script.replies[hit.min(script.replies.len() - 1)];
    (status, [(CONTENT_TYPE, content_type)], body).into_response()
}

async fn synthesizer(
    replies: Vec<Reply>,
    delay: Duration,
) -> (GoogleSpeechSynthesizer, Script, TempDir) {
    let script = Script {
        replies: Arc::new(replies),
        delay,
        seen: Arc::default(),
    };
    let addr = spawn_server(
        Router::new()
            .route("/translate_tts", get(translate_tts))
            .with_state(script.clone()),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.speech.url = format!("http://{addr}/translate_tts");
    config.ensure_directories().unwrap();

    (GoogleSpeechSynthesizer::create(Ref::new(config)), script, dir)
}

fn voice_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path().join("voices"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_audio_is_written_to_voices_dir() {
    let (speech, script, dir) = synthesizer(vec![AUDIO], Duration::ZERO).await;

    let filename = speech
        .synthesize("Use neem oil", Language::English, CancellationToken::new())
        .await
        .unwrap();

    assert!(filename.ends_with(".mp3"));
    assert_eq!(voice_files(&dir), [filename.clone()]);
    let written = std::fs::read(dir.path().join("voices").join(&filename)).unwrap();
    assert_eq!(written, AUDIO.2);

    let queries = script.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["tl"], "en");
    assert_eq!(queries[0]["q"], "Use neem oil");
    assert_eq!(queries[0]["ttsspeed"], "1");
}

#[tokio::test]
async fn test_failed_first_attempt_is_retried_at_normal_speed() {
    let (speech, script, dir) = synthesizer(vec![FAILURE, AUDIO], Duration::ZERO).await;

    let filename = speech
        .synthesize("ಬೇವಿನ ಎಣ್ಣೆ ಬಳಸಿ", Language::Kannada, CancellationToken::new())
        .await;

    assert!(filename.is_some());
    assert_eq!(voice_files(&dir).len(), 1);
    let queries = script.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["tl"], "kn");
    assert_eq!(queries[0]["ttsspeed"], "0.3");
    assert_eq!(queries[1]["ttsspeed"], "1");
}

#[tokio::test]
async fn test_relaxed_attempt_accepts_untagged_audio() {
    let untagged: Reply = (StatusCode::OK, "application/octet-stream", b"raw-audio");
    let (speech, script, dir) = synthesizer(vec![untagged], Duration::ZERO).await;

    let filename = speech
        .synthesize("hello", Language::English, CancellationToken::new())
        .await;

    assert!(filename.is_some());
    assert_eq!(script.queries().len(), 2);
    assert_eq!(voice_files(&dir).len(), 1);
}

#[tokio::test]
async fn test_persistent_failure_leaves_no_file() {
    let (speech, script, dir) = synthesizer(vec![FAILURE], Duration::ZERO).await;

    let filename = speech
        .synthesize("hello", Language::Hindi, CancellationToken::new())
        .await;

    assert_eq!(filename, None);
    assert_eq!(script.queries().len(), 2);
    assert!(voice_files(&dir).is_empty());
}

#[tokio::test]
async fn test_long_text_is_requested_in_chunks() {
    let (speech, script, _dir) = synthesizer(vec![AUDIO], Duration::ZERO).await;
    let text = "paddy ".repeat(50);

    speech
        .synthesize(&text, Language::English, CancellationToken::new())
        .await
        .unwrap();

    let queries = script.queries();
    assert!(queries.len() > 1);
    for (idx, query) in queries.iter().enumerate() {
        assert!(query["q"].chars().count() <= 100);
        assert_eq!(query["idx"], idx.to_string());
        assert_eq!(query["total"], queries.len().to_string());
    }
}

#[tokio::test]
async fn test_empty_text_speaks_placeholder() {
    let (speech, script, _dir) = synthesizer(vec![AUDIO], Duration::ZERO).await;

    speech
        .synthesize("   ", Language::Kannada, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(script.queries()[0]["q"], "ಸಂದೇಶ ಲಭ್ಯವಿಲ್ಲ");
}

#[tokio::test]
async fn test_cancellation_stops_promptly_without_file() {
    let (speech, _script, dir) = synthesizer(vec![AUDIO], Duration::from_secs(10)).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let filename = speech.synthesize("hello", Language::English, cancel).await;

    assert_eq!(filename, None);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(voice_files(&dir).is_empty());
}
