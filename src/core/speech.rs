//! Text-to-speech through the Google Translate speech endpoint.

use crate::config::AppConfig;
use crate::core::language::Language;
use crate::core::traits::SpeechSynthesizer;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error, warn};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Spoken when the reply text is empty.
pub const EMPTY_TEXT_PLACEHOLDER: &str = "ಸಂದೇಶ ಲಭ್ಯವಿಲ್ಲ";

/// The endpoint rejects longer `q` parameters.
const MAX_CHUNK_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("speech endpoint returned {0}")]
    Status(StatusCode),

    #[error("speech endpoint returned non-audio content: {0}")]
    NotAudio(String),

    #[error("speech endpoint returned no audio")]
    Empty,
}

/// Knobs that differ between the first attempt and the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt {
    slow: bool,
    /// Reject responses that are not tagged as audio.
    check: bool,
}

pub struct GoogleSpeechSynthesizer {
    config: Ref<AppConfig>,
    client: reqwest::Client,
}

#[injectable(SpeechSynthesizer)]
impl GoogleSpeechSynthesizer {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> GoogleSpeechSynthesizer {
        GoogleSpeechSynthesizer {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl GoogleSpeechSynthesizer {
    async fn render(
        &self,
        text: &str,
        language: Language,
        attempt: Attempt,
    ) -> Result<Vec<u8>, SpeechError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let total = chunks.len().to_string();
        let speed = if attempt.slow { "0.3" } else { "1" };
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let response = self
                .client
                .get(&self.config.speech.url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language.code()),
                    ("ttsspeed", speed),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.to_string().as_str()),
                    ("textlen", chunk.chars().count().to_string().as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SpeechError::Status(status));
            }

            if attempt.check {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_owned();
                if !content_type.starts_with("audio/") {
                    return Err(SpeechError::NotAudio(content_type));
                }
            }

            audio.extend_from_slice(&response.bytes().await?);
        }

        if audio.is_empty() {
            return Err(SpeechError::Empty);
        }
        Ok(audio)
    }

    async fn render_with_fallback(&self, text: &str, language: Language) -> Option<Vec<u8>> {
        let first = Attempt {
            slow: language != Language::English,
            check: true,
        };
        match self.render(text, language, first).await {
            Ok(audio) => return Some(audio),
            Err(e) => warn!("speech synthesis failed, retrying relaxed: {e}"),
        }

        let relaxed = Attempt {
            slow: false,
            check: false,
        };
        self.render(text, language, relaxed)
            .await
            .inspect_err(|e| error!("speech synthesis failed: {e}"))
            .ok()
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeechSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
        cancel: CancellationToken,
    ) -> Option<String> {
        let text = match text.trim() {
            "" => EMPTY_TEXT_PLACEHOLDER,
            trimmed => trimmed,
        };
        let filename = format!("{}.mp3", Uuid::new_v4().simple());
        let path = self.config.voices_dir.join(&filename);

        let produce = async {
            match self.render_with_fallback(text, language).await {
                Some(audio) => write_audio(&path, &audio).await,
                None => false,
            }
        };

        let produced = tokio::select! {
            produced = produce => produced,
            _ = cancel.cancelled() => {
                debug!("speech synthesis cancelled");
                false
            }
        };

        if produced {
            Some(filename)
        } else {
            // Covers both a cancelled write and a zero-length file.
            let _ = tokio::fs::remove_file(&path).await;
            None
        }
    }
}

/// Writes the audio and confirms a non-empty file landed on disk.
async fn write_audio(path: &Path, audio: &[u8]) -> bool {
    if let Err(e) = tokio::fs::write(path, audio).await {
        error!("failed to write {}: {e}", path.display());
        return false;
    }
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

/// Splits text into pieces of at most `max_chars` characters, preferring
/// whitespace boundaries.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len > max_chars {
            // A single overlong word is cut at character boundaries.
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("water the paddy", 100), vec!["water the paddy"]);
    }

    #[test]
    fn chunks_respect_the_limit() {
        let text = "spray neem oil every week ".repeat(20);
        let chunks = split_text(&text, 100);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn multibyte_text_is_counted_in_chars() {
        let word = "ಬೆಳೆ";
        let text = vec![word; 40].join(" ");
        for chunk in split_text(&text, 20) {
            assert!(chunk.chars().count() <= 20);
        }
    }

    #[test]
    fn overlong_words_are_cut() {
        let word = "a".repeat(250);
        let chunks = split_text(&word, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }
}
