//! Speech synthesis: one dialogue line -> one stored audio clip.
//!
//! The remote capability sits behind [`SpeechClient`] so stages can run
//! against a fake. Clips are stored as `line-{index}.mp3` inside the
//! per-script clip directory; the index in the file name, not any
//! in-memory list, is what makes assembly order recoverable.

use crate::config::SpeechConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;

#[async_trait]
pub trait SpeechClient: Send + Sync {
    /// Render `text` with the given voice profile into audio bytes.
    async fn synthesize(&self, voice: &str, text: &str) -> Result<Vec<u8>>;
}

/// One raw dialogue line split into an optional speaker prefix and the
/// spoken remainder. The split is on the FIRST colon; both halves keep
/// their original spelling so the line can be reconstructed exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    pub speaker: Option<String>,
    pub text: String,
}

/// A prefix is only treated as a speaker name when it is short and stays
/// on one line; anything else is free text spoken by the narrator.
const MAX_SPEAKER_LEN: usize = 40;

impl DialogueLine {
    pub fn parse(raw: &str) -> Self {
        if let Some((before, after)) = raw.split_once(':') {
            let candidate = before.trim();
            if !candidate.is_empty() && before.len() <= MAX_SPEAKER_LEN && !before.contains('\n') {
                return Self {
                    speaker: Some(before.to_string()),
                    text: after.to_string(),
                };
            }
        }
        Self {
            speaker: None,
            text: raw.to_string(),
        }
    }

    /// Inverse of [`parse`]: reconstructs the original line byte for byte.
    pub fn rejoin(&self) -> String {
        match &self.speaker {
            Some(speaker) => format!("{}:{}", speaker, self.text),
            None => self.text.clone(),
        }
    }

    /// Speaker name with surrounding whitespace and a trailing
    /// `(emotion)` tag removed, for voice lookup.
    pub fn speaker_name(&self) -> Option<&str> {
        let speaker = self.speaker.as_deref()?.trim();
        let name = match speaker.find('(') {
            Some(pos) => speaker[..pos].trim_end(),
            None => speaker,
        };
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// What actually gets synthesized. A line whose remainder is empty
    /// (e.g. a bare scene header) is spoken whole.
    pub fn spoken_text(&self) -> String {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            self.rejoin().trim().to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Map a speaker to a configured voice id, falling back to the narrator
/// voice for unknown speakers and speakerless lines.
pub fn resolve_voice<'a>(config: &'a SpeechConfig, speaker: Option<&str>) -> &'a str {
    speaker
        .and_then(|name| config.voices.get(name))
        .map(String::as_str)
        .unwrap_or(&config.narrator_voice)
}

/// A stored clip, addressed by its document-order index.
#[derive(Debug, Clone)]
pub struct SynthesizedClip {
    pub index: usize,
    pub speaker: String,
    pub path: PathBuf,
}

/// Synthesize one line and store it as `line-{index}.mp3`.
///
/// The clip is written to a temp name and renamed into place, so a failed
/// or aborted call never leaves a partial clip for assembly to pick up.
pub async fn synthesize_line(
    client: &dyn SpeechClient,
    config: &SpeechConfig,
    clip_dir: &Path,
    index: usize,
    raw_line: &str,
) -> Result<SynthesizedClip> {
    let line = DialogueLine::parse(raw_line);
    let voice = resolve_voice(config, line.speaker_name());
    let speaker = line
        .speaker_name()
        .unwrap_or("Narrator")
        .to_string();

    let audio = client.synthesize(voice, &line.spoken_text()).await?;

    let path = clip_dir.join(format!("line-{}.mp3", index));
    let tmp = clip_dir.join(format!("line-{}.mp3.tmp", index));
    if let Err(err) = fs::write(&tmp, &audio).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err.into());
    }
    fs::rename(&tmp, &path).await?;

    Ok(SynthesizedClip {
        index,
        speaker,
        path,
    })
}

// --- HTTP inference provider ---

pub struct HttpSpeechClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpSpeechClient {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechClient for HttpSpeechClient {
    async fn synthesize(&self, voice: &str, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, self.model);
        let body = json!({
            "inputs": text,
            "parameters": { "voice": voice },
            "options": { "use_cache": true },
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(PipelineError::SynthesisFailed(format!(
                "{}: {}",
                status, detail
            )));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}
