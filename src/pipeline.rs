//! The pipeline orchestrator: a state machine around one persistent
//! script record.
//!
//! States: Uploaded -> Extracted -> Rewritten -> DialogueReady ->
//! AudioReady. Each successful stage call advances the label exactly once;
//! a failed call leaves the script at its last reached state and the
//! caller may retry with the same id. Export is a side query from
//! Rewritten/DialogueReady and does not transition state.
//!
//! Every stage loads the record by id from the store; there is no
//! in-memory continuity between stage calls.

use crate::audio;
use crate::config::Config;
use crate::dialogue;
use crate::error::{PipelineError, Result};
use crate::extract::extract_text;
use crate::llm::LlmClient;
use crate::render::render;
use crate::rewrite::{self, RewriteOutcome};
use crate::script::{ExportFormat, Script, ScriptState};
use crate::store::ScriptStore;
use crate::tts::{synthesize_line, SpeechClient, SynthesizedClip};
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use std::fs;

pub struct Pipeline {
    config: Config,
    store: ScriptStore,
    llm: Box<dyn LlmClient>,
    speech: Box<dyn SpeechClient>,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub id: String,
    pub raw_text: String,
}

/// Which text field an export renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportVariant {
    Rewritten,
    Dialogue,
}

/// A rendered document ready to stream back to the caller.
#[derive(Debug)]
pub struct ExportDoc {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

fn join_err(e: tokio::task::JoinError) -> PipelineError {
    PipelineError::Io(std::io::Error::other(e))
}

impl Pipeline {
    pub fn new(config: Config, llm: Box<dyn LlmClient>, speech: Box<dyn SpeechClient>) -> Self {
        let store = ScriptStore::new(&config.data_folder);
        Self {
            config,
            store,
            llm,
            speech,
        }
    }

    pub fn store(&self) -> &ScriptStore {
        &self.store
    }

    pub fn get(&self, id: &str) -> Result<Script> {
        self.store.load(id)
    }

    /// Accept an upload, extract its text, and allocate the script record.
    ///
    /// Extraction is all-or-nothing: on failure no record exists at all,
    /// so a stored script always has a consistent `raw_text`.
    pub async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        let format = ExportFormat::from_file_name(file_name)
            .ok_or_else(|| PipelineError::UnsupportedFormat(file_name.to_string()))?;

        info!("extracting text from {} ({:?})", file_name, format);
        let owned = bytes.to_vec();
        let raw_text = tokio::task::spawn_blocking(move || extract_text(&owned, format))
            .await
            .map_err(join_err)??;

        let mut script = Script::new(file_name, format, raw_text);
        script.advance(ScriptState::Extracted);
        self.store.save(&script)?;
        info!("script {} created ({} chars)", script.id, script.raw_text.len());

        Ok(UploadOutcome {
            id: script.id,
            raw_text: script.raw_text,
        })
    }

    /// Rewrite stage. Overwrites `rewritten_text` and `characters` on
    /// success; downstream fields are deliberately left in place (the
    /// pipeline is not a cache with automatic invalidation).
    pub async fn rewrite(&self, id: &str, style: Option<&str>) -> Result<RewriteOutcome> {
        let mut script = self.store.load(id)?;
        info!("rewriting script {}", id);

        let outcome = rewrite::run(
            &*self.llm,
            &script.raw_text,
            style.unwrap_or(rewrite::DEFAULT_STYLE),
        )
        .await?;

        script.rewritten_text = outcome.rewritten_text.clone();
        script.characters = outcome.characters.clone();
        script.advance(ScriptState::Rewritten);
        self.store.save(&script)?;
        debug!(
            "script {} rewritten, {} characters found",
            id,
            outcome.characters.len()
        );
        Ok(outcome)
    }

    /// Manual overwrite of the rewritten text (editor save).
    pub fn update_rewritten(&self, id: &str, text: &str) -> Result<Script> {
        let mut script = self.store.load(id)?;
        script.rewritten_text = text.to_string();
        script.advance(ScriptState::Rewritten);
        self.store.save(&script)?;
        Ok(script)
    }

    /// Dialogue stage. Requires a non-empty rewrite; the stored character
    /// list is passed along as a soft constraint.
    pub async fn dialogue(&self, id: &str) -> Result<String> {
        let mut script = self.store.load(id)?;
        info!("generating dialogue for script {}", id);

        let dialogue_text =
            dialogue::run(&*self.llm, &script.rewritten_text, &script.characters).await?;

        script.dialogue_text = dialogue_text.clone();
        script.advance(ScriptState::DialogueReady);
        self.store.save(&script)?;
        Ok(dialogue_text)
    }

    /// Synthesis + assembly stage: one clip per non-empty dialogue line,
    /// synthesized with bounded concurrency, then merged in index order.
    ///
    /// Returns the clip references in input (index) order.
    pub async fn synthesize(&self, id: &str) -> Result<Vec<SynthesizedClip>> {
        let mut script = self.store.load(id)?;
        if script.dialogue_text.trim().is_empty() {
            return Err(PipelineError::MissingPrerequisite {
                stage: "synthesize",
                field: "dialogue_text",
            });
        }

        let lines: Vec<String> = script
            .dialogue_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let clip_dir = self.store.clip_dir(id);
        fs::create_dir_all(&clip_dir)?;

        info!("synthesizing {} lines for script {}", lines.len(), id);
        let concurrency = self.config.speech.concurrency.max(1);
        let mut clips: Vec<SynthesizedClip> = stream::iter(
            lines
                .iter()
                .enumerate()
                .map(|(index, line)| {
                    synthesize_line(&*self.speech, &self.config.speech, &clip_dir, index, line)
                }),
        )
        .buffer_unordered(concurrency)
        .try_collect()
        .await?;
        clips.sort_by_key(|clip| clip.index);

        let output_path = self.store.root().join(ScriptStore::audio_rel_path(id));
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        audio::assemble(&clips, &output_path)?;

        script.final_audio_path = Some(ScriptStore::audio_rel_path(id));
        script.advance(ScriptState::AudioReady);
        self.store.save(&script)?;
        info!("script {} audio ready at {:?}", id, output_path);

        Ok(clips)
    }

    /// Export side query: render the requested text field into the format
    /// resolved at upload time. Does not transition state.
    pub async fn export(&self, id: &str, variant: ExportVariant) -> Result<ExportDoc> {
        let script = self.store.load(id)?;
        let (text, field) = match variant {
            ExportVariant::Rewritten => (&script.rewritten_text, "rewritten_text"),
            ExportVariant::Dialogue => (&script.dialogue_text, "dialogue_text"),
        };
        if text.trim().is_empty() {
            return Err(PipelineError::NoContentAvailable(field));
        }

        let format = script.export_format;
        let owned = text.clone();
        let bytes = tokio::task::spawn_blocking(move || render(&owned, format))
            .await
            .map_err(join_err)??;

        Ok(ExportDoc {
            file_name: export_file_name(&script.file_name, format, variant),
            content_type: format.content_type(),
            bytes,
        })
    }
}

/// Derive the download name from the original upload name: same stem, the
/// export format's extension, and a `-dialogue` marker for the dialogue
/// variant.
pub fn export_file_name(original: &str, format: ExportFormat, variant: ExportVariant) -> String {
    let lower = original.to_lowercase();
    let stem = if lower.ends_with(".pdf") || lower.ends_with(".docx") {
        let cut = original.rfind('.').unwrap_or(original.len());
        &original[..cut]
    } else {
        original
    };
    let marker = match variant {
        ExportVariant::Rewritten => "",
        ExportVariant::Dialogue => "-dialogue",
    };
    format!("{}{}.{}", stem, marker, format.extension())
}
