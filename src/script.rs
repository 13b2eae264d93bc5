//! The Script aggregate: one record per uploaded document, mutated
//! additively as it moves through the pipeline.

use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

/// Export format, resolved once from the upload name at creation time and
/// stored on the record so later renames cannot change dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// Pipeline position of a script. Transitions are one-directional;
/// re-running a stage overwrites its output field without reverting the
/// label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScriptState {
    Uploaded,
    Extracted,
    Rewritten,
    DialogueReady,
    AudioReady,
}

/// A character surfaced by the rewrite stage. Advisory only: the dialogue
/// stage references the list as a soft constraint, not a guarantee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub file_name: String,
    pub export_format: ExportFormat,
    pub state: ScriptState,
    pub raw_text: String,
    #[serde(default)]
    pub rewritten_text: String,
    #[serde(default)]
    pub dialogue_text: String,
    #[serde(default)]
    pub final_audio_path: Option<String>,
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl Script {
    pub fn new(file_name: &str, export_format: ExportFormat, raw_text: String) -> Self {
        Self {
            id: new_script_id(),
            file_name: file_name.to_string(),
            export_format,
            state: ScriptState::Uploaded,
            raw_text,
            rewritten_text: String::new(),
            dialogue_text: String::new(),
            final_audio_path: None,
            characters: Vec::new(),
        }
    }

    /// Advance the state label, never backwards.
    pub fn advance(&mut self, to: ScriptState) {
        if to > self.state {
            self.state = to;
        }
    }
}

fn new_script_id() -> String {
    Alphanumeric
        .sample_string(&mut rand::rng(), 16)
        .to_lowercase()
}
