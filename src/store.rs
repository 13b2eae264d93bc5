//! File-backed persistence for script records.
//!
//! One JSON file per script under `{data}/scripts/{id}.json`. Every stage
//! loads the record, writes its own field, and saves it back; the store
//! offers no cross-field transactions because last-writer-wins per field is
//! all the pipeline needs.

use crate::error::{PipelineError, Result};
use crate::script::Script;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    pub fn new(data_folder: &str) -> Self {
        Self {
            root: PathBuf::from(data_folder),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join("scripts").join(format!("{}.json", id))
    }

    /// Directory holding the per-line clips for one script.
    pub fn clip_dir(&self, id: &str) -> PathBuf {
        self.root.join("clips").join(id)
    }

    /// Final merged audio location, relative to the data root.
    pub fn audio_rel_path(id: &str) -> String {
        format!("audio/story-{}.mp3", id)
    }

    pub fn save(&self, script: &Script) -> Result<()> {
        let path = self.record_path(&script.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(script)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Script> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(PipelineError::RecordNotFound(id.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ExportFormat, ScriptState};

    #[test]
    fn test_save_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path().to_str().unwrap());

        let mut script = Script::new("story.pdf", ExportFormat::Pdf, "Once.".into());
        script.advance(ScriptState::Extracted);
        store.save(&script)?;

        let loaded = store.load(&script.id)?;
        assert_eq!(loaded.file_name, "story.pdf");
        assert_eq!(loaded.state, ScriptState::Extracted);
        assert_eq!(loaded.raw_text, "Once.");
        Ok(())
    }

    #[test]
    fn test_unknown_id_is_record_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path().to_str().unwrap());

        let err = store.load("nope").unwrap_err();
        assert_eq!(err.kind(), "RecordNotFound");
    }

    #[test]
    fn test_field_overwrite_is_last_writer_wins() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptStore::new(dir.path().to_str().unwrap());

        let script = Script::new("story.docx", ExportFormat::Docx, "raw".into());
        store.save(&script)?;

        let mut first = store.load(&script.id)?;
        first.rewritten_text = "first pass".into();
        store.save(&first)?;

        let mut second = store.load(&script.id)?;
        second.rewritten_text = "second pass".into();
        store.save(&second)?;

        assert_eq!(store.load(&script.id)?.rewritten_text, "second pass");
        Ok(())
    }
}
