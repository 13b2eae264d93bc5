//! Audio assembly: ordered clips -> one merged artifact.
//!
//! Straight byte-stream concatenation, suitable for MP3 and other framed
//! stream formats. The clip index, never completion order, decides the
//! final sequence.

use crate::error::{PipelineError, Result};
use crate::tts::SynthesizedClip;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Concatenate the clips in ascending index order into `output_path`.
///
/// The merge happens in a sibling temp file which is atomically renamed
/// into place on success, so a failed run never leaves a partial artifact
/// at the final path.
pub fn assemble(clips: &[SynthesizedClip], output_path: &Path) -> Result<()> {
    if clips.is_empty() {
        return Err(PipelineError::AssemblyFailed("no clips to merge".into()));
    }

    let mut ordered: Vec<&SynthesizedClip> = clips.iter().collect();
    ordered.sort_by_key(|clip| clip.index);

    let tmp_path = output_path.with_extension("mp3.tmp");
    let result = (|| -> Result<()> {
        let mut out = File::create(&tmp_path)?;
        for clip in &ordered {
            let data = std::fs::read(&clip.path).map_err(|e| {
                PipelineError::AssemblyFailed(format!("unreadable clip {:?}: {}", clip.path, e))
            })?;
            out.write_all(&data)
                .map_err(|e| PipelineError::AssemblyFailed(format!("merge write failed: {}", e)))?;
        }
        out.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            std::fs::rename(&tmp_path, output_path)?;
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn clip(dir: &Path, index: usize, data: &[u8]) -> SynthesizedClip {
        let path = dir.join(format!("line-{}.mp3", index));
        std::fs::write(&path, data).unwrap();
        SynthesizedClip {
            index,
            speaker: "Narrator".to_string(),
            path,
        }
    }

    #[test]
    fn test_assemble_orders_by_index_not_input_order() {
        let dir = tempfile::tempdir().unwrap();
        // Deliberately out of order, as concurrent completion would produce.
        let clips = vec![
            clip(dir.path(), 2, b"C"),
            clip(dir.path(), 0, b"A"),
            clip(dir.path(), 1, b"B"),
        ];
        let out = dir.path().join("story.mp3");

        assemble(&clips, &out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"ABC");
    }

    #[test]
    fn test_missing_clip_fails_without_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut clips = vec![clip(dir.path(), 0, b"A")];
        clips.push(SynthesizedClip {
            index: 1,
            speaker: "Narrator".to_string(),
            path: PathBuf::from("/nonexistent/line-1.mp3"),
        });
        let out = dir.path().join("story.mp3");

        let err = assemble(&clips, &out).unwrap_err();
        assert_eq!(err.kind(), "AssemblyFailed");
        assert!(!out.exists());
        assert!(!out.with_extension("mp3.tmp").exists());
    }

    #[test]
    fn test_empty_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble(&[], &dir.path().join("story.mp3")).unwrap_err();
        assert_eq!(err.kind(), "AssemblyFailed");
    }
}
