//! Directory scanning for candidate media files.

use std::path::{Path, PathBuf};

use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Default video extension set. A configuration default, not hardwired:
/// [`list_media_files`] takes whatever set the caller provides.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Default audio extension set.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// List files in `dir` whose extension (case-insensitive) is in
/// `extensions`, sorted by file name.
pub fn list_media_files(dir: &Path, extensions: &[&str]) -> VidstitchResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(VidstitchError::config(format!(
            "directory '{}' does not exist",
            dir.display()
        )));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        VidstitchError::config(format!("failed to read directory '{}': {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            VidstitchError::config(format!("failed to read directory '{}': {e}", dir.display()))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)));
        if matches {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn lists_only_matching_extensions_sorted_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "b.mp4");
        touch(tmp.path(), "a.MOV");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "song.mp3");

        let videos = list_media_files(tmp.path(), VIDEO_EXTENSIONS).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4"]);

        let audio = list_media_files(tmp.path(), AUDIO_EXTENSIONS).unwrap();
        assert_eq!(audio.len(), 1);
    }

    #[test]
    fn missing_directory_is_a_config_error() {
        let err = list_media_files(Path::new("/definitely/not/here"), VIDEO_EXTENSIONS).unwrap_err();
        assert!(matches!(err, VidstitchError::Config(_)));
    }

    #[test]
    fn subdirectories_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("nested.mp4")).unwrap();
        touch(tmp.path(), "real.mp4");
        let videos = list_media_files(tmp.path(), VIDEO_EXTENSIONS).unwrap();
        assert_eq!(videos.len(), 1);
    }
}
