use std::fs;
use std::path::{Path, PathBuf};

use super::error::SplitError;

const AUDIO_EXTENSION: &str = "mp3";

/// One source file of the audiobook.
///
/// `ordinal` is the position in the concatenated timeline, which is the
/// lexicographic order of the file names.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub path: PathBuf,
    pub ordinal: usize,
    pub duration_secs: f64,
}

/// List the MP3 files of `folder` in concatenation order.
///
/// Hidden files are skipped; partial outputs of an interrupted run are
/// written under a leading dot and must never be picked up as sources.
pub fn discover_inputs(folder: &Path) -> Result<Vec<PathBuf>, SplitError> {
    let entries = fs::read_dir(folder).map_err(|source| SplitError::InputDiscovery {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SplitError::InputDiscovery {
            path: folder.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if is_eligible(&path) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(SplitError::NoInputFiles(folder.to_path_buf()));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn is_eligible(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_EXTENSION))
}

pub fn total_duration(files: &[InputFile]) -> f64 {
    files.iter().map(|f| f.duration_secs).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"audio").unwrap();
    }

    #[test]
    fn sorts_by_file_name_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b-part.mp3");
        touch(dir.path(), "a-part.MP3");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), ".01_Intro.partial.mp3");
        fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let files = discover_inputs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-part.MP3", "b-part.mp3"]);
    }

    #[test]
    fn lexicographic_order_is_not_numeric() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "part10.mp3");
        touch(dir.path(), "part2.mp3");

        let files = discover_inputs(dir.path()).unwrap();
        assert!(files[0].ends_with("part10.mp3"));
        assert!(files[1].ends_with("part2.mp3"));
    }

    #[test]
    fn empty_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt");
        let err = discover_inputs(dir.path()).unwrap_err();
        assert!(matches!(err, SplitError::NoInputFiles(_)));
    }

    #[test]
    fn missing_folder_is_a_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_inputs(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, SplitError::InputDiscovery { .. }));
    }

    #[test]
    fn total_duration_sums_all_files() {
        let files = vec![
            InputFile {
                path: PathBuf::from("a.mp3"),
                ordinal: 0,
                duration_secs: 600.0,
            },
            InputFile {
                path: PathBuf::from("b.mp3"),
                ordinal: 1,
                duration_secs: 612.5,
            },
        ];
        assert_eq!(total_duration(&files), 1212.5);
    }
}
