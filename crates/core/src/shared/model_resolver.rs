use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::{APP_DIR_NAME, CASCADE_DIR_NAME, DEFAULT_CASCADE_NAME};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("cascade file {name} not found (searched: {})", format_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("could not determine data directory")]
    NoDataDir,
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a cascade definition file by name, checking known locations.
///
/// Resolution order:
/// 1. Caller-supplied directories, in order (e.g. the working directory's
///    `haarcascades/`)
/// 2. Platform data directory (`<data_dir>/facetrack/haarcascades/`)
///
/// Nothing is downloaded; a missing file is reported with every path tried.
pub fn resolve(name: &str, search_dirs: &[&Path]) -> Result<PathBuf, ModelResolveError> {
    let mut searched = Vec::with_capacity(search_dirs.len() + 1);

    for dir in search_dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    if let Ok(dir) = cascade_data_dir() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        searched,
    })
}

/// Looks for the default frontal-face cascade next to the working directory
/// and in the platform data directory.
pub fn resolve_default_cascade() -> Result<PathBuf, ModelResolveError> {
    let local = Path::new(CASCADE_DIR_NAME);
    resolve(DEFAULT_CASCADE_NAME, &[local])
}

/// Platform-specific directory holding installed cascade files.
///
/// - macOS: `~/Library/Application Support/facetrack/haarcascades/`
/// - Linux: `$XDG_DATA_HOME/facetrack/haarcascades/` or `~/.local/share/facetrack/haarcascades/`
/// - Windows: `%APPDATA%/facetrack/haarcascades/`
pub fn cascade_data_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME).join(CASCADE_DIR_NAME))
        .ok_or(ModelResolveError::NoDataDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_finds_file_in_search_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("face.xml");
        fs::write(&path, b"<opencv_storage/>").unwrap();

        let resolved = resolve("face.xml", &[tmp.path()]).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn test_resolve_prefers_earlier_dir() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("face.xml"), b"a").unwrap();
        fs::write(second.path().join("face.xml"), b"b").unwrap();

        let resolved = resolve("face.xml", &[first.path(), second.path()]).unwrap();
        assert_eq!(resolved, first.path().join("face.xml"));
    }

    #[test]
    fn test_resolve_missing_lists_searched_paths() {
        let tmp = TempDir::new().unwrap();
        let err = resolve("does-not-exist-4711.xml", &[tmp.path()]).unwrap_err();
        match err {
            ModelResolveError::NotFound { name, searched } => {
                assert_eq!(name, "does-not-exist-4711.xml");
                assert_eq!(searched[0], tmp.path().join("does-not-exist-4711.xml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_ignores_directories_with_model_name() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("face.xml")).unwrap();
        assert!(resolve("face.xml", &[tmp.path()]).is_err());
    }

    #[test]
    fn test_cascade_data_dir_contains_app_name() {
        if let Ok(dir) = cascade_data_dir() {
            assert!(dir.to_string_lossy().contains(APP_DIR_NAME));
            assert!(dir.ends_with(CASCADE_DIR_NAME));
        }
    }
}
