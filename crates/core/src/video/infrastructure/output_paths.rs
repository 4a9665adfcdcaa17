use std::path::{Path, PathBuf};

/// First `dir/{prefix}{N}.{extension}` that does not exist yet, counting
/// from 1.
pub fn next_free_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let mut n: u64 = 1;
    loop {
        let candidate = dir.join(format!("{prefix}{n}.{extension}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
