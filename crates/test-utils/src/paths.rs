//! Temporary directories and tile tree inspection.

use std::path::{Path, PathBuf};

/// Writes `bytes` into a new file inside `dir` and returns its path.
pub fn write_test_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("Failed to write test file");
    path
}

/// Creates a temporary directory, removed when the `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("pyramid_")
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Lists every file of a `{z}/{x}/{y}.{ext}` tree as sorted relative
/// `"z/x/y.ext"` strings.
pub fn list_tile_files(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    collect_files(root, root, &mut found);
    found.sort();
    found
}

fn collect_files(root: &Path, dir: &Path, found: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, found);
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            found.push(parts.join("/"));
        }
    }
}
