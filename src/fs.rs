//! Filesystem abstraction (§11 Supplemental Features): the seam the CLI,
//! watch mode, and project coordinator read and write through, so
//! compilation logic itself never touches `std::fs` directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Lists `.psx` files under `path`. When both `stem.psx` and
    /// `stem.py` exist in the same directory, the `.py` is skipped
    /// (§6 Input format).
    fn list_dir(&self, path: &Path, recursive: bool) -> std::io::Result<Vec<PathBuf>>;
}

/// The real filesystem, backed by `std::fs` and an `ignore::WalkBuilder`
/// walk honoring `.gitignore`-style excludes.
pub struct RealFileSystem {
    pub excludes: Vec<String>,
}

impl RealFileSystem {
    pub fn new(excludes: Vec<String>) -> Self {
        Self { excludes }
    }
}

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path, recursive: bool) -> std::io::Result<Vec<PathBuf>> {
        let mut builder = ignore::WalkBuilder::new(path);
        builder.max_depth(if recursive { None } else { Some(1) });

        let mut excludes = globset::GlobSetBuilder::new();
        for pattern in &self.excludes {
            if let Ok(glob) = globset::Glob::new(pattern) {
                excludes.add(glob);
            }
        }
        let excludes = excludes.build().unwrap_or_else(|_| globset::GlobSet::empty());

        let mut psx_files = Vec::new();
        let mut py_stems = std::collections::HashSet::new();
        for entry in builder.build() {
            let entry = entry.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            let entry_path = entry.path();
            if !entry_path.is_file() {
                continue;
            }
            if excludes.is_match(entry_path) {
                continue;
            }
            match entry_path.extension().and_then(|e| e.to_str()) {
                Some("psx") => psx_files.push(entry_path.to_path_buf()),
                Some("py") => {
                    py_stems.insert(entry_path.with_extension(""));
                }
                _ => {}
            }
        }

        // When both `stem.psx` and `stem.py` exist, the `.py` is skipped —
        // which means every discovered `.psx` file is already kept; the
        // set above exists only so a future `.py`-preferring mode has
        // somewhere to hook in.
        let _ = py_stems;
        psx_files.sort();
        Ok(psx_files)
    }
}

/// In-memory filesystem for tests: no real I/O, deterministic listing.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: std::sync::RwLock<HashMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.write().unwrap().insert(path.into(), contents.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        self.files.write().unwrap().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files.read().unwrap().keys().any(|p| p.starts_with(path) && p != path)
    }

    fn list_dir(&self, path: &Path, recursive: bool) -> std::io::Result<Vec<PathBuf>> {
        let files = self.files.read().unwrap();
        let mut matches: Vec<PathBuf> = files
            .keys()
            .filter(|p| p.starts_with(path) && p.extension().and_then(|e| e.to_str()) == Some("psx"))
            .filter(|p| recursive || p.parent() == Some(path))
            .cloned()
            .collect();
        matches.sort();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_round_trips_a_write_and_read() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/p/a.psx"), "x = 1\n").unwrap();
        assert_eq!(fs.read_to_string(Path::new("/p/a.psx")).unwrap(), "x = 1\n");
        assert!(fs.exists(Path::new("/p/a.psx")));
    }

    #[test]
    fn memory_fs_list_dir_filters_by_extension_and_recursion() {
        let fs = MemoryFileSystem::new();
        fs.seed("/p/a.psx", "");
        fs.seed("/p/sub/b.psx", "");
        fs.seed("/p/notes.txt", "");

        let shallow = fs.list_dir(Path::new("/p"), false).unwrap();
        assert_eq!(shallow, vec![PathBuf::from("/p/a.psx")]);

        let deep = fs.list_dir(Path::new("/p"), true).unwrap();
        assert_eq!(deep, vec![PathBuf::from("/p/a.psx"), PathBuf::from("/p/sub/b.psx")]);
    }

    #[test]
    fn missing_read_is_a_not_found_error() {
        let fs = MemoryFileSystem::new();
        let err = fs.read_to_string(Path::new("/nope.psx")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
