//! Watch mode (§11 Supplemental Features, §6 Persisted state): a
//! `notify` watcher feeding a debounce buffer that collapses bursts of
//! filesystem events into one recompilation, plus the in-memory
//! "parsed module cache" keyed by absolute path and last-modified time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::{Duration, SystemTime};

use notify::{RecursiveMode, Watcher as NotifyWatcher};
use psxc_core::ast::Module;

/// Caches a file's last-parsed `Module` against the mtime it was parsed
/// at, so an unchanged file is never reparsed on a debounce tick that
/// didn't touch it.
#[derive(Default)]
pub struct ModuleCache {
    entries: HashMap<PathBuf, (SystemTime, Module)>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path, mtime: SystemTime) -> Option<&Module> {
        self.entries.get(path).filter(|(cached, _)| *cached == mtime).map(|(_, module)| module)
    }

    pub fn insert(&mut self, path: PathBuf, mtime: SystemTime, module: Module) {
        self.entries.insert(path, (mtime, module));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Enumerates every `.psx` file under `root` for the initial full
/// compile watch mode runs before it starts listening for changes. Uses
/// `walkdir` directly rather than `ignore`'s exclude-aware walk (that
/// one lives behind the `FileSystem` trait in `fs.rs`) since the
/// pre-watch seed just needs a flat recursive listing.
pub fn initial_files(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("psx"))
        .collect()
}

/// Watches `root` for filesystem events and yields batches of changed
/// paths, collapsing everything within `debounce` of the first event in
/// a burst into one batch.
pub struct Watcher {
    _inner: notify::RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
    debounce: Duration,
}

impl Watcher {
    pub fn new(root: &Path, debounce_ms: u64) -> notify::Result<Self> {
        let (tx, rx) = channel();
        let mut inner = notify::recommended_watcher(tx)?;
        inner.watch(root, RecursiveMode::Recursive)?;
        Ok(Self {
            _inner: inner,
            events: rx,
            debounce: Duration::from_millis(debounce_ms),
        })
    }

    /// Blocks for the next burst of changes and returns the distinct set
    /// of `.psx` paths touched, or `None` if the channel closed.
    pub fn next_batch(&self) -> Option<Vec<PathBuf>> {
        let first = self.events.recv().ok()?;
        let mut paths = collect_psx_paths(first);

        loop {
            match self.events.recv_timeout(self.debounce) {
                Ok(event) => paths.extend(collect_psx_paths(event)),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        paths.sort();
        paths.dedup();
        Some(paths)
    }
}

fn collect_psx_paths(event: notify::Result<notify::Event>) -> Vec<PathBuf> {
    match event {
        Ok(event) => event
            .paths
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("psx"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_cache_misses_on_a_different_mtime() {
        let mut cache = ModuleCache::new();
        let path = PathBuf::from("/p/a.psx");
        let t0 = SystemTime::UNIX_EPOCH;
        let t1 = t0 + Duration::from_secs(1);
        let (module, _) = psxc_core::parser::parse(&psxc_core::lexer::scan("x = 1\n").tokens);
        cache.insert(path.clone(), t0, module);
        assert!(cache.get(&path, t0).is_some());
        assert!(cache.get(&path, t1).is_none());
    }
}
