use crate::span::FileId;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A compilation unit registered by its stable path.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    pub source: Option<Arc<str>>,
    line_starts: Arc<Vec<usize>>,
}

impl SourceFile {
    pub fn line_col(&self, offset: u32) -> (usize, usize) {
        let offset = offset as usize;
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts.get(idx).copied().unwrap_or(0);
        (idx + 1, offset.saturating_sub(line_start) + 1)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        let source = self.source.as_deref()?;
        if line == 0 {
            return None;
        }
        let start = *self.line_starts.get(line - 1)?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(source.len());
        source.get(start..end).map(|s| s.trim_end_matches('\n'))
    }
}

/// Path-keyed registry of unit files. Unit paths map to one id for the process lifetime.
#[derive(Debug)]
pub struct SourceMap {
    files: RwLock<HashMap<FileId, SourceFile>>,
    paths: RwLock<HashMap<String, FileId>>,
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceMap {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            paths: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `path` once; later calls return the same id and keep the first source text.
    pub fn register(&self, path: &str, source: Option<&str>) -> FileId {
        if let Some(id) = self.file_id(path) {
            return id;
        }
        let Ok(mut paths) = self.paths.write() else {
            return 0;
        };
        if let Some(id) = paths.get(path) {
            return *id;
        }
        // id 0 is reserved for `Span::null()`
        let id = GLOBAL_FILE_ID.fetch_add(1, Ordering::Relaxed);
        let file = SourceFile {
            id,
            path: path.to_string(),
            source: source.map(Arc::from),
            line_starts: Arc::new(source.map(compute_line_starts).unwrap_or_else(|| vec![0])),
        };
        if let Ok(mut files) = self.files.write() {
            files.insert(id, file);
        }
        paths.insert(path.to_string(), id);
        id
    }

    pub fn file(&self, id: FileId) -> Option<SourceFile> {
        self.files
            .read()
            .ok()
            .and_then(|files| files.get(&id).cloned())
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.paths
            .read()
            .ok()
            .and_then(|paths| paths.get(path).copied())
    }

    pub fn path(&self, id: FileId) -> Option<String> {
        self.file(id).map(|file| file.path)
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

static GLOBAL_SOURCE_MAP: Lazy<Arc<SourceMap>> = Lazy::new(|| Arc::new(SourceMap::new()));
static GLOBAL_FILE_ID: AtomicU64 = AtomicU64::new(1);

pub fn source_map() -> Arc<SourceMap> {
    GLOBAL_SOURCE_MAP.clone()
}

pub fn file_id_for(path: &str) -> FileId {
    source_map().register(path, None)
}
