//! In-memory sprite source for unit tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::rewrite::svg::SpriteSource;

pub struct MapSource {
    files: HashMap<PathBuf, String>,
    reads: AtomicUsize,
}

impl MapSource {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (PathBuf::from(p), c.to_string()))
                .collect(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of `read_sprite` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SpriteSource for MapSource {
    fn read_sprite(&self, path: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such sprite"))
    }
}
