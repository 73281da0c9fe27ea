use std::collections::HashMap;

use crate::io::common::loader::ByteSource;

/// In-memory byte source: named blobs, no filesystem. Used by tests and by
/// embedders that carry their sub-resources along with the document.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(uri.into(), bytes);
    }

    pub fn with(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

impl ByteSource for MemorySource {
    fn load_uri(&self, uri: &str) -> Result<Vec<u8>, std::io::Error> {
        self.files
            .get(uri)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, format!("no blob named \"{}\"", uri)))
    }
}
