use std::path::{Path, PathBuf};

use log::trace;

use crate::io::common::loader::ByteSource;

/// Serves URIs relative to the directory a document was opened from, the way
/// `.gltf` files reference their sidecar `.bin` and image files.
pub struct FileSource {
    base_dir: PathBuf,
}

impl FileSource {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// The minimal percent-decoding exporters actually produce (spaces, mostly).
    fn unescape(uri: &str) -> String {
        let mut out = String::with_capacity(uri.len());
        let mut chars = uri.chars();
        while let Some(c) = chars.next() {
            if c == '%' {
                let hex: String = chars.by_ref().take(2).collect();
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    out.push(byte as char);
                    continue;
                }
                out.push(c);
                out.push_str(&hex);
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl ByteSource for FileSource {
    fn load_uri(&self, uri: &str) -> Result<Vec<u8>, std::io::Error> {
        let path = self.base_dir.join(Self::unescape(uri));
        trace!("Loading {} from {}", uri, path.display());
        std::fs::read(path)
    }
}
