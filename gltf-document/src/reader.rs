use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::DocumentError;
use crate::types::{
    Accessor, Animation, Buffer, BufferView, Camera, Document, Image, Light, Material, Mesh, Node, Sampler, Scene,
    Skin, Texture,
};

const GLB_MAGIC: u32 = 0x46546C67; // "glTF"
const GLB_CHUNK_JSON: u32 = 0x4E4F534A;
const GLB_CHUNK_BIN: u32 = 0x004E4942;

/// The outcome of parsing a `.gltf`/`.glb` payload: the stamped document and,
/// for the binary container, the embedded BIN chunk that backs the URI-less buffer.
pub struct ParsedDocument {
    pub document: Document,
    pub binary: Option<Vec<u8>>,
}

pub struct DocumentReader {}

impl DocumentReader {
    /// Parses either a plain glTF JSON document or a GLB container, stamps the
    /// indexed-array convention onto it and validates the asset version.
    pub fn parse(data: &[u8]) -> Result<ParsedDocument, DocumentError> {
        let (json, binary) = if data.len() >= 4 && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == GLB_MAGIC
        {
            let (json, bin) = Self::split_glb(data)?;
            (json, bin)
        } else {
            (data.to_vec(), None)
        };

        let mut document: Document = serde_json::from_slice(&json)?;

        if !document.asset.version.starts_with("2.") {
            return Err(DocumentError::SchemaViolation {
                reason: format!("unsupported glTF version \"{}\"", document.asset.version),
            });
        }

        Self::stamp_indices(&mut document);
        Ok(ParsedDocument { document, binary })
    }

    /// GLB container: 12 byte header, then (length, type, payload) chunks.
    /// The JSON chunk is mandatory and comes first, BIN is optional.
    fn split_glb(data: &[u8]) -> Result<(Vec<u8>, Option<Vec<u8>>), DocumentError> {
        let mut cursor = Cursor::new(data);
        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != GLB_MAGIC {
            return Err(DocumentError::InvalidMagicValue { magic });
        }

        let version = cursor.read_u32::<LittleEndian>()?;
        if version != 2 {
            return Err(DocumentError::SchemaViolation {
                reason: format!("unsupported GLB container version {}", version),
            });
        }

        let total_length = cursor.read_u32::<LittleEndian>()? as usize;
        if total_length > data.len() {
            return Err(DocumentError::SchemaViolation {
                reason: "GLB header declares more bytes than present".to_string(),
            });
        }

        let mut json = None;
        let mut binary = None;

        while (cursor.position() as usize) + 8 <= total_length {
            let chunk_length = cursor.read_u32::<LittleEndian>()? as usize;
            let chunk_type = cursor.read_u32::<LittleEndian>()?;
            let start = cursor.position() as usize;
            let end = start
                .checked_add(chunk_length)
                .filter(|&end| end <= total_length)
                .ok_or_else(|| DocumentError::SchemaViolation {
                    reason: "GLB chunk exceeds container length".to_string(),
                })?;

            match chunk_type {
                GLB_CHUNK_JSON => json = Some(data[start..end].to_vec()),
                GLB_CHUNK_BIN => binary = Some(data[start..end].to_vec()),
                // Per spec, unknown chunk types are skipped.
                _ => {}
            }
            cursor.set_position(end as u64);
        }

        let json = json.ok_or_else(|| DocumentError::SchemaViolation {
            reason: "GLB container is missing the JSON chunk".to_string(),
        })?;
        Ok((json, binary))
    }

    fn stamp_indices(document: &mut Document) {
        fn stamp<T>(items: &mut [T], set: impl Fn(&mut T, usize)) {
            for (index, item) in items.iter_mut().enumerate() {
                set(item, index);
            }
        }

        stamp(&mut document.scenes, |e, i| e.index = i);
        stamp(&mut document.nodes, |e, i| e.index = i);
        stamp(&mut document.meshes, |e, i| e.index = i);
        stamp(&mut document.accessors, |e, i| e.index = i);
        stamp(&mut document.buffer_views, |e, i| e.index = i);
        stamp(&mut document.buffers, |e, i| e.index = i);
        stamp(&mut document.materials, |e, i| e.index = i);
        stamp(&mut document.textures, |e, i| e.index = i);
        stamp(&mut document.images, |e, i| e.index = i);
        stamp(&mut document.samplers, |e, i| e.index = i);
        stamp(&mut document.skins, |e, i| e.index = i);
        stamp(&mut document.cameras, |e, i| e.index = i);
        stamp(&mut document.animations, |e, i| e.index = i);
        if let Some(lights) = document.extensions.khr_lights_punctual.as_mut() {
            stamp(&mut lights.lights, |e, i| e.index = i);
        }
    }
}

fn lookup<'a, T>(items: &'a [T], kind: &'static str, index: usize) -> Result<&'a T, DocumentError> {
    items.get(index).ok_or(DocumentError::IndexOutOfBounds {
        kind,
        index,
        len: items.len(),
    })
}

/// Bounds-checked cross-reference resolution. An index outside `[0, len)` is a
/// malformed document, never a silent default.
impl Document {
    pub fn scene(&self, index: usize) -> Result<&Scene, DocumentError> {
        lookup(&self.scenes, "scene", index)
    }

    pub fn node(&self, index: usize) -> Result<&Node, DocumentError> {
        lookup(&self.nodes, "node", index)
    }

    pub fn mesh(&self, index: usize) -> Result<&Mesh, DocumentError> {
        lookup(&self.meshes, "mesh", index)
    }

    pub fn accessor(&self, index: usize) -> Result<&Accessor, DocumentError> {
        lookup(&self.accessors, "accessor", index)
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferView, DocumentError> {
        lookup(&self.buffer_views, "bufferView", index)
    }

    pub fn buffer(&self, index: usize) -> Result<&Buffer, DocumentError> {
        lookup(&self.buffers, "buffer", index)
    }

    pub fn material(&self, index: usize) -> Result<&Material, DocumentError> {
        lookup(&self.materials, "material", index)
    }

    pub fn texture(&self, index: usize) -> Result<&Texture, DocumentError> {
        lookup(&self.textures, "texture", index)
    }

    pub fn image(&self, index: usize) -> Result<&Image, DocumentError> {
        lookup(&self.images, "image", index)
    }

    pub fn sampler(&self, index: usize) -> Result<&Sampler, DocumentError> {
        lookup(&self.samplers, "sampler", index)
    }

    pub fn skin(&self, index: usize) -> Result<&Skin, DocumentError> {
        lookup(&self.skins, "skin", index)
    }

    pub fn camera(&self, index: usize) -> Result<&Camera, DocumentError> {
        lookup(&self.cameras, "camera", index)
    }

    pub fn animation(&self, index: usize) -> Result<&Animation, DocumentError> {
        lookup(&self.animations, "animation", index)
    }

    pub fn light(&self, index: usize) -> Result<&Light, DocumentError> {
        let lights = self
            .extensions
            .khr_lights_punctual
            .as_ref()
            .map(|ext| ext.lights.as_slice())
            .unwrap_or(&[]);
        lookup(lights, "light", index)
    }
}
