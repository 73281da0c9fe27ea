#![allow(dead_code)] // not every test binary uses every helper

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use glam::Mat4;
use gltf_document::reader::{DocumentReader, ParsedDocument};
use holoscene::backend::{GpuHandle, MaterialParams, PrimitiveAssembly, RenderBackend};
use holoscene::common::types::{
    AnimationChannelData, CameraParams, DecodedAccessor, ImageData, JointDesc, LightParams, MaterialVariant,
    SamplerSettings, VertexAttributeKind,
};
use holoscene::io::common::loader::ByteSource;
use holoscene::io::memory::loader::MemorySource;
use holoscene::loader::session::LoaderSession;

/// A handle that remembers how often it was disposed. Equality is identity
/// (id and kind); the disposal counter is shared across clones.
#[derive(Debug, Clone)]
pub struct MockHandle {
    pub id: u64,
    pub kind: &'static str,
    disposals: Arc<AtomicUsize>,
}

impl MockHandle {
    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl PartialEq for MockHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind
    }
}

impl GpuHandle for MockHandle {
    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every construction, so tests can assert what the resolution
/// protocol actually asked the engine for.
#[derive(Default)]
pub struct MockBackend {
    next_id: AtomicU64,
    handles: Mutex<Vec<MockHandle>>,
    pub vertex_data: Mutex<Vec<(VertexAttributeKind, DecodedAccessor)>>,
    /// (non_color_data, sampler) per constructed texture.
    pub texture_calls: Mutex<Vec<(bool, SamplerSettings)>>,
    pub material_variants: Mutex<Vec<MaterialVariant>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, kind: &'static str) -> MockHandle {
        let handle = MockHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
            disposals: Arc::new(AtomicUsize::new(0)),
        };
        self.handles.lock().unwrap().push(handle.clone());
        handle
    }

    pub fn handles(&self) -> Vec<MockHandle> {
        self.handles.lock().unwrap().clone()
    }

    pub fn handles_of(&self, kind: &'static str) -> Vec<MockHandle> {
        self.handles().into_iter().filter(|h| h.kind == kind).collect()
    }

    pub fn created_of(&self, kind: &'static str) -> usize {
        self.handles_of(kind).len()
    }
}

impl RenderBackend for MockBackend {
    type VertexBufferHandle = MockHandle;
    type TextureHandle = MockHandle;
    type MaterialHandle = MockHandle;
    type MeshHandle = MockHandle;
    type SkeletonHandle = MockHandle;
    type AnimationGroupHandle = MockHandle;
    type CameraHandle = MockHandle;
    type LightHandle = MockHandle;

    fn create_vertex_buffer(
        &self,
        data: &DecodedAccessor,
        kind: VertexAttributeKind,
    ) -> Result<MockHandle, anyhow::Error> {
        self.vertex_data.lock().unwrap().push((kind, data.clone()));
        Ok(self.next("vertex buffer"))
    }

    fn create_texture(
        &self,
        _image: &ImageData,
        sampler: &SamplerSettings,
        non_color_data: bool,
    ) -> Result<MockHandle, anyhow::Error> {
        self.texture_calls.lock().unwrap().push((non_color_data, *sampler));
        Ok(self.next("texture"))
    }

    fn create_material(
        &self,
        _params: &MaterialParams<MockHandle>,
        variant: MaterialVariant,
    ) -> Result<MockHandle, anyhow::Error> {
        self.material_variants.lock().unwrap().push(variant);
        Ok(self.next("material"))
    }

    fn create_mesh(
        &self,
        _name: Option<&str>,
        _primitives: &[PrimitiveAssembly<Self>],
        _skeleton: Option<&MockHandle>,
    ) -> Result<MockHandle, anyhow::Error> {
        Ok(self.next("mesh"))
    }

    fn create_skeleton(
        &self,
        _name: Option<&str>,
        _joints: &[JointDesc],
        _inverse_bind_matrices: &[Mat4],
    ) -> Result<MockHandle, anyhow::Error> {
        Ok(self.next("skeleton"))
    }

    fn create_animation_group(
        &self,
        _name: Option<&str>,
        _channels: &[AnimationChannelData],
    ) -> Result<MockHandle, anyhow::Error> {
        Ok(self.next("animation group"))
    }

    fn create_camera(&self, _params: &CameraParams) -> Result<MockHandle, anyhow::Error> {
        Ok(self.next("camera"))
    }

    fn create_light(&self, _params: &LightParams) -> Result<MockHandle, anyhow::Error> {
        Ok(self.next("light"))
    }
}

/// Wraps the recording backend so vertex buffer constructions take real
/// time: streams with `fail_elements` elements fail after a short delay,
/// every other stream succeeds after a longer one. Lets a test overlap an
/// abort with a construction that is still in flight.
pub struct StallingBackend {
    pub inner: MockBackend,
    pub fail_elements: usize,
}

impl RenderBackend for StallingBackend {
    type VertexBufferHandle = MockHandle;
    type TextureHandle = MockHandle;
    type MaterialHandle = MockHandle;
    type MeshHandle = MockHandle;
    type SkeletonHandle = MockHandle;
    type AnimationGroupHandle = MockHandle;
    type CameraHandle = MockHandle;
    type LightHandle = MockHandle;

    fn create_vertex_buffer(
        &self,
        data: &DecodedAccessor,
        kind: VertexAttributeKind,
    ) -> Result<MockHandle, anyhow::Error> {
        if data.element_count() == self.fail_elements {
            std::thread::sleep(std::time::Duration::from_millis(150));
            anyhow::bail!("synthetic construction failure");
        }
        std::thread::sleep(std::time::Duration::from_millis(300));
        self.inner.create_vertex_buffer(data, kind)
    }

    fn create_texture(
        &self,
        image: &ImageData,
        sampler: &SamplerSettings,
        non_color_data: bool,
    ) -> Result<MockHandle, anyhow::Error> {
        self.inner.create_texture(image, sampler, non_color_data)
    }

    fn create_material(
        &self,
        params: &MaterialParams<MockHandle>,
        variant: MaterialVariant,
    ) -> Result<MockHandle, anyhow::Error> {
        self.inner.create_material(params, variant)
    }

    fn create_mesh(
        &self,
        name: Option<&str>,
        primitives: &[PrimitiveAssembly<Self>],
        skeleton: Option<&MockHandle>,
    ) -> Result<MockHandle, anyhow::Error> {
        // The assemblies only carry handles, which is all the recorder needs.
        let _ = primitives;
        self.inner.create_mesh(name, &[], skeleton)
    }

    fn create_skeleton(
        &self,
        name: Option<&str>,
        joints: &[JointDesc],
        inverse_bind_matrices: &[Mat4],
    ) -> Result<MockHandle, anyhow::Error> {
        self.inner.create_skeleton(name, joints, inverse_bind_matrices)
    }

    fn create_animation_group(
        &self,
        name: Option<&str>,
        channels: &[AnimationChannelData],
    ) -> Result<MockHandle, anyhow::Error> {
        self.inner.create_animation_group(name, channels)
    }

    fn create_camera(&self, params: &CameraParams) -> Result<MockHandle, anyhow::Error> {
        self.inner.create_camera(params)
    }

    fn create_light(&self, params: &LightParams) -> Result<MockHandle, anyhow::Error> {
        self.inner.create_light(params)
    }
}

/// Wraps the in-memory source and counts how often each URI was asked for.
#[derive(Default)]
pub struct CountingSource {
    inner: MemorySource,
    counts: Mutex<HashMap<String, usize>>,
}

impl CountingSource {
    pub fn with(mut self, uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.inner.insert(uri, bytes);
        self
    }

    pub fn fetches(&self, uri: &str) -> usize {
        self.counts.lock().unwrap().get(uri).copied().unwrap_or(0)
    }
}

impl ByteSource for CountingSource {
    fn load_uri(&self, uri: &str) -> Result<Vec<u8>, std::io::Error> {
        *self.counts.lock().unwrap().entry(uri.to_string()).or_insert(0) += 1;
        self.inner.load_uri(uri)
    }
}

pub fn parse(json: &serde_json::Value) -> ParsedDocument {
    DocumentReader::parse(&serde_json::to_vec(json).unwrap()).unwrap()
}

#[allow(clippy::type_complexity)]
pub fn session(
    json: &serde_json::Value,
    source: CountingSource,
) -> (
    Arc<LoaderSession<MockBackend, CountingSource>>,
    Arc<MockBackend>,
    Arc<CountingSource>,
) {
    let backend = Arc::new(MockBackend::new());
    let source = Arc::new(source);
    let session = LoaderSession::new(parse(json), Arc::clone(&backend), Arc::clone(&source)).unwrap();
    (session, backend, source)
}

pub fn float_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn u16_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Packs a JSON document and a BIN payload into a GLB container, chunks
/// padded to four bytes as the container format requires.
pub fn build_glb(json: &serde_json::Value, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = serde_json::to_vec(json).unwrap();
    while json_chunk.len() % 4 != 0 {
        json_chunk.push(b' ');
    }
    let mut bin_chunk = bin.to_vec();
    while bin_chunk.len() % 4 != 0 {
        bin_chunk.push(0);
    }

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend(0x46546C67u32.to_le_bytes()); // "glTF"
    out.extend(2u32.to_le_bytes());
    out.extend((total as u32).to_le_bytes());
    out.extend((json_chunk.len() as u32).to_le_bytes());
    out.extend(0x4E4F534Au32.to_le_bytes()); // "JSON"
    out.extend(json_chunk);
    out.extend((bin_chunk.len() as u32).to_le_bytes());
    out.extend(0x004E4942u32.to_le_bytes()); // "BIN"
    out.extend(bin_chunk);
    out
}
