use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use gltf_document::types::Document;
use log::debug;

use crate::backend::RenderBackend;
use crate::common::types::{ImageData, VertexAttributeKind};
use crate::error::LoadError;
use crate::graph::nodes::{HandleRegistry, MaterialKey, MeshKey, PrimitiveRef, SceneNode, TextureKey};
use crate::graph::resolver::Resolver;
use crate::io::common::loader::{ByteSource, decode_data_uri};
use gltf_document::reader::ParsedDocument;

/// One load of one document against one backend. The session owns every
/// resolution cache, so sharing stops at its boundary: two sessions loading
/// the same file construct their resources independently.
///
/// All methods take `&self` (or `Arc<Self>` where branches are spawned), so
/// concurrent resolution of independent subtrees is the normal mode of
/// operation, not an afterthought.
pub struct LoaderSession<B: RenderBackend, S: ByteSource> {
    pub(crate) document: Arc<Document>,
    /// The GLB BIN chunk, backing the URI-less buffer.
    pub(crate) binary: Option<Arc<Vec<u8>>>,
    pub(crate) backend: Arc<B>,
    pub(crate) source: Arc<S>,
    /// Parent index per node, validated at construction: at most one parent,
    /// no cycles.
    pub(crate) parent_of: Vec<Option<usize>>,
    cancelled: AtomicBool,
    pub(crate) registry: Arc<HandleRegistry<B>>,
    /// Slot per document node, filled during the scene walk.
    pub(crate) scene_nodes: Vec<ArcSwapOption<SceneNode<B>>>,

    pub(crate) buffer_cache: Resolver<usize, Arc<Vec<u8>>>,
    pub(crate) view_cache: Resolver<usize, Arc<Vec<u8>>>,
    pub(crate) vertex_buffer_cache: Resolver<(usize, VertexAttributeKind), B::VertexBufferHandle>,
    pub(crate) image_cache: Resolver<usize, ImageData>,
    pub(crate) texture_cache: Resolver<TextureKey, B::TextureHandle>,
    pub(crate) material_cache: Resolver<MaterialKey, B::MaterialHandle>,
    /// Filled alongside material resolution; every requesting primitive is
    /// recorded, not just the one that won the construction race.
    pub(crate) material_consumers: DashMap<MaterialKey, Vec<PrimitiveRef>>,
    pub(crate) mesh_cache: Resolver<MeshKey, B::MeshHandle>,
    pub(crate) skeleton_cache: Resolver<usize, B::SkeletonHandle>,
    pub(crate) camera_cache: Resolver<usize, B::CameraHandle>,
    pub(crate) light_cache: Resolver<usize, B::LightHandle>,
    pub(crate) animation_cache: Resolver<usize, Option<B::AnimationGroupHandle>>,
}

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// Extensions we resolve; anything else a document *requires* is a
    /// structural gap.
    const SUPPORTED_EXTENSIONS: &'static [&'static str] = &["KHR_lights_punctual"];

    /// Validates the node graph up front (tree-shaped or it is not loadable)
    /// and sets up the empty caches. Nothing is fetched or constructed yet.
    pub fn new(parsed: ParsedDocument, backend: Arc<B>, source: Arc<S>) -> Result<Arc<Self>, LoadError> {
        let document = Arc::new(parsed.document);
        for extension in &document.extensions_required {
            if !Self::SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
                return Err(LoadError::Unsupported {
                    feature: format!("required extension {}", extension),
                    structural: true,
                });
            }
        }
        let parent_of = Self::build_parent_table(&document)?;
        let scene_nodes = (0..document.nodes.len()).map(|_| ArcSwapOption::empty()).collect();

        debug!(
            "Loader session over {} nodes, {} meshes, {} materials, {} animations",
            document.nodes.len(),
            document.meshes.len(),
            document.materials.len(),
            document.animations.len()
        );

        Ok(Arc::new(Self {
            document,
            binary: parsed.binary.map(Arc::new),
            backend,
            source,
            parent_of,
            cancelled: AtomicBool::new(false),
            registry: Arc::new(HandleRegistry::new()),
            scene_nodes,
            buffer_cache: Resolver::new(),
            view_cache: Resolver::new(),
            vertex_buffer_cache: Resolver::new(),
            image_cache: Resolver::new(),
            texture_cache: Resolver::new(),
            material_cache: Resolver::new(),
            material_consumers: DashMap::new(),
            mesh_cache: Resolver::new(),
            skeleton_cache: Resolver::new(),
            camera_cache: Resolver::new(),
            light_cache: Resolver::new(),
            animation_cache: Resolver::new(),
        }))
    }

    /// Requests cancellation. In-flight branches notice at their next
    /// checkpoint; already constructed resources stay registered, so the
    /// caller decides between reuse and disposal.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint before every fetch and every backend construction.
    pub(crate) fn ensure_active(&self) -> Result<(), LoadError> {
        if self.is_cancelled() {
            return Err(LoadError::Cancelled);
        }
        Ok(())
    }

    /// Resolves a URI to bytes: embedded `data:` payloads decode in-process,
    /// everything else goes through the byte source.
    pub(crate) fn fetch_uri(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let result = match decode_data_uri(uri) {
            Some(decoded) => decoded,
            None => self.source.load_uri(uri),
        };
        result.map_err(|source| LoadError::Fetch {
            uri: uri.to_string(),
            source,
        })
    }

    pub fn registry(&self) -> &Arc<HandleRegistry<B>> {
        &self.registry
    }
}
