use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use glam::Mat4;

use crate::backend::{GpuHandle, RenderBackend};
use crate::common::types::MaterialVariant;

/// Resolution key for constructed engine textures. The non-color flag is part
/// of the identity: conflicting interpretations of one glTF texture must
/// yield distinct GPU resources.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub index: usize,
    pub non_color_data: bool,
}

/// Resolution key for constructed engine materials: one glTF material index
/// legitimately produces one object per draw-mode variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub index: usize,
    pub variant: MaterialVariant,
}

/// Resolution key for constructed engine meshes. The same glTF mesh bound to
/// two different skins is two engine meshes sharing one skeleton per skin.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub index: usize,
    pub skin: Option<usize>,
}

/// Identifies a consuming primitive in material consumer lists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveRef {
    pub mesh: usize,
    pub primitive: usize,
}

/// A transform node of the loaded scene. Parent is a back-pointer kept as an
/// index lookup; ownership runs strictly through the child arrays. The
/// resolved slots are populated once during the load walk.
pub struct SceneNode<B: RenderBackend> {
    pub index: usize,
    pub name: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub local_transform: Mat4,
    pub world_transform: Mat4,
    pub mesh: ArcSwapOption<MeshInstance<B>>,
    pub camera: ArcSwapOption<B::CameraHandle>,
    pub light: ArcSwapOption<B::LightHandle>,
    /// Skinned nodes get a duplicated root transform so the skeleton can be
    /// re-rooted independently of the mesh node.
    pub skin_root: ArcSwapOption<SkinRoot>,
}

pub struct MeshInstance<B: RenderBackend> {
    pub mesh: B::MeshHandle,
    pub skeleton: Option<B::SkeletonHandle>,
}

pub struct SkinRoot {
    pub name: String,
    pub world_transform: Mat4,
}

/// Everything the backend constructed for one document.
pub enum GpuResource<B: RenderBackend> {
    VertexBuffer(B::VertexBufferHandle),
    Texture(B::TextureHandle),
    Material(B::MaterialHandle),
    Mesh(B::MeshHandle),
    Skeleton(B::SkeletonHandle),
    AnimationGroup(B::AnimationGroupHandle),
    Camera(B::CameraHandle),
    Light(B::LightHandle),
}

impl<B: RenderBackend> GpuResource<B> {
    pub fn kind(&self) -> &'static str {
        match self {
            GpuResource::VertexBuffer(_) => "vertex buffer",
            GpuResource::Texture(_) => "texture",
            GpuResource::Material(_) => "material",
            GpuResource::Mesh(_) => "mesh",
            GpuResource::Skeleton(_) => "skeleton",
            GpuResource::AnimationGroup(_) => "animation group",
            GpuResource::Camera(_) => "camera",
            GpuResource::Light(_) => "light",
        }
    }

    fn dispose(&self) {
        match self {
            GpuResource::VertexBuffer(h) => h.dispose(),
            GpuResource::Texture(h) => h.dispose(),
            GpuResource::Material(h) => h.dispose(),
            GpuResource::Mesh(h) => h.dispose(),
            GpuResource::Skeleton(h) => h.dispose(),
            GpuResource::AnimationGroup(h) => h.dispose(),
            GpuResource::Camera(h) => h.dispose(),
            GpuResource::Light(h) => h.dispose(),
        }
    }
}

struct RegistryRecord<B: RenderBackend> {
    resource: GpuResource<B>,
    externally_owned: bool,
}

/// Records every constructed handle exactly once, at construction time, so
/// both abort cleanup and document disposal release each exactly once.
pub struct HandleRegistry<B: RenderBackend> {
    records: Mutex<Vec<RegistryRecord<B>>>,
}

impl<B: RenderBackend> HandleRegistry<B> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn track(&self, resource: GpuResource<B>) {
        self.records.lock().expect("Registry Lock").push(RegistryRecord {
            resource,
            externally_owned: false,
        });
    }

    /// Exempts a texture handle from disposal (e.g. one that doubles as the
    /// scene's shared environment texture). Returns false when the handle was
    /// not constructed by this load.
    pub fn mark_texture_external(&self, handle: &B::TextureHandle) -> bool {
        let mut records = self.records.lock().expect("Registry Lock");
        for record in records.iter_mut() {
            if let GpuResource::Texture(h) = &record.resource {
                if h == handle {
                    record.externally_owned = true;
                    return true;
                }
            }
        }
        false
    }

    /// Disposes every non-external record. Draining makes a second call a
    /// no-op, so cleanup-then-dispose can never double-release.
    pub fn dispose_all(&self) -> usize {
        let records: Vec<_> = self.records.lock().expect("Registry Lock").drain(..).collect();
        let mut disposed = 0;
        for record in &records {
            if !record.externally_owned {
                record.resource.dispose();
                disposed += 1;
            }
        }
        disposed
    }

    pub fn count_of(&self, kind: &'static str) -> usize {
        self.records
            .lock()
            .expect("Registry Lock")
            .iter()
            .filter(|r| r.resource.kind() == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("Registry Lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B: RenderBackend> Default for HandleRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub nodes: usize,
    pub vertex_buffers: usize,
    pub textures: usize,
    pub materials: usize,
    pub meshes: usize,
    pub skeletons: usize,
    pub animation_groups: usize,
    pub cameras: usize,
    pub lights: usize,
}

/// A fully loaded scene: the transform-node graph, the animation groups and
/// the registry of every GPU resource built along the way. Disposal consumes
/// the document, which makes double-dispose unrepresentable.
pub struct LoadedDocument<B: RenderBackend> {
    /// Slot per document node; `None` for nodes the loaded scene never reached.
    pub nodes: Vec<Option<Arc<SceneNode<B>>>>,
    pub roots: Vec<usize>,
    pub animation_groups: Vec<B::AnimationGroupHandle>,
    /// Which primitives consume each constructed material variant.
    pub material_consumers: HashMap<MaterialKey, Vec<PrimitiveRef>>,
    pub stats: LoadStats,
    registry: Arc<HandleRegistry<B>>,
}

impl<B: RenderBackend> LoadedDocument<B> {
    pub(crate) fn new(
        nodes: Vec<Option<Arc<SceneNode<B>>>>,
        roots: Vec<usize>,
        animation_groups: Vec<B::AnimationGroupHandle>,
        material_consumers: HashMap<MaterialKey, Vec<PrimitiveRef>>,
        registry: Arc<HandleRegistry<B>>,
    ) -> Self {
        let stats = LoadStats {
            nodes: nodes.iter().filter(|n| n.is_some()).count(),
            vertex_buffers: registry.count_of("vertex buffer"),
            textures: registry.count_of("texture"),
            materials: registry.count_of("material"),
            meshes: registry.count_of("mesh"),
            skeletons: registry.count_of("skeleton"),
            animation_groups: registry.count_of("animation group"),
            cameras: registry.count_of("camera"),
            lights: registry.count_of("light"),
        };
        Self {
            nodes,
            roots,
            animation_groups,
            material_consumers,
            stats,
            registry,
        }
    }

    pub fn node(&self, index: usize) -> Option<&Arc<SceneNode<B>>> {
        self.nodes.get(index).and_then(|slot| slot.as_ref())
    }

    /// See [`HandleRegistry::mark_texture_external`].
    pub fn mark_texture_external(&self, handle: &B::TextureHandle) -> bool {
        self.registry.mark_texture_external(handle)
    }

    /// Releases every GPU resource this load constructed, exactly once each,
    /// skipping externally owned ones. Returns the number disposed.
    pub fn dispose(self) -> usize {
        self.registry.dispose_all()
    }
}
