use std::fmt::Debug;

use glam::Mat4;
use gltf_document::types::AlphaMode;

use crate::common::types::{
    AnimationChannelData, CameraParams, DecodedAccessor, ImageData, JointDesc, LightParams, MaterialVariant,
    PrimitiveTopology, SamplerSettings, VertexAttributeKind,
};

pub mod null;

/// A refcount-free handle the backend hands out per constructed resource.
/// Equality is identity (so the loader can recognize a handle it already
/// registered), and `dispose` releases the underlying GPU resource. The
/// loader calls it exactly once per handle that is not externally owned.
pub trait GpuHandle: Clone + PartialEq + Debug + Send + Sync + 'static {
    fn dispose(&self);
}

/// A texture slot on a material: the constructed handle plus the per-reference
/// interpretation. `non_color_data` belongs to the slot, not the texture; the
/// same glTF texture referenced from a color and a non-color slot arrives here
/// as two distinct handles.
#[derive(Debug, Clone)]
pub struct TextureSlot<T: GpuHandle> {
    pub handle: T,
    pub tex_coord: usize,
    pub non_color_data: bool,
    /// `scale` for normal maps, `strength` for occlusion, 1.0 otherwise.
    pub factor: f32,
}

#[derive(Debug, Clone)]
pub struct MaterialParams<T: GpuHandle> {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub base_color: Option<TextureSlot<T>>,
    pub metallic_roughness: Option<TextureSlot<T>>,
    pub normal: Option<TextureSlot<T>>,
    pub occlusion: Option<TextureSlot<T>>,
    pub emissive: Option<TextureSlot<T>>,
}

/// One fully resolved mesh primitive, ready for geometry assembly.
#[derive(Debug, Clone)]
pub struct PrimitiveAssembly<B: RenderBackend + ?Sized> {
    pub topology: PrimitiveTopology,
    pub vertex_buffers: Vec<(VertexAttributeKind, B::VertexBufferHandle)>,
    pub indices: Option<B::VertexBufferHandle>,
    pub material: Option<B::MaterialHandle>,
}

/// The render engine, reduced to the factory operations the loader needs.
/// Implementations are black boxes; idempotency per entity comes from the
/// loader's memoization, never from the backend.
pub trait RenderBackend: Send + Sync + 'static {
    type VertexBufferHandle: GpuHandle;
    type TextureHandle: GpuHandle;
    type MaterialHandle: GpuHandle;
    type MeshHandle: GpuHandle;
    type SkeletonHandle: GpuHandle;
    type AnimationGroupHandle: GpuHandle;
    type CameraHandle: GpuHandle;
    type LightHandle: GpuHandle;

    fn create_vertex_buffer(
        &self,
        data: &DecodedAccessor,
        kind: VertexAttributeKind,
    ) -> Result<Self::VertexBufferHandle, anyhow::Error>;

    /// `non_color_data` must be honored before decode: linear sampling for
    /// normal/metallic-roughness/occlusion data, gamma for color.
    fn create_texture(
        &self,
        image: &ImageData,
        sampler: &SamplerSettings,
        non_color_data: bool,
    ) -> Result<Self::TextureHandle, anyhow::Error>;

    fn create_material(
        &self,
        params: &MaterialParams<Self::TextureHandle>,
        variant: MaterialVariant,
    ) -> Result<Self::MaterialHandle, anyhow::Error>;

    fn create_mesh(
        &self,
        name: Option<&str>,
        primitives: &[PrimitiveAssembly<Self>],
        skeleton: Option<&Self::SkeletonHandle>,
    ) -> Result<Self::MeshHandle, anyhow::Error>;

    fn create_skeleton(
        &self,
        name: Option<&str>,
        joints: &[JointDesc],
        inverse_bind_matrices: &[Mat4],
    ) -> Result<Self::SkeletonHandle, anyhow::Error>;

    fn create_animation_group(
        &self,
        name: Option<&str>,
        channels: &[AnimationChannelData],
    ) -> Result<Self::AnimationGroupHandle, anyhow::Error>;

    fn create_camera(&self, params: &CameraParams) -> Result<Self::CameraHandle, anyhow::Error>;

    fn create_light(&self, params: &LightParams) -> Result<Self::LightHandle, anyhow::Error>;
}
