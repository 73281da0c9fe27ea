use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use log::trace;

use crate::backend::{GpuHandle, MaterialParams, PrimitiveAssembly, RenderBackend};
use crate::common::types::{
    AnimationChannelData, CameraParams, DecodedAccessor, ImageData, JointDesc, LightParams, MaterialVariant,
    SamplerSettings, VertexAttributeKind,
};

/// A backend that constructs nothing: every factory call yields a fresh id.
/// Lets the CLI (and smoke tests) run the full resolution protocol without a
/// GPU attached.
#[derive(Default)]
pub struct NullBackend {
    next_id: AtomicU64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, kind: &'static str) -> NullHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("NullBackend: created {} #{}", kind, id);
        NullHandle { id, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullHandle {
    pub id: u64,
    pub kind: &'static str,
}

impl GpuHandle for NullHandle {
    fn dispose(&self) {
        trace!("NullBackend: disposed {} #{}", self.kind, self.id);
    }
}

impl RenderBackend for NullBackend {
    type VertexBufferHandle = NullHandle;
    type TextureHandle = NullHandle;
    type MaterialHandle = NullHandle;
    type MeshHandle = NullHandle;
    type SkeletonHandle = NullHandle;
    type AnimationGroupHandle = NullHandle;
    type CameraHandle = NullHandle;
    type LightHandle = NullHandle;

    fn create_vertex_buffer(
        &self,
        _data: &DecodedAccessor,
        _kind: VertexAttributeKind,
    ) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("vertex buffer"))
    }

    fn create_texture(
        &self,
        _image: &ImageData,
        _sampler: &SamplerSettings,
        _non_color_data: bool,
    ) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("texture"))
    }

    fn create_material(
        &self,
        _params: &MaterialParams<NullHandle>,
        _variant: MaterialVariant,
    ) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("material"))
    }

    fn create_mesh(
        &self,
        _name: Option<&str>,
        _primitives: &[PrimitiveAssembly<Self>],
        _skeleton: Option<&NullHandle>,
    ) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("mesh"))
    }

    fn create_skeleton(
        &self,
        _name: Option<&str>,
        _joints: &[JointDesc],
        _inverse_bind_matrices: &[Mat4],
    ) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("skeleton"))
    }

    fn create_animation_group(
        &self,
        _name: Option<&str>,
        _channels: &[AnimationChannelData],
    ) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("animation group"))
    }

    fn create_camera(&self, _params: &CameraParams) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("camera"))
    }

    fn create_light(&self, _params: &LightParams) -> Result<NullHandle, anyhow::Error> {
        Ok(self.next("light"))
    }
}
