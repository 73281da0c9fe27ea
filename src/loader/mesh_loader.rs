use gltf_document::types::MeshPrimitive;
use itertools::Itertools;
use log::warn;

use crate::backend::{PrimitiveAssembly, RenderBackend};
use crate::common::types::{MaterialVariant, PrimitiveTopology, VertexAttributeKind};
use crate::error::LoadError;
use crate::graph::nodes::{GpuResource, MeshKey, PrimitiveRef};
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// One engine mesh per (mesh entity, binding skin). The same glTF mesh
    /// bound to two skins yields two engine meshes; unbound instancing shares
    /// one.
    pub async fn mesh_handle(&self, mesh_index: usize, skin: Option<usize>) -> Result<B::MeshHandle, LoadError> {
        let mesh = self.document.mesh(mesh_index)?;
        let key = MeshKey { index: mesh_index, skin };

        self.mesh_cache
            .resolve(key, || async move {
                let skeleton = match skin {
                    Some(skin_index) => Some(self.skeleton_handle(skin_index).await?),
                    None => None,
                };

                if mesh.primitives.is_empty() {
                    return Err(LoadError::malformed(format!("mesh {} has no primitives", mesh_index)));
                }
                let mut assemblies = Vec::with_capacity(mesh.primitives.len());
                for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
                    assemblies.push(
                        self.primitive_assembly(mesh_index, primitive_index, primitive, skin.is_some())
                            .await?,
                    );
                }

                self.ensure_active()?;
                let handle = self
                    .backend
                    .create_mesh(mesh.name.as_deref(), &assemblies, skeleton.as_ref())?;
                self.registry.track(GpuResource::Mesh(handle.clone()));
                Ok(handle)
            })
            .await
    }

    async fn primitive_assembly(
        &self,
        mesh_index: usize,
        primitive_index: usize,
        primitive: &MeshPrimitive,
        skinned: bool,
    ) -> Result<PrimitiveAssembly<B>, LoadError> {
        let topology = PrimitiveTopology::from_mode(primitive.mode).ok_or_else(|| {
            LoadError::malformed(format!(
                "mesh {} primitive {} uses unknown draw mode {}",
                mesh_index, primitive_index, primitive.mode
            ))
        })?;

        // Semantics sorted for a deterministic resolution order; the
        // attribute map itself has none.
        let mut vertex_buffers = Vec::with_capacity(primitive.attributes.len());
        let mut has_position = false;
        let mut has_colors = false;
        for (semantic, &accessor_index) in primitive.attributes.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            let Some(kind) = VertexAttributeKind::from_semantic(semantic) else {
                warn!(
                    "Skipping unsupported vertex attribute \"{}\" on mesh {} primitive {}",
                    semantic, mesh_index, primitive_index
                );
                continue;
            };
            has_position |= kind == VertexAttributeKind::Position;
            has_colors |= kind == VertexAttributeKind::Color0;
            vertex_buffers.push((kind, self.vertex_buffer(accessor_index, kind).await?));
        }
        if !has_position {
            return Err(LoadError::malformed(format!(
                "mesh {} primitive {} has no POSITION attribute",
                mesh_index, primitive_index
            )));
        }

        let indices = match primitive.indices {
            Some(accessor_index) => Some(self.vertex_buffer(accessor_index, VertexAttributeKind::Index).await?),
            None => None,
        };

        let variant = MaterialVariant {
            vertex_colors: has_colors,
            skinned,
        };
        let material = match primitive.material {
            Some(material_index) => Some(
                self.material_handle(
                    material_index,
                    variant,
                    PrimitiveRef {
                        mesh: mesh_index,
                        primitive: primitive_index,
                    },
                )
                .await?,
            ),
            None => None,
        };

        Ok(PrimitiveAssembly {
            topology,
            vertex_buffers,
            indices,
            material,
        })
    }
}
