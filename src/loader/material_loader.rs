use gltf_document::types::TextureInfo;

use crate::backend::{MaterialParams, RenderBackend, TextureSlot};
use crate::common::types::MaterialVariant;
use crate::error::LoadError;
use crate::graph::nodes::{GpuResource, MaterialKey, PrimitiveRef};
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// One engine material per (material entity, draw-mode variant). Every
    /// caller is recorded as a consumer, not just the one whose resolution
    /// constructed the object.
    pub async fn material_handle(
        &self,
        material_index: usize,
        variant: MaterialVariant,
        consumer: PrimitiveRef,
    ) -> Result<B::MaterialHandle, LoadError> {
        let material = self.document.material(material_index)?;
        let key = MaterialKey {
            index: material_index,
            variant,
        };

        let handle = self
            .material_cache
            .resolve(key, || async move {
                let pbr = &material.pbr_metallic_roughness;

                // The non-color flag is fixed per slot: base color and
                // emissive carry color, the data maps do not.
                let base_color = self.texture_slot(pbr.base_color_texture.as_ref(), false).await?;
                let metallic_roughness = self.texture_slot(pbr.metallic_roughness_texture.as_ref(), true).await?;
                let emissive = self.texture_slot(material.emissive_texture.as_ref(), false).await?;

                let normal = match &material.normal_texture {
                    Some(info) => Some(TextureSlot {
                        handle: self.texture_handle(info.index, true).await?,
                        tex_coord: info.tex_coord,
                        non_color_data: true,
                        factor: info.scale,
                    }),
                    None => None,
                };
                let occlusion = match &material.occlusion_texture {
                    Some(info) => Some(TextureSlot {
                        handle: self.texture_handle(info.index, true).await?,
                        tex_coord: info.tex_coord,
                        non_color_data: true,
                        factor: info.strength,
                    }),
                    None => None,
                };

                let params = MaterialParams {
                    name: material.name.clone(),
                    base_color_factor: pbr.base_color_factor,
                    metallic_factor: pbr.metallic_factor,
                    roughness_factor: pbr.roughness_factor,
                    emissive_factor: material.emissive_factor,
                    alpha_mode: material.alpha_mode,
                    alpha_cutoff: material.alpha_cutoff,
                    double_sided: material.double_sided,
                    base_color,
                    metallic_roughness,
                    normal,
                    occlusion,
                    emissive,
                };

                self.ensure_active()?;
                let handle = self.backend.create_material(&params, variant)?;
                self.registry.track(GpuResource::Material(handle.clone()));
                Ok(handle)
            })
            .await?;

        let mut consumers = self.material_consumers.entry(key).or_default();
        if !consumers.contains(&consumer) {
            consumers.push(consumer);
        }
        Ok(handle)
    }

    async fn texture_slot(
        &self,
        info: Option<&TextureInfo>,
        non_color_data: bool,
    ) -> Result<Option<TextureSlot<B::TextureHandle>>, LoadError> {
        match info {
            Some(info) => Ok(Some(TextureSlot {
                handle: self.texture_handle(info.index, non_color_data).await?,
                tex_coord: info.tex_coord,
                non_color_data,
                factor: 1.0,
            })),
            None => Ok(None),
        }
    }
}
