use std::sync::Arc;

use log::trace;

use crate::backend::RenderBackend;
use crate::common::types::ImageData;
use crate::error::LoadError;
use crate::graph::nodes::{GpuResource, TextureKey};
use crate::importer::sampler_importer::SamplerImporter;
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// The still-encoded image payload, fetched at most once per image entity
    /// no matter how many textures reference it.
    pub async fn image_data(&self, index: usize) -> Result<ImageData, LoadError> {
        let image = self.document.image(index)?;
        self.image_cache
            .resolve(index, || async move {
                self.ensure_active()?;
                let bytes = match (&image.uri, image.buffer_view) {
                    (Some(uri), _) => {
                        trace!("Fetching image {} from its URI", index);
                        Arc::new(self.fetch_uri(uri)?)
                    }
                    (None, Some(view_index)) => self.view_bytes(view_index).await?,
                    (None, None) => {
                        return Err(LoadError::malformed(format!(
                            "image {} has neither a URI nor a bufferView",
                            index
                        )));
                    }
                };
                Ok(ImageData {
                    bytes,
                    mime_type: image.mime_type.clone(),
                })
            })
            .await
    }

    /// One engine texture per (texture entity, non-color interpretation).
    /// The underlying image bytes are shared; the constructed handles are not.
    pub async fn texture_handle(
        &self,
        texture_index: usize,
        non_color_data: bool,
    ) -> Result<B::TextureHandle, LoadError> {
        let texture = self.document.texture(texture_index)?;
        let key = TextureKey {
            index: texture_index,
            non_color_data,
        };
        self.texture_cache
            .resolve(key, || async move {
                let source_index = texture.source.ok_or_else(|| {
                    LoadError::malformed(format!("texture {} references no image source", texture_index))
                })?;
                let image = self.image_data(source_index).await?;
                let sampler = match texture.sampler {
                    Some(sampler_index) => Some(self.document.sampler(sampler_index)?),
                    None => None,
                };
                let settings = SamplerImporter::create_settings(sampler)?;

                self.ensure_active()?;
                let handle = self.backend.create_texture(&image, &settings, non_color_data)?;
                self.registry.track(GpuResource::Texture(handle.clone()));
                Ok(handle)
            })
            .await
    }
}
