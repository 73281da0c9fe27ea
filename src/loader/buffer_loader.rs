use std::sync::Arc;

use log::trace;

use crate::backend::RenderBackend;
use crate::common::types::{DecodedAccessor, VertexAttributeKind};
use crate::error::LoadError;
use crate::graph::nodes::GpuResource;
use crate::importer::accessor_importer::{AccessorData, AccessorImporter, OutputKind, SparseData};
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

/// Byte plumbing: buffers, views and decoded accessors. Fetches are memoized
/// per buffer, so however many views and accessors fan into one URI, it is
/// pulled through the byte source at most once.
impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    pub async fn buffer_bytes(&self, index: usize) -> Result<Arc<Vec<u8>>, LoadError> {
        let buffer = self.document.buffer(index)?;
        self.buffer_cache
            .resolve(index, || async move {
                self.ensure_active()?;
                let bytes = match &buffer.uri {
                    Some(uri) => {
                        trace!("Fetching buffer {} ({} bytes declared)", index, buffer.byte_length);
                        Arc::new(self.fetch_uri(uri)?)
                    }
                    // A URI-less buffer is the GLB BIN chunk.
                    None => self.binary.clone().ok_or_else(|| {
                        LoadError::malformed(format!(
                            "buffer {} has no URI and the container carries no BIN chunk",
                            index
                        ))
                    })?,
                };
                if bytes.len() < buffer.byte_length {
                    return Err(LoadError::malformed(format!(
                        "buffer {} delivered {} bytes but declares {}",
                        index,
                        bytes.len(),
                        buffer.byte_length
                    )));
                }
                Ok(bytes)
            })
            .await
    }

    pub async fn view_bytes(&self, index: usize) -> Result<Arc<Vec<u8>>, LoadError> {
        let view = self.document.buffer_view(index)?;
        self.view_cache
            .resolve(index, || async move {
                let buffer = self.buffer_bytes(view.buffer).await?;
                let end = view
                    .byte_offset
                    .checked_add(view.byte_length)
                    .filter(|&end| end <= buffer.len())
                    .ok_or_else(|| {
                        LoadError::malformed(format!(
                            "bufferView {} ({}+{}) overruns buffer {} of {} bytes",
                            index,
                            view.byte_offset,
                            view.byte_length,
                            view.buffer,
                            buffer.len()
                        ))
                    })?;
                Ok(Arc::new(buffer[view.byte_offset..end].to_vec()))
            })
            .await
    }

    /// Decodes an accessor into a typed stream. Not memoized itself: the
    /// backing fetches are, and each consumer (vertex buffers, bind matrices,
    /// keyframes) wants its own typed copy anyway.
    pub async fn decoded_accessor(&self, index: usize, output: OutputKind) -> Result<DecodedAccessor, LoadError> {
        let accessor = self.document.accessor(index)?;

        let view_bytes = match accessor.buffer_view {
            Some(view_index) => Some((self.document.buffer_view(view_index)?, self.view_bytes(view_index).await?)),
            None => None,
        };
        let sparse_bytes = match &accessor.sparse {
            Some(sparse) => Some((
                sparse,
                self.view_bytes(sparse.indices.buffer_view).await?,
                self.view_bytes(sparse.values.buffer_view).await?,
            )),
            None => None,
        };

        AccessorImporter::decode(
            AccessorData {
                accessor,
                view: view_bytes.as_ref().map(|(view, bytes)| (*view, bytes.as_slice())),
                sparse: sparse_bytes.as_ref().map(|(sparse, indices, values)| SparseData {
                    sparse,
                    indices_bytes: indices.as_slice(),
                    values_bytes: values.as_slice(),
                }),
            },
            output,
        )
    }

    /// One GPU buffer per (accessor, consumed-as) pairing.
    pub async fn vertex_buffer(
        &self,
        accessor_index: usize,
        kind: VertexAttributeKind,
    ) -> Result<B::VertexBufferHandle, LoadError> {
        self.document.accessor(accessor_index)?;
        self.vertex_buffer_cache
            .resolve((accessor_index, kind), || async move {
                let output = if kind.is_integral() { OutputKind::Uints } else { OutputKind::Floats };
                let decoded = self.decoded_accessor(accessor_index, output).await?;
                self.ensure_active()?;
                let handle = self.backend.create_vertex_buffer(&decoded, kind)?;
                self.registry.track(GpuResource::VertexBuffer(handle.clone()));
                Ok(handle)
            })
            .await
    }
}
