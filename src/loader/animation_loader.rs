use log::warn;

use crate::backend::RenderBackend;
use crate::common::types::{AnimatedProperty, AnimationChannelData, DecodedAccessor, Interpolation};
use crate::error::LoadError;
use crate::graph::nodes::GpuResource;
use crate::importer::accessor_importer::OutputKind;
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// Resolves one animation into a backend group. Channels with an unknown
    /// target path or interpolation degrade to a skip; an animation whose
    /// channels all degraded yields no group at all.
    pub async fn animation_group(&self, index: usize) -> Result<Option<B::AnimationGroupHandle>, LoadError> {
        let animation = self.document.animation(index)?;
        self.animation_cache
            .resolve(index, || async move {
                let mut channels = Vec::with_capacity(animation.channels.len());
                for (channel_index, channel) in animation.channels.iter().enumerate() {
                    let Some(target_node) = channel.target.node else {
                        warn!(
                            "Skipping channel {} of animation {}: it targets no node",
                            channel_index, index
                        );
                        continue;
                    };
                    self.document.node(target_node)?;

                    let Some(property) = AnimatedProperty::from_target_path(&channel.target.path) else {
                        warn!(
                            "Skipping channel {} of animation {}: unsupported target path \"{}\"",
                            channel_index, index, channel.target.path
                        );
                        continue;
                    };

                    let sampler = animation.samplers.get(channel.sampler).ok_or_else(|| {
                        LoadError::malformed(format!(
                            "animation {} channel {} references sampler {} of {}",
                            index,
                            channel_index,
                            channel.sampler,
                            animation.samplers.len()
                        ))
                    })?;
                    let Some(interpolation) = Interpolation::from_name(&sampler.interpolation) else {
                        warn!(
                            "Skipping channel {} of animation {}: unsupported interpolation \"{}\"",
                            channel_index, index, sampler.interpolation
                        );
                        continue;
                    };

                    let input = match self.decoded_accessor(sampler.input, OutputKind::Floats).await? {
                        DecodedAccessor::Floats { components: 1, values } => values,
                        _ => {
                            return Err(LoadError::malformed(format!(
                                "animation {} sampler input accessor {} is not scalar float data",
                                index, sampler.input
                            )));
                        }
                    };
                    let (components, output) = match self.decoded_accessor(sampler.output, OutputKind::Floats).await? {
                        DecodedAccessor::Floats { components, values } => (components, values),
                        DecodedAccessor::Uints(_) => unreachable!("float output was requested"),
                    };

                    // Morph weight outputs are keyframes x target count and
                    // cannot be validated against the key count alone.
                    if property != AnimatedProperty::MorphWeights {
                        let per_key = if interpolation == Interpolation::CubicSpline { 3 } else { 1 };
                        let expected = input.len() * per_key;
                        if output.len() / components.max(1) != expected {
                            return Err(LoadError::malformed(format!(
                                "animation {} channel {} has {} keys but {} output elements",
                                index,
                                channel_index,
                                input.len(),
                                output.len() / components.max(1)
                            )));
                        }
                    }

                    channels.push(AnimationChannelData {
                        target_node,
                        property,
                        interpolation,
                        input,
                        output,
                        components,
                    });
                }

                if channels.is_empty() {
                    warn!("Animation {} has no usable channels, skipping it", index);
                    return Ok(None);
                }

                self.ensure_active()?;
                let handle = self.backend.create_animation_group(animation.name.as_deref(), &channels)?;
                self.registry.track(GpuResource::AnimationGroup(handle.clone()));
                Ok(Some(handle))
            })
            .await
    }
}
