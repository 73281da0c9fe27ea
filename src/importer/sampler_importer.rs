use gltf_document::types::Sampler;

use crate::common::types::{FilterMode, SamplerSettings, WrapMode};
use crate::error::LoadError;

// GL enum values the glTF sampler schema reuses.
const NEAREST: u32 = 9728;
const LINEAR: u32 = 9729;
const NEAREST_MIPMAP_NEAREST: u32 = 9984;
const LINEAR_MIPMAP_NEAREST: u32 = 9985;
const NEAREST_MIPMAP_LINEAR: u32 = 9986;
const LINEAR_MIPMAP_LINEAR: u32 = 9987;
const CLAMP_TO_EDGE: u32 = 33071;
const MIRRORED_REPEAT: u32 = 33648;
const REPEAT: u32 = 10497;

pub struct SamplerImporter {}

impl SamplerImporter {
    /// Normalizes a glTF sampler into the engine-neutral record. A document
    /// node without a sampler reference gets the defaults (trilinear, repeat).
    pub fn create_settings(sampler: Option<&Sampler>) -> Result<SamplerSettings, LoadError> {
        let Some(sampler) = sampler else {
            return Ok(SamplerSettings::default());
        };

        let (min_filter, no_mipmaps) = match sampler.min_filter {
            None => (FilterMode::Linear, false),
            Some(NEAREST) => (FilterMode::Nearest, true),
            Some(LINEAR) => (FilterMode::Linear, true),
            Some(NEAREST_MIPMAP_NEAREST) | Some(NEAREST_MIPMAP_LINEAR) => (FilterMode::Nearest, false),
            Some(LINEAR_MIPMAP_NEAREST) | Some(LINEAR_MIPMAP_LINEAR) => (FilterMode::Linear, false),
            Some(other) => {
                return Err(LoadError::malformed(format!(
                    "sampler {} has invalid minFilter {}",
                    sampler.index, other
                )));
            }
        };

        let mag_filter = match sampler.mag_filter {
            None | Some(LINEAR) => FilterMode::Linear,
            Some(NEAREST) => FilterMode::Nearest,
            Some(other) => {
                return Err(LoadError::malformed(format!(
                    "sampler {} has invalid magFilter {}",
                    sampler.index, other
                )));
            }
        };

        Ok(SamplerSettings {
            no_mipmaps,
            mag_filter,
            min_filter,
            wrap_u: Self::wrap(sampler, sampler.wrap_s)?,
            wrap_v: Self::wrap(sampler, sampler.wrap_t)?,
        })
    }

    fn wrap(sampler: &Sampler, value: u32) -> Result<WrapMode, LoadError> {
        match value {
            REPEAT => Ok(WrapMode::Repeat),
            MIRRORED_REPEAT => Ok(WrapMode::MirroredRepeat),
            CLAMP_TO_EDGE => Ok(WrapMode::ClampToEdge),
            other => Err(LoadError::malformed(format!(
                "sampler {} has invalid wrap mode {}",
                sampler.index, other
            ))),
        }
    }
}
