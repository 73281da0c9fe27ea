use std::fmt::{Debug, Formatter};

use glam::Vec3;

/// What a vertex stream is consumed *as*. The same accessor may back more than
/// one of these (e.g. positions reused as normals), and each pairing is its own
/// derivation with its own GPU buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexAttributeKind {
    Position,
    Normal,
    Tangent,
    TexCoord0,
    TexCoord1,
    Color0,
    Joints0,
    Weights0,
    /// Index buffers are a derivation kind too, they just never mix with the others.
    Index,
}

impl VertexAttributeKind {
    /// Maps a glTF primitive attribute semantic. Unknown semantics are not an
    /// error here; the caller decides whether to degrade.
    pub fn from_semantic(semantic: &str) -> Option<Self> {
        match semantic {
            "POSITION" => Some(VertexAttributeKind::Position),
            "NORMAL" => Some(VertexAttributeKind::Normal),
            "TANGENT" => Some(VertexAttributeKind::Tangent),
            "TEXCOORD_0" => Some(VertexAttributeKind::TexCoord0),
            "TEXCOORD_1" => Some(VertexAttributeKind::TexCoord1),
            "COLOR_0" => Some(VertexAttributeKind::Color0),
            "JOINTS_0" => Some(VertexAttributeKind::Joints0),
            "WEIGHTS_0" => Some(VertexAttributeKind::Weights0),
            _ => None,
        }
    }

    /// Whether this stream carries integral data (indices, joint ids) rather
    /// than float attributes.
    pub fn is_integral(&self) -> bool {
        matches!(self, VertexAttributeKind::Index | VertexAttributeKind::Joints0)
    }
}

/// A decoded accessor: either float streams (attributes, keyframes, matrices)
/// or integral streams (indices, joints).
#[derive(Clone, PartialEq)]
pub enum DecodedAccessor {
    Floats {
        /// Components per element (1 for SCALAR, 3 for VEC3, 16 for MAT4, ...).
        components: usize,
        values: Vec<f32>,
    },
    Uints(Vec<u32>),
}

impl DecodedAccessor {
    pub fn element_count(&self) -> usize {
        match self {
            DecodedAccessor::Floats { components, values } => values.len() / (*components).max(1),
            DecodedAccessor::Uints(values) => values.len(),
        }
    }
}

impl Debug for DecodedAccessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodedAccessor::Floats { components, values } => {
                write!(f, "Floats {{ components: {}, values: [{}] }}", components, values.len())
            }
            DecodedAccessor::Uints(values) => write!(f, "Uints {{ values: [{}] }}", values.len()),
        }
    }
}

/// Engine-neutral sampler record, normalized from the GL enum soup once.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SamplerSettings {
    pub no_mipmaps: bool,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            no_mipmaps: false,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveTopology {
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            0 => Some(PrimitiveTopology::Points),
            1 => Some(PrimitiveTopology::Lines),
            2 => Some(PrimitiveTopology::LineLoop),
            3 => Some(PrimitiveTopology::LineStrip),
            4 => Some(PrimitiveTopology::Triangles),
            5 => Some(PrimitiveTopology::TriangleStrip),
            6 => Some(PrimitiveTopology::TriangleFan),
            _ => None,
        }
    }
}

/// Draw-mode discriminator for material construction: primitives with
/// different vertex formats need distinct engine materials even when they
/// name the same glTF material index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaterialVariant {
    pub vertex_colors: bool,
    pub skinned: bool,
}

/// Raw (still encoded) image bytes plus the mime type hint. Pixel decoding is
/// the backend's business; the non-color-data flag travels separately because
/// it has to be known *before* decode.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: std::sync::Arc<Vec<u8>>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CameraParams {
    pub name: Option<String>,
    pub kind: CameraProjection,
}

#[derive(Debug, Copy, Clone)]
pub enum CameraProjection {
    Perspective {
        aspect_ratio: Option<f32>,
        yfov: f32,
        znear: f32,
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

#[derive(Debug, Clone)]
pub struct LightParams {
    pub name: Option<String>,
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

#[derive(Debug, Copy, Clone)]
pub enum LightKind {
    Directional,
    Point {
        range: Option<f32>,
    },
    Spot {
        range: Option<f32>,
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

#[derive(Debug, Clone)]
pub struct JointDesc {
    pub node_index: usize,
    pub name: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnimatedProperty {
    Translation,
    Rotation,
    Scale,
    MorphWeights,
}

impl AnimatedProperty {
    pub fn from_target_path(path: &str) -> Option<Self> {
        match path {
            "translation" => Some(AnimatedProperty::Translation),
            "rotation" => Some(AnimatedProperty::Rotation),
            "scale" => Some(AnimatedProperty::Scale),
            "weights" => Some(AnimatedProperty::MorphWeights),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    CubicSpline,
}

impl Interpolation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LINEAR" => Some(Interpolation::Linear),
            "STEP" => Some(Interpolation::Step),
            "CUBICSPLINE" => Some(Interpolation::CubicSpline),
            _ => None,
        }
    }
}

/// One animation channel, fully decoded: a target node property bound to
/// sampled keyframe data.
#[derive(Debug, Clone)]
pub struct AnimationChannelData {
    pub target_node: usize,
    pub property: AnimatedProperty,
    pub interpolation: Interpolation,
    /// Keyframe times, seconds, ascending.
    pub input: Vec<f32>,
    /// Flattened keyframe values, `components` floats per keyframe (three
    /// times that for cubic-spline tangent triples).
    pub output: Vec<f32>,
    pub components: usize,
}
