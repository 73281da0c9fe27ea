use byteorder::{ByteOrder, LittleEndian};
use gltf_document::types::{Accessor, AccessorSparse, BufferView, ComponentType};

use crate::common::types::DecodedAccessor;
use crate::error::LoadError;

/// What the consumer wants the stream as: float attributes/keyframes, or
/// integral data (indices, joints).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Floats,
    Uints,
}

/// The bytes backing one accessor, pre-sliced to the referenced views.
pub struct AccessorData<'a> {
    pub accessor: &'a Accessor,
    /// The dense backing view and its bytes; absent for sparse-only accessors,
    /// which start from a zero-filled base per the glTF spec.
    pub view: Option<(&'a BufferView, &'a [u8])>,
    pub sparse: Option<SparseData<'a>>,
}

pub struct SparseData<'a> {
    pub sparse: &'a AccessorSparse,
    pub indices_bytes: &'a [u8],
    pub values_bytes: &'a [u8],
}

pub struct AccessorImporter {}

impl AccessorImporter {
    /// Decodes an accessor into a typed stream: strided or packed layouts,
    /// the `normalized` integer-to-float rules, and sparse substitution.
    /// Out-of-range reads are malformed-document errors, never truncation.
    pub fn decode(data: AccessorData, output: OutputKind) -> Result<DecodedAccessor, LoadError> {
        let accessor = data.accessor;
        let components = accessor.element_type.component_count();
        let packed = accessor.packed_element_size();

        let mut raw: Vec<f64> = match data.view {
            Some((view, bytes)) => {
                let stride = view.byte_stride.unwrap_or(packed);
                if stride < packed {
                    return Err(LoadError::malformed(format!(
                        "bufferView {} stride {} is smaller than accessor {} element size {}",
                        view.index, stride, accessor.index, packed
                    )));
                }
                Self::read_elements(
                    bytes,
                    accessor.byte_offset,
                    stride,
                    accessor.count,
                    components,
                    accessor.component_type,
                )
                .map_err(|reason| {
                    LoadError::malformed(format!("accessor {} overruns bufferView {}: {}", accessor.index, view.index, reason))
                })?
            }
            None => {
                let total = accessor.count.checked_mul(components).ok_or_else(|| {
                    LoadError::malformed(format!("accessor {} declares an absurd element count", accessor.index))
                })?;
                vec![0.0; total]
            }
        };

        if let Some(sparse_data) = data.sparse {
            Self::apply_sparse(accessor, &sparse_data, components, &mut raw)?;
        }

        match output {
            OutputKind::Floats => {
                let mut values = Vec::with_capacity(raw.len());
                for component in raw {
                    values.push(Self::to_float(component, accessor.component_type, accessor.normalized)?);
                }
                Ok(DecodedAccessor::Floats { components, values })
            }
            OutputKind::Uints => {
                if accessor.component_type == ComponentType::Float {
                    return Err(LoadError::malformed(format!(
                        "accessor {} holds float data but an integral stream was required",
                        accessor.index
                    )));
                }
                Ok(DecodedAccessor::Uints(raw.into_iter().map(|c| c as u32).collect()))
            }
        }
    }

    /// Raw strided read; components come out as f64 so one code path serves
    /// every component type (f64 is exact for u32 and f32 alike).
    fn read_elements(
        bytes: &[u8],
        byte_offset: usize,
        stride: usize,
        count: usize,
        components: usize,
        component_type: ComponentType,
    ) -> Result<Vec<f64>, String> {
        let component_size = component_type.byte_size();
        if count > 0 {
            // Checked: `count` comes straight from the document and may be
            // absurd, which must surface as malformed, not as overflow.
            let last_end = stride
                .checked_mul(count - 1)
                .and_then(|v| v.checked_add(byte_offset))
                .and_then(|v| v.checked_add(components * component_size));
            match last_end {
                Some(end) if end <= bytes.len() => {}
                Some(end) => return Err(format!("needs {} bytes, view holds {}", end, bytes.len())),
                None => return Err(format!("element count {} overflows the byte range", count)),
            }
        }

        let mut out = Vec::with_capacity(count * components);
        for element in 0..count {
            let base = byte_offset + element * stride;
            for component in 0..components {
                let offset = base + component * component_size;
                out.push(Self::read_component(bytes, offset, component_type));
            }
        }
        Ok(out)
    }

    fn read_component(bytes: &[u8], offset: usize, component_type: ComponentType) -> f64 {
        match component_type {
            ComponentType::Byte => bytes[offset] as i8 as f64,
            ComponentType::UnsignedByte => bytes[offset] as f64,
            ComponentType::Short => LittleEndian::read_i16(&bytes[offset..]) as f64,
            ComponentType::UnsignedShort => LittleEndian::read_u16(&bytes[offset..]) as f64,
            ComponentType::UnsignedInt => LittleEndian::read_u32(&bytes[offset..]) as f64,
            ComponentType::Float => LittleEndian::read_f32(&bytes[offset..]) as f64,
        }
    }

    fn apply_sparse(
        accessor: &Accessor,
        data: &SparseData<'_>,
        components: usize,
        raw: &mut [f64],
    ) -> Result<(), LoadError> {
        let sparse = data.sparse;
        // The schema only allows unsigned integer index types; anything else
        // (float, signed) would quietly decode into nonsense targets.
        match sparse.indices.component_type {
            ComponentType::UnsignedByte | ComponentType::UnsignedShort | ComponentType::UnsignedInt => {}
            other => {
                return Err(LoadError::malformed(format!(
                    "accessor {} sparse indices use component type {:?}, expected an unsigned integer type",
                    accessor.index, other
                )));
            }
        }
        if sparse.count > accessor.count {
            return Err(LoadError::malformed(format!(
                "accessor {} sparse count {} exceeds element count {}",
                accessor.index, sparse.count, accessor.count
            )));
        }

        let indices = Self::read_elements(
            data.indices_bytes,
            sparse.indices.byte_offset,
            sparse.indices.component_type.byte_size(),
            sparse.count,
            1,
            sparse.indices.component_type,
        )
        .map_err(|reason| LoadError::malformed(format!("accessor {} sparse indices: {}", accessor.index, reason)))?;

        let packed = accessor.packed_element_size();
        let values = Self::read_elements(
            data.values_bytes,
            sparse.values.byte_offset,
            packed,
            sparse.count,
            components,
            accessor.component_type,
        )
        .map_err(|reason| LoadError::malformed(format!("accessor {} sparse values: {}", accessor.index, reason)))?;

        for (slot, index) in indices.iter().enumerate() {
            let target = *index as usize;
            if target >= accessor.count {
                return Err(LoadError::malformed(format!(
                    "accessor {} sparse index {} is out of range ({} elements)",
                    accessor.index, target, accessor.count
                )));
            }
            let from = slot * components;
            raw[target * components..(target + 1) * components].copy_from_slice(&values[from..from + components]);
        }
        Ok(())
    }

    fn to_float(component: f64, component_type: ComponentType, normalized: bool) -> Result<f32, LoadError> {
        if !normalized {
            return Ok(component as f32);
        }
        // glTF 2.0 normalized-integer rules; signed variants clamp at -1.0.
        match component_type {
            ComponentType::Byte => Ok((component as f32 / 127.0).max(-1.0)),
            ComponentType::UnsignedByte => Ok(component as f32 / 255.0),
            ComponentType::Short => Ok((component as f32 / 32767.0).max(-1.0)),
            ComponentType::UnsignedShort => Ok(component as f32 / 65535.0),
            ComponentType::Float => Ok(component as f32),
            ComponentType::UnsignedInt => Err(LoadError::malformed(
                "normalized UNSIGNED_INT accessors are not valid glTF".to_string(),
            )),
        }
    }
}
