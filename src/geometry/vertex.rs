use cgmath::Vector3;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [u16; 4],
    pub normal: [u8; 4],
    pub tex_coord: [u16; 2],
}

impl Vertex {
    pub fn from_attributes(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position: [
                meshopt::quantize_half(position[0]),
                meshopt::quantize_half(position[1]),
                meshopt::quantize_half(position[2]),
                0,
            ],
            normal: [
                quantize_normal(normal[0]),
                quantize_normal(normal[1]),
                quantize_normal(normal[2]),
                0,
            ],
            tex_coord: [
                meshopt::quantize_half(tex_coord[0]),
                meshopt::quantize_half(tex_coord[1]),
            ],
        }
    }

    /// Returns `None` when any component is an infinity or NaN bit pattern.
    pub fn decode_position(&self) -> Option<Vector3<f32>> {
        Some(Vector3::new(
            decode_half(self.position[0])?,
            decode_half(self.position[1])?,
            decode_half(self.position[2])?,
        ))
    }
}

pub fn quantize_normal(value: f32) -> u8 {
    (value.clamp(-1.0, 1.0) * 127.0 + 127.0) as u8
}

/// Decodes an IEEE-754 binary16 bit pattern.
///
/// Denormals decode as exactly `0.0`, matching the encoder which flushes them.
/// Infinities and NaNs (exponent 31) have no finite value and yield `None`.
pub fn decode_half(value: u16) -> Option<f32> {
    let sign = value >> 15;
    let exponent = (value >> 10) & 0x1f;
    let mantissa = value & 0x3ff;

    match exponent {
        0 => Some(0.0),
        31 => None,
        _ => {
            let magnitude =
                f32::from(mantissa | 0x400) / 1024.0 * 2f32.powi(i32::from(exponent) - 15);

            Some(if sign == 1 { -magnitude } else { magnitude })
        }
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn vertex_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 16);
    }

    #[test]
    fn decode_half_matches_reference_for_all_normal_values() {
        for bits in 0..=u16::MAX {
            let exponent = (bits >> 10) & 0x1f;
            if exponent == 0 || exponent == 31 {
                continue;
            }

            let expected = half::f16::from_bits(bits).to_f32();
            assert_eq!(decode_half(bits), Some(expected), "bits {bits:#06x}");
        }
    }

    #[test]
    fn zero_exponent_decodes_to_exact_zero() {
        for bits in [0x0000, 0x8000, 0x0001, 0x03ff, 0x83ff] {
            assert_eq!(decode_half(bits), Some(0.0));
        }
    }

    #[test]
    fn max_exponent_has_no_finite_value() {
        assert_eq!(decode_half(0x7c00), None);
        assert_eq!(decode_half(0xfc00), None);
        assert_eq!(decode_half(0x7e00), None);
    }

    #[quickcheck]
    fn quantized_half_round_trips_within_half_precision(value: f32) -> TestResult {
        if !value.is_finite() || value.abs() > 65000.0 {
            return TestResult::discard();
        }

        let decoded = match decode_half(meshopt::quantize_half(value)) {
            Some(decoded) => decoded,
            None => return TestResult::failed(),
        };

        // Half precision keeps 11 significant bits; values below the smallest
        // normal are flushed to zero.
        let tolerance = value.abs() / 2048.0 + 6.2e-5;
        TestResult::from_bool((decoded - value).abs() <= tolerance)
    }

    #[test]
    fn normals_map_onto_unsigned_bytes() {
        assert_eq!(quantize_normal(-1.0), 0);
        assert_eq!(quantize_normal(0.0), 127);
        assert_eq!(quantize_normal(1.0), 254);
    }

    #[test]
    fn attributes_quantize_with_zeroed_padding_lanes() {
        let vertex = Vertex::from_attributes([1.0, -2.0, 0.5], [0.0, 0.0, 1.0], [0.25, 0.75]);

        assert_eq!(vertex.position, [0x3c00, 0xc000, 0x3800, 0]);
        assert_eq!(vertex.normal, [127, 127, 254, 0]);
        assert_eq!(vertex.tex_coord, [0x3400, 0x3a00]);
        assert_eq!(vertex.decode_position(), Some(Vector3::new(1.0, -2.0, 0.5)));
    }
}
