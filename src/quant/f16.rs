// IEEE 754 half-precision and bfloat16 conversion

/// Convert 16-bit IEEE 754 half-precision bits to a 32-bit float.
///
/// Bit layout of f16:
///   - 1 bit sign
///   - 5 bits exponent (bias 15)
///   - 10 bits mantissa
///
/// Special cases:
///   - Exponent 0: signed zero, or a subnormal that becomes a normal f32
///   - Exponent 31: infinity / NaN (sign preserved)
///
/// The conversion is exact; every f16 value is representable as f32.
#[inline]
pub fn f16_to_f32(bits: u16) -> f32 {
    half::f16::from_bits(bits).to_f32()
}

/// Convert bfloat16 bits to a 32-bit float.
///
/// bf16 is the upper half of an f32, so the widening is exact.
#[inline]
pub fn bf16_to_f32(bits: u16) -> f32 {
    half::bf16::from_bits(bits).to_f32()
}

/// Read a little-endian f16 at `offset` and widen it.
#[inline]
pub(crate) fn read_f16(bytes: &[u8], offset: usize) -> f32 {
    f16_to_f32(u16::from_le_bytes([bytes[offset], bytes[offset + 1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f16_to_f32_zero() {
        assert_eq!(f16_to_f32(0x0000), 0.0);
        assert!(f16_to_f32(0x0000).is_sign_positive());
    }

    #[test]
    fn test_f16_to_f32_negative_zero() {
        let v = f16_to_f32(0x8000);
        assert_eq!(v, 0.0);
        assert!(v.is_sign_negative());
    }

    #[test]
    fn test_f16_to_f32_specific_values() {
        assert_eq!(f16_to_f32(0x3C00), 1.0);
        assert_eq!(f16_to_f32(0xBC00), -1.0);
        assert_eq!(f16_to_f32(0x4000), 2.0);
        assert_eq!(f16_to_f32(0xC000), -2.0);
        assert_eq!(f16_to_f32(0x3800), 0.5);
        // Largest finite f16
        assert_eq!(f16_to_f32(0x7BFF), 65504.0);
        // Smallest normal f16: 2^-14
        assert_eq!(f16_to_f32(0x0400), 2.0f32.powi(-14));
    }

    #[test]
    fn test_f16_to_f32_infinity() {
        assert_eq!(f16_to_f32(0x7C00), f32::INFINITY);
        assert_eq!(f16_to_f32(0xFC00), f32::NEG_INFINITY);
    }

    #[test]
    fn test_f16_to_f32_nan() {
        assert!(f16_to_f32(0x7C01).is_nan());
        assert!(f16_to_f32(0x7E00).is_nan());
        assert!(f16_to_f32(0xFE00).is_nan());
        assert!(f16_to_f32(0xFE00).is_sign_negative());
    }

    #[test]
    fn test_f16_to_f32_subnormal() {
        // Smallest positive subnormal: 2^-24
        assert_eq!(f16_to_f32(0x0001), 2.0f32.powi(-24));
        // Largest subnormal: 1023 * 2^-24
        assert_eq!(f16_to_f32(0x03FF), 1023.0 * 2.0f32.powi(-24));
        assert_eq!(f16_to_f32(0x8200), -(2.0f32.powi(-15)));
    }

    #[test]
    fn test_f16_widening_is_lossless_for_every_bit_pattern() {
        // Narrowing the widened value must give back the original bits.
        for bits in 0..=u16::MAX {
            let wide = f16_to_f32(bits);
            if wide.is_nan() {
                assert_eq!(bits & 0x7C00, 0x7C00, "0x{bits:04X}");
                assert_ne!(bits & 0x03FF, 0, "0x{bits:04X}");
                continue;
            }
            assert_eq!(
                half::f16::from_f32(wide).to_bits(),
                bits,
                "0x{bits:04X} widened to {wide}"
            );
        }
    }

    #[test]
    fn test_bf16_to_f32() {
        assert_eq!(bf16_to_f32(0x3F80), 1.0);
        assert_eq!(bf16_to_f32(0xC000), -2.0);
        assert_eq!(bf16_to_f32(0x7F80), f32::INFINITY);
        assert_eq!(bf16_to_f32(0x3E20), 0.15625);
    }

    #[test]
    fn test_bf16_is_upper_half_of_f32() {
        for v in [1.5f32, -3.25, 1024.0, 2.0f32.powi(-100)] {
            let bits = (v.to_bits() >> 16) as u16;
            assert_eq!(bf16_to_f32(bits).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_read_f16_little_endian() {
        let bytes = [0xAA, 0x00, 0x3C, 0xBB];
        assert_eq!(read_f16(&bytes, 1), 1.0);
    }
}
