// Full-precision and 32-element linear block formats

use super::f16::{bf16_to_f32, read_f16};
use super::{signed_code, BlockFormat};
use crate::gguf::{GgufTensorType, QK4_0, QK8_0};

// ---------------------------------------------------------------------------
// Unquantized element formats (block size 1)
// ---------------------------------------------------------------------------

/// F32: one little-endian IEEE 754 single per element.
pub struct BlockF32;

impl BlockFormat for BlockF32 {
    const DTYPE: GgufTensorType = GgufTensorType::F32;

    #[inline]
    fn decode_block(block: &[u8], out: &mut [f32]) {
        out[0] = f32::from_le_bytes([block[0], block[1], block[2], block[3]]);
    }
}

/// F16: one little-endian IEEE 754 half per element.
pub struct BlockF16;

impl BlockFormat for BlockF16 {
    const DTYPE: GgufTensorType = GgufTensorType::F16;

    #[inline]
    fn decode_block(block: &[u8], out: &mut [f32]) {
        out[0] = read_f16(block, 0);
    }
}

/// BF16: one little-endian bfloat16 per element.
pub struct BlockBF16;

impl BlockFormat for BlockBF16 {
    const DTYPE: GgufTensorType = GgufTensorType::BF16;

    #[inline]
    fn decode_block(block: &[u8], out: &mut [f32]) {
        out[0] = bf16_to_f32(u16::from_le_bytes([block[0], block[1]]));
    }
}

// ---------------------------------------------------------------------------
// Q8_0: 34 bytes per block of 32 values
// ---------------------------------------------------------------------------

/// Q8_0 block: 8-bit quantization with a single f16 scale factor.
///
/// Layout: `d: f16 (2 bytes) | qs: [i8; 32] (32 bytes)` = 34 bytes total.
/// Dequantization: `y[i] = d * qs[i]`
pub struct BlockQ8_0;

impl BlockFormat for BlockQ8_0 {
    const DTYPE: GgufTensorType = GgufTensorType::Q8_0;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        for (y, &q) in out.iter_mut().zip(&block[2..2 + QK8_0]) {
            *y = q as i8 as f32 * d;
        }
    }
}

// ---------------------------------------------------------------------------
// Q8_1: 36 bytes per block of 32 values
// ---------------------------------------------------------------------------

/// Q8_1 block: like Q8_0 plus a precomputed `s = d * sum(qs)`.
///
/// Layout: `d: f16 | s: f16 | qs: [i8; 32]` = 36 bytes. `s` only speeds up dot
/// products and does not affect the dequantized values.
pub struct BlockQ8_1;

impl BlockFormat for BlockQ8_1 {
    const DTYPE: GgufTensorType = GgufTensorType::Q8_1;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        for (y, &q) in out.iter_mut().zip(&block[4..4 + QK8_0]) {
            *y = q as i8 as f32 * d;
        }
    }
}

// ---------------------------------------------------------------------------
// 4-bit formats
// ---------------------------------------------------------------------------

/// Q4_0 block: 4-bit signed quantization with a single f16 scale factor.
///
/// Layout: `d: f16 (2 bytes) | qs: [u8; 16] (16 bytes)` = 18 bytes total.
/// Byte `j` of `qs` holds element `2j` in its low nibble and element `2j + 1`
/// in its high nibble. Nibbles are two's complement in [-8, 7].
/// Dequantization: `y[i] = code[i] * d`
pub struct BlockQ4_0;

impl BlockFormat for BlockQ4_0 {
    const DTYPE: GgufTensorType = GgufTensorType::Q4_0;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        let qs = &block[2..2 + QK4_0 / 2];
        for (pair, &b) in out.chunks_exact_mut(2).zip(qs) {
            pair[0] = signed_code(b & 0x0F, 4) as f32 * d;
            pair[1] = signed_code(b >> 4, 4) as f32 * d;
        }
    }
}

/// Q4_1 block: 4-bit unsigned quantization with f16 scale (d) and minimum (m).
///
/// Layout: `d: f16 | m: f16 | qs: [u8; 16]` = 20 bytes. Same nibble order as
/// Q4_0, codes in [0, 15].
/// Dequantization: `y[i] = code[i] * d + m`
pub struct BlockQ4_1;

impl BlockFormat for BlockQ4_1 {
    const DTYPE: GgufTensorType = GgufTensorType::Q4_1;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        let m = read_f16(block, 2);
        let qs = &block[4..4 + QK4_0 / 2];
        for (pair, &b) in out.chunks_exact_mut(2).zip(qs) {
            pair[0] = (b & 0x0F) as f32 * d + m;
            pair[1] = (b >> 4) as f32 * d + m;
        }
    }
}

// ---------------------------------------------------------------------------
// 5-bit formats
// ---------------------------------------------------------------------------

/// Assemble the 5-bit code of element `i` from the nibble plane and the
/// 32-bit high-bit plane (bit `i` belongs to element `i`).
#[inline]
fn code5(qs: &[u8], qh: u32, i: usize) -> u8 {
    let b = qs[i / 2];
    let low = if i % 2 == 0 { b & 0x0F } else { b >> 4 };
    let high = ((qh >> i) & 1) as u8;
    low | (high << 4)
}

/// Q5_0 block: 5-bit signed quantization with f16 scale (d), no minimum.
///
/// Layout: `d: f16 (2 bytes) | qh: u32 LE (4 bytes) | qs: [u8; 16] (16 bytes)` = 22 bytes.
/// Codes are two's complement in [-16, 15].
/// Dequantization: `y[i] = code[i] * d`
pub struct BlockQ5_0;

impl BlockFormat for BlockQ5_0 {
    const DTYPE: GgufTensorType = GgufTensorType::Q5_0;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        let qh = u32::from_le_bytes([block[2], block[3], block[4], block[5]]);
        let qs = &block[6..6 + QK4_0 / 2];
        for (i, y) in out.iter_mut().enumerate() {
            *y = signed_code(code5(qs, qh, i), 5) as f32 * d;
        }
    }
}

/// Q5_1 block: 5-bit unsigned quantization with f16 scale (d) and minimum (m).
///
/// Layout: `d: f16 | m: f16 | qh: u32 LE | qs: [u8; 16]` = 24 bytes.
/// Dequantization: `y[i] = code[i] * d + m`, codes in [0, 31]
pub struct BlockQ5_1;

impl BlockFormat for BlockQ5_1 {
    const DTYPE: GgufTensorType = GgufTensorType::Q5_1;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        let m = read_f16(block, 2);
        let qh = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
        let qs = &block[8..8 + QK4_0 / 2];
        for (i, y) in out.iter_mut().enumerate() {
            *y = code5(qs, qh, i) as f32 * d + m;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DequantError;
    use crate::quant::{BlockDecoder, Decoder};

    fn f16_bits(v: f32) -> [u8; 2] {
        half::f16::from_f32(v).to_bits().to_le_bytes()
    }

    fn q8_0_block(d: f32, qs: [i8; 32]) -> Vec<u8> {
        let mut b = f16_bits(d).to_vec();
        b.extend(qs.iter().map(|&q| q as u8));
        b
    }

    fn q4_0_block(d: f32, qs: [u8; 16]) -> Vec<u8> {
        let mut b = f16_bits(d).to_vec();
        b.extend_from_slice(&qs);
        b
    }

    fn decode<F: BlockFormat>(dims: &[u64], raw: &[u8]) -> Result<Vec<f32>, DequantError> {
        BlockDecoder::<F>::new().decode(dims, raw)
    }

    // -- Unquantized --

    #[test]
    fn test_f32_byte_copy() {
        let values = [1.0f32, -2.5, 0.0, f32::MAX, f32::MIN_POSITIVE];
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let out = decode::<BlockF32>(&[5], &raw).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn test_f16_elements() {
        let raw: Vec<u8> = [0x3C00u16, 0xC000, 0x0000, 0x7C00]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let out = decode::<BlockF16>(&[2, 2], &raw).unwrap();
        assert_eq!(out, vec![1.0, -2.0, 0.0, f32::INFINITY]);
    }

    #[test]
    fn test_bf16_elements() {
        let raw: Vec<u8> = [0x3F80u16, 0xBF00]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let out = decode::<BlockBF16>(&[2], &raw).unwrap();
        assert_eq!(out, vec![1.0, -0.5]);
    }

    #[test]
    fn test_f32_odd_length_has_no_padding() {
        let raw = vec![0u8; 4 * 37];
        assert_eq!(decode::<BlockF32>(&[37], &raw).unwrap().len(), 37);
    }

    // -- Q8_0 --

    #[test]
    fn test_q8_0_extremes() {
        let mut qs = [0i8; 32];
        qs[0] = -128;
        qs[1] = 127;
        let raw = q8_0_block(2.0, qs);
        let out = decode::<BlockQ8_0>(&[32], &raw).unwrap();
        assert_eq!(out[0], -256.0);
        assert_eq!(out[1], 254.0);
        assert!(out[2..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_q8_0_zero_scale() {
        let raw = q8_0_block(0.0, [127; 32]);
        let out = decode::<BlockQ8_0>(&[32], &raw).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_q8_0_negative_scale() {
        let raw = q8_0_block(-0.5, [4; 32]);
        let out = decode::<BlockQ8_0>(&[32], &raw).unwrap();
        assert!(out.iter().all(|&v| v == -2.0));
    }

    #[test]
    fn test_q8_0_multiple_blocks() {
        let mut raw = q8_0_block(1.0, [1; 32]);
        raw.extend(q8_0_block(2.0, [1; 32]));
        let out = decode::<BlockQ8_0>(&[2, 32], &raw).unwrap();
        assert_eq!(out.len(), 64);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[32], 2.0);
    }

    #[test]
    fn test_q8_0_partial_trailing_block() {
        let mut first = [0i8; 32];
        first[31] = 3;
        let mut second = [0i8; 32];
        for (i, q) in second.iter_mut().enumerate() {
            *q = i as i8 + 1;
        }
        let mut raw = q8_0_block(1.0, first);
        raw.extend(q8_0_block(0.5, second));
        assert_eq!(raw.len(), 68);

        let out = decode::<BlockQ8_0>(&[37], &raw).unwrap();
        assert_eq!(out.len(), 37);
        assert_eq!(out[31], 3.0);
        // Only the first 5 codes of the second block are live
        assert_eq!(&out[32..], &[0.5, 1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn test_q8_0_partial_block_still_needs_full_stride() {
        // 37 elements with only 32 + 5 code bytes is short by 27 bytes
        let mut raw = q8_0_block(1.0, [0; 32]);
        raw.extend_from_slice(&f16_bits(1.0));
        raw.extend_from_slice(&[0; 5]);
        let err = decode::<BlockQ8_0>(&[37], &raw).unwrap_err();
        assert_eq!(
            err,
            DequantError::SizeMismatch {
                dtype: GgufTensorType::Q8_0,
                expected: 68,
                actual: 41,
            }
        );
    }

    // -- Q8_1 --

    #[test]
    fn test_q8_1_ignores_sum() {
        let mut raw = f16_bits(0.5).to_vec();
        raw.extend_from_slice(&f16_bits(1234.0));
        raw.extend((0..32).map(|i| (i as i8 - 16) as u8));
        let out = decode::<BlockQ8_1>(&[32], &raw).unwrap();
        assert_eq!(out[0], -8.0);
        assert_eq!(out[16], 0.0);
        assert_eq!(out[31], 7.5);
    }

    // -- Q4_0 --

    #[test]
    fn test_q4_0_nibble_ordering() {
        let mut qs = [0u8; 16];
        qs[0] = 0x1F;
        let raw = q4_0_block(1.0, qs);
        let out = decode::<BlockQ4_0>(&[32], &raw).unwrap();
        // Low nibble 0xF -> -1 (element 0), high nibble 0x1 -> 1 (element 1)
        assert_eq!(out[0], -1.0);
        assert_eq!(out[1], 1.0);
        assert!(out[2..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_q4_0_all_nibble_values() {
        // Byte j packs codes 2j and 2j+1 for raw nibbles 0..16
        let mut qs = [0u8; 16];
        for (j, b) in qs.iter_mut().enumerate().take(8) {
            let lo = (2 * j) as u8;
            let hi = (2 * j + 1) as u8;
            *b = lo | (hi << 4);
        }
        let raw = q4_0_block(1.0, qs);
        let out = decode::<BlockQ4_0>(&[32], &raw).unwrap();
        let expected: Vec<f32> = (0..16u8)
            .map(|n| if n < 8 { n as f32 } else { n as f32 - 16.0 })
            .collect();
        assert_eq!(&out[..16], expected.as_slice());
    }

    #[test]
    fn test_q4_0_scale() {
        let raw = q4_0_block(0.25, [0x77; 16]);
        let out = decode::<BlockQ4_0>(&[32], &raw).unwrap();
        assert!(out.iter().all(|&v| v == 1.75));
    }

    #[test]
    fn test_q4_0_partial_block() {
        let mut qs = [0u8; 16];
        qs[2] = 0x21; // elements 4, 5
        let raw = q4_0_block(1.0, qs);
        let out = decode::<BlockQ4_0>(&[5], &raw).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    // -- Q4_1 --

    #[test]
    fn test_q4_1_basic() {
        let mut raw = f16_bits(0.5).to_vec();
        raw.extend_from_slice(&f16_bits(-1.0));
        let mut qs = [0u8; 16];
        qs[0] = 0xF0; // element 0 -> 0, element 1 -> 15
        raw.extend_from_slice(&qs);
        let out = decode::<BlockQ4_1>(&[32], &raw).unwrap();
        assert_eq!(out[0], -1.0);
        assert_eq!(out[1], 6.5);
        assert_eq!(out[2], -1.0);
    }

    // -- Q5_0 --

    fn q5_block(d: f32, m: Option<f32>, qh: u32, qs: [u8; 16]) -> Vec<u8> {
        let mut b = f16_bits(d).to_vec();
        if let Some(m) = m {
            b.extend_from_slice(&f16_bits(m));
        }
        b.extend_from_slice(&qh.to_le_bytes());
        b.extend_from_slice(&qs);
        b
    }

    #[test]
    fn test_q5_0_zero() {
        let raw = q5_block(1.0, None, 0, [0; 16]);
        let out = decode::<BlockQ5_0>(&[32], &raw).unwrap();
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_q5_0_high_bit_makes_negative() {
        // Element 0: nibble 0, high bit set -> 16 -> -16
        // Element 1: nibble 0xF, high bit clear -> 15
        // Element 31: nibble 0xF, high bit set -> 31 -> -1
        let mut qs = [0u8; 16];
        qs[0] = 0xF0;
        qs[15] = 0xF0;
        let qh = 1u32 | (1 << 31);
        let raw = q5_block(2.0, None, qh, qs);
        let out = decode::<BlockQ5_0>(&[32], &raw).unwrap();
        assert_eq!(out[0], -32.0);
        assert_eq!(out[1], 30.0);
        assert_eq!(out[30], 0.0);
        assert_eq!(out[31], -2.0);
    }

    #[test]
    fn test_q5_0_high_bit_plane_is_little_endian() {
        // Bit 8 lives in byte 1 of the plane and belongs to element 8.
        let raw = q5_block(1.0, None, 1 << 8, [0; 16]);
        let out = decode::<BlockQ5_0>(&[32], &raw).unwrap();
        assert_eq!(raw[3], 0x01);
        assert_eq!(out[8], -16.0);
        assert_eq!(out.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    // -- Q5_1 --

    #[test]
    fn test_q5_1_with_high_bits_and_min() {
        let mut qs = [0u8; 16];
        qs[0] = 0x3F; // element 0 nibble 15, element 1 nibble 3
        let qh = 0b11u32;
        let raw = q5_block(1.0, Some(0.5), qh, qs);
        let out = decode::<BlockQ5_1>(&[32], &raw).unwrap();
        assert_eq!(out[0], 31.5);
        assert_eq!(out[1], 19.5);
        assert_eq!(out[2], 0.5);
    }
}
