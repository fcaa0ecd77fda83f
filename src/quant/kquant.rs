// K-quant super-block formats (256 elements per block)
//
// Layouts follow ggml's block_q*_K structs; all multi-byte fields are
// little-endian.

use super::f16::read_f16;
use super::scales::unpack_scale_min_k4;
use super::BlockFormat;
use crate::gguf::{GgufTensorType, K_SCALE_SIZE, QK_K};

// ---------------------------------------------------------------------------
// Q2_K: 84 bytes per super-block
// ---------------------------------------------------------------------------

/// Q2_K block: 2-bit quants in 16 sub-blocks of 16 values.
///
/// Layout: `scales: [u8; 16] | qs: [u8; 64] | d: f16 | dmin: f16` = 84 bytes.
/// Each scale byte holds a 4-bit scale (low nibble) and 4-bit min (high nibble).
/// `y = d * scale * q - dmin * min`
pub struct BlockQ2K;

impl BlockFormat for BlockQ2K {
    const DTYPE: GgufTensorType = GgufTensorType::Q2K;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let scales = &block[..QK_K / 16];
        let qs = &block[QK_K / 16..QK_K / 16 + QK_K / 4];
        let d = read_f16(block, 80);
        let dmin = read_f16(block, 82);

        let mut is = 0usize;
        let mut y = 0usize;
        for n in (0..QK_K).step_by(128) {
            // 32 bytes of qs carry four 2-bit planes of 32 values each.
            let q = &qs[n / 4..n / 4 + 32];
            for shift in (0..8).step_by(2) {
                for part in [&q[..16], &q[16..]] {
                    let sc = scales[is];
                    is += 1;
                    let dl = d * (sc & 0xF) as f32;
                    let ml = dmin * (sc >> 4) as f32;
                    for &b in part {
                        out[y] = dl * ((b >> shift) & 3) as f32 - ml;
                        y += 1;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Q4_K: 144 bytes per super-block
// ---------------------------------------------------------------------------

/// Q4_K block: 4-bit quants with 6-bit packed scales and mins.
///
/// Layout: `d: f16 | dmin: f16 | scales: [u8; 12] | qs: [u8; 128]` = 144 bytes.
/// 8 sub-blocks of 32 values. The 32 bytes at `qs[32j..]` hold sub-block `2j`
/// in their low nibbles and sub-block `2j + 1` in their high nibbles.
/// `y = d * scale[sub] * q - dmin * min[sub]`
pub struct BlockQ4K;

impl BlockFormat for BlockQ4K {
    const DTYPE: GgufTensorType = GgufTensorType::Q4K;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        let dmin = read_f16(block, 2);
        let (sc, mn) = unpack_scale_min_k4(&packed_scales(block, 4));
        let qs = &block[4 + K_SCALE_SIZE..4 + K_SCALE_SIZE + QK_K / 2];

        for (j, (q, y)) in qs.chunks_exact(32).zip(out.chunks_exact_mut(64)).enumerate() {
            let (d1, m1) = (d * sc[2 * j] as f32, dmin * mn[2 * j] as f32);
            let (d2, m2) = (d * sc[2 * j + 1] as f32, dmin * mn[2 * j + 1] as f32);
            let (lo, hi) = y.split_at_mut(32);
            for l in 0..32 {
                lo[l] = d1 * (q[l] & 0xF) as f32 - m1;
                hi[l] = d2 * (q[l] >> 4) as f32 - m2;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Q5_K: 176 bytes per super-block
// ---------------------------------------------------------------------------

/// Q5_K block: 5-bit quants with 6-bit packed scales and mins.
///
/// Layout: `d: f16 | dmin: f16 | scales: [u8; 12] | qh: [u8; 32] | qs: [u8; 128]`
/// = 176 bytes. Low nibbles are arranged as in Q4_K; bit `s` of `qh[l]` is the
/// fifth bit of value `l` in sub-block `s`.
pub struct BlockQ5K;

impl BlockFormat for BlockQ5K {
    const DTYPE: GgufTensorType = GgufTensorType::Q5K;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = read_f16(block, 0);
        let dmin = read_f16(block, 2);
        let (sc, mn) = unpack_scale_min_k4(&packed_scales(block, 4));
        let qh_start = 4 + K_SCALE_SIZE;
        let qh = &block[qh_start..qh_start + QK_K / 8];
        let qs = &block[qh_start + QK_K / 8..qh_start + QK_K / 8 + QK_K / 2];

        for (j, (q, y)) in qs.chunks_exact(32).zip(out.chunks_exact_mut(64)).enumerate() {
            let (d1, m1) = (d * sc[2 * j] as f32, dmin * mn[2 * j] as f32);
            let (d2, m2) = (d * sc[2 * j + 1] as f32, dmin * mn[2 * j + 1] as f32);
            let u1 = 1u8 << (2 * j);
            let u2 = 1u8 << (2 * j + 1);
            let (lo, hi) = y.split_at_mut(32);
            for l in 0..32 {
                let h1 = if qh[l] & u1 != 0 { 16 } else { 0 };
                let h2 = if qh[l] & u2 != 0 { 16 } else { 0 };
                lo[l] = d1 * ((q[l] & 0xF) | h1) as f32 - m1;
                hi[l] = d2 * ((q[l] >> 4) | h2) as f32 - m2;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Q6_K: 210 bytes per super-block
// ---------------------------------------------------------------------------

/// Q6_K block: 6-bit quants with 8-bit signed scales, no mins.
///
/// Layout: `ql: [u8; 128] | qh: [u8; 64] | scales: [i8; 16] | d: f16` = 210 bytes.
/// 16 sub-blocks of 16 values. Each value is 4 bits in ql plus 2 bits in qh.
/// `y = d * scale[sub] * (q - 32)`
pub struct BlockQ6K;

impl BlockFormat for BlockQ6K {
    const DTYPE: GgufTensorType = GgufTensorType::Q6K;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let ql = &block[..QK_K / 2];
        let qh = &block[QK_K / 2..QK_K / 2 + QK_K / 4];
        let sc = &block[QK_K / 2 + QK_K / 4..QK_K / 2 + QK_K / 4 + QK_K / 16];
        let d = read_f16(block, QK_K / 2 + QK_K / 4 + QK_K / 16);

        // Two halves of 128 values: 64 bytes of ql, 32 of qh, 8 scales each.
        for (n, y) in out.chunks_exact_mut(128).enumerate() {
            let ql = &ql[64 * n..64 * n + 64];
            let qh = &qh[32 * n..32 * n + 32];
            let sc = &sc[8 * n..8 * n + 8];
            let scale = |i: usize| d * (sc[i] as i8) as f32;

            for l in 0..32 {
                let is = l / 16;
                let q1 = ((ql[l] & 0xF) | ((qh[l] & 3) << 4)) as i32 - 32;
                let q2 = ((ql[l + 32] & 0xF) | (((qh[l] >> 2) & 3) << 4)) as i32 - 32;
                let q3 = ((ql[l] >> 4) | (((qh[l] >> 4) & 3) << 4)) as i32 - 32;
                let q4 = ((ql[l + 32] >> 4) | (((qh[l] >> 6) & 3) << 4)) as i32 - 32;

                y[l] = scale(is) * q1 as f32;
                y[l + 32] = scale(is + 2) * q2 as f32;
                y[l + 64] = scale(is + 4) * q3 as f32;
                y[l + 96] = scale(is + 6) * q4 as f32;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Q8_K: 292 bytes per super-block
// ---------------------------------------------------------------------------

/// Q8_K block: 8-bit quants with a single f32 scale.
///
/// Layout: `d: f32 | qs: [i8; 256] | bsums: [i16; 16]` = 292 bytes. `bsums`
/// caches per-16 sums for dot products and is not needed to dequantize.
/// `y = d * q`
pub struct BlockQ8K;

impl BlockFormat for BlockQ8K {
    const DTYPE: GgufTensorType = GgufTensorType::Q8K;

    fn decode_block(block: &[u8], out: &mut [f32]) {
        let d = f32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        for (y, &q) in out.iter_mut().zip(&block[4..4 + QK_K]) {
            *y = d * q as i8 as f32;
        }
    }
}

fn packed_scales(block: &[u8], offset: usize) -> [u8; K_SCALE_SIZE] {
    let mut scales = [0u8; K_SCALE_SIZE];
    scales.copy_from_slice(&block[offset..offset + K_SCALE_SIZE]);
    scales
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
