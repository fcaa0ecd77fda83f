// K-quant packed scale/min tables

use crate::gguf::K_SCALE_SIZE;

/// Extract the 6-bit scale and min of sub-block `j` (0..8) from the packed
/// Q4_K / Q5_K scales array.
///
/// Bit positions in the 12-byte array:
///
/// | j    | scale bits                          | min bits                            |
/// |------|-------------------------------------|-------------------------------------|
/// | 0..4 | `s[j] & 0x3F`                       | `s[j+4] & 0x3F`                     |
/// | 4..8 | `s[j+4] & 0x0F`, `s[j-4] >> 6` << 4 | `s[j+4] >> 4`, `s[j] >> 6` << 4     |
///
/// The upper four sub-blocks borrow their top two bits from the spare high
/// bits of bytes 0..8.
#[inline]
pub fn get_scale_min_k4(j: usize, scales: &[u8; K_SCALE_SIZE]) -> (u8, u8) {
    if j < 4 {
        (scales[j] & 63, scales[j + 4] & 63)
    } else {
        (
            (scales[j + 4] & 0xF) | ((scales[j - 4] >> 6) << 4),
            (scales[j + 4] >> 4) | ((scales[j] >> 6) << 4),
        )
    }
}

/// Unpack all eight (scale, min) pairs at once.
pub fn unpack_scale_min_k4(scales: &[u8; K_SCALE_SIZE]) -> ([u8; 8], [u8; 8]) {
    let mut sc = [0u8; 8];
    let mut mn = [0u8; 8];
    for j in 0..8 {
        let (s, m) = get_scale_min_k4(j, scales);
        sc[j] = s;
        mn[j] = m;
    }
    (sc, mn)
}

#[cfg(test)]
pub(crate) fn pack_scale_min_k4(sc: &[u8; 8], mn: &[u8; 8]) -> [u8; K_SCALE_SIZE] {
    let mut out = [0u8; K_SCALE_SIZE];
    for j in 0..4 {
        out[j] = (sc[j] & 63) | ((sc[j + 4] >> 4) << 6);
        out[j + 4] = (mn[j] & 63) | ((mn[j + 4] >> 4) << 6);
        out[j + 8] = (sc[j + 4] & 0xF) | ((mn[j + 4] & 0xF) << 4);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scale_min_k4_low_indices() {
        let mut scales = [0u8; 12];
        scales[0] = 0b11_000101; // scale 5, top bits feed sub-block 4
        scales[4] = 0b10_001001; // min 9, top bits feed sub-block 4
        assert_eq!(get_scale_min_k4(0, &scales), (5, 9));
    }

    #[test]
    fn test_get_scale_min_k4_high_indices() {
        let mut scales = [0u8; 12];
        scales[0] = 0b11_000000;
        scales[4] = 0b10_000000;
        scales[8] = 0x7A; // scale low = 0xA, min low = 0x7
        let (s, m) = get_scale_min_k4(4, &scales);
        assert_eq!(s, 0xA | (0b11 << 4));
        assert_eq!(m, 0x7 | (0b10 << 4));
    }

    #[test]
    fn test_unpack_all_zero() {
        let (sc, mn) = unpack_scale_min_k4(&[0u8; 12]);
        assert_eq!(sc, [0; 8]);
        assert_eq!(mn, [0; 8]);
    }

    #[test]
    fn test_unpack_all_ones() {
        let (sc, mn) = unpack_scale_min_k4(&[0xFF; 12]);
        assert_eq!(sc, [63; 8]);
        assert_eq!(mn, [63; 8]);
    }

    #[test]
    fn test_unpack_recovers_packed_values() {
        let sc = [0, 1, 17, 31, 32, 45, 62, 63];
        let mn = [63, 40, 33, 2, 7, 16, 48, 0];
        let packed = pack_scale_min_k4(&sc, &mn);
        assert_eq!(unpack_scale_min_k4(&packed), (sc, mn));
    }

    #[test]
    fn test_unpack_matches_single_lookup() {
        let packed = [0x9C, 0x41, 0xE7, 0x3B, 0x55, 0xAA, 0x0F, 0xF0, 0x12, 0x34, 0x56, 0x78];
        let (sc, mn) = unpack_scale_min_k4(&packed);
        for j in 0..8 {
            assert_eq!(get_scale_min_k4(j, &packed), (sc[j], mn[j]));
            assert!(sc[j] < 64 && mn[j] < 64);
        }
    }
}
