//! Row pitch helpers for texture-to-buffer copies.

use rayon::prelude::*;

pub fn align_to(value: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Row pitch wgpu accepts for a copy of `row_bytes`-wide rows.
pub fn padded_row_bytes(row_bytes: u32) -> u32 {
    align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Strips row padding from a mapped readback.
///
/// `rows` counts every row of every slice (height × depth). Rows are copied
/// in parallel; large volumes are hundreds of megabytes.
pub fn unpad_rows(padded: &[u8], row_bytes: u32, padded_bpr: u32, rows: u32) -> Vec<u8> {
    let row_bytes = row_bytes as usize;
    let padded_bpr = padded_bpr as usize;
    assert!(padded_bpr >= row_bytes);
    assert!(padded.len() >= padded_bpr * rows as usize);

    let mut out = vec![0u8; row_bytes * rows as usize];
    if row_bytes == 0 {
        return out;
    }
    out.par_chunks_mut(row_bytes).enumerate().for_each(|(row, dst)| {
        let src = row * padded_bpr;
        dst.copy_from_slice(&padded[src..src + row_bytes]);
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }

    #[test]
    fn test_padded_row_bytes() {
        // 64 RGBA8 texels = 256 bytes, already aligned.
        assert_eq!(padded_row_bytes(64 * 4), 256);
        assert_eq!(padded_row_bytes(17 * 4), 256);
        assert_eq!(padded_row_bytes(65 * 4), 512);
    }

    #[test]
    fn test_unpad_rows() {
        let row_bytes = 8u32;
        let padded_bpr = 256u32;
        let rows = 3u32;
        let mut padded = vec![0xAAu8; (padded_bpr * rows) as usize];
        for r in 0..rows as usize {
            for i in 0..row_bytes as usize {
                padded[r * padded_bpr as usize + i] = (r * 10 + i) as u8;
            }
        }

        let out = unpad_rows(&padded, row_bytes, padded_bpr, rows);
        assert_eq!(out.len(), 24);
        assert_eq!(&out[0..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(&out[8..16], &[10, 11, 12, 13, 14, 15, 16, 17]);
        assert_eq!(&out[16..24], &[20, 21, 22, 23, 24, 25, 26, 27]);
        assert!(!out.contains(&0xAA));
    }

    #[test]
    fn test_unpad_without_padding_is_identity() {
        let data: Vec<u8> = (0..=255).collect();
        let out = unpad_rows(&data, 256, 256, 1);
        assert_eq!(out, data);
    }
}
