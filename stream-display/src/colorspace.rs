//! YUV to RGB conversion parameters.
//!
//! Matrices are column-major (GLSL `mat3` order): the first column holds the
//! luma coefficients for R, G and B, the second the Cb coefficients and the
//! third the Cr coefficients. Chroma is centred separately in the shader, so
//! the offset vector only carries the limited-range luma black level.

use tracing::{info, warn};

/// Colour primaries and transfer matrix of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Bt601,
    Bt709,
    Bt2020,
    /// Untagged or a matrix this renderer has no table for.
    Unknown,
}

impl ColorSpace {
    /// Map a libavutil `AVColorSpace` value.
    pub fn from_av(value: i32) -> Self {
        match value {
            1 => ColorSpace::Bt709,
            // BT470BG, SMPTE170M
            5 | 6 => ColorSpace::Bt601,
            // BT2020 NCL and CL
            9 | 10 => ColorSpace::Bt2020,
            _ => ColorSpace::Unknown,
        }
    }
}

/// Sample value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorRange {
    /// Luma 16..=235, chroma 16..=240.
    #[default]
    Limited,
    /// Full 0..=255.
    Full,
}

impl ColorRange {
    /// Map a libavutil `AVColorRange` value; only JPEG range is full.
    pub fn from_av(value: i32) -> Self {
        if value == 2 {
            ColorRange::Full
        } else {
            ColorRange::Limited
        }
    }
}

/// Chroma midpoint subtracted from both chroma samples.
pub const CHROMA_CENTER: f32 = 128.0 / 255.0;

const LIMITED_LUMA_OFFSET: [f32; 3] = [16.0 / 255.0, 0.0, 0.0];
const FULL_OFFSET: [f32; 3] = [0.0, 0.0, 0.0];

#[rustfmt::skip]
const BT601_LIMITED: [f32; 9] = [
    1.1644, 1.1644, 1.1644,
    0.0, -0.3918, 2.0172,
    1.5960, -0.8130, 0.0,
];

#[rustfmt::skip]
const BT601_FULL: [f32; 9] = [
    1.0, 1.0, 1.0,
    0.0, -0.3441, 1.7720,
    1.4020, -0.7141, 0.0,
];

#[rustfmt::skip]
const BT709_LIMITED: [f32; 9] = [
    1.1644, 1.1644, 1.1644,
    0.0, -0.2132, 2.1124,
    1.7927, -0.5329, 0.0,
];

#[rustfmt::skip]
const BT709_FULL: [f32; 9] = [
    1.0, 1.0, 1.0,
    0.0, -0.1873, 1.8556,
    1.5748, -0.4681, 0.0,
];

#[rustfmt::skip]
const BT2020_LIMITED: [f32; 9] = [
    1.1644, 1.1644, 1.1644,
    0.0, -0.1873, 2.1418,
    1.6787, -0.6504, 0.0,
];

#[rustfmt::skip]
const BT2020_FULL: [f32; 9] = [
    1.0, 1.0, 1.0,
    0.0, -0.1646, 1.8814,
    1.4746, -0.5714, 0.0,
];

/// Matrix and offsets for one stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionParams {
    pub space: ColorSpace,
    pub range: ColorRange,
    pub matrix: [f32; 9],
    pub offsets: [f32; 3],
}

impl ConversionParams {
    /// Pick the conversion for a stream. Unknown colorspaces use BT.601
    /// limited regardless of the range tag.
    pub fn select(space: ColorSpace, range: ColorRange) -> Self {
        let (space, range) = match space {
            ColorSpace::Unknown => {
                warn!(?range, "Unknown colorspace, assuming BT.601 limited range");
                (ColorSpace::Bt601, ColorRange::Limited)
            }
            known => (known, range),
        };

        let matrix = match (space, range) {
            (ColorSpace::Bt709, ColorRange::Limited) => BT709_LIMITED,
            (ColorSpace::Bt709, ColorRange::Full) => BT709_FULL,
            (ColorSpace::Bt2020, ColorRange::Limited) => BT2020_LIMITED,
            (ColorSpace::Bt2020, ColorRange::Full) => BT2020_FULL,
            (_, ColorRange::Full) => BT601_FULL,
            (_, ColorRange::Limited) => BT601_LIMITED,
        };
        let offsets = match range {
            ColorRange::Limited => LIMITED_LUMA_OFFSET,
            ColorRange::Full => FULL_OFFSET,
        };

        info!(?space, ?range, "Selected colour conversion");
        Self {
            space,
            range,
            matrix,
            offsets,
        }
    }

    /// Convert one 8-bit YUV sample to RGB in `0.0..=1.0`, the same way the
    /// fragment shader does.
    pub fn convert(&self, y: u8, cb: u8, cr: u8) -> [f32; 3] {
        let yuv = [
            f32::from(y) / 255.0 - self.offsets[0],
            f32::from(cb) / 255.0 - self.offsets[1] - CHROMA_CENTER,
            f32::from(cr) / 255.0 - self.offsets[2] - CHROMA_CENTER,
        ];
        let m = &self.matrix;
        let mut rgb = [0.0f32; 3];
        for (row, out) in rgb.iter_mut().enumerate() {
            let v = m[row] * yuv[0] + m[3 + row] * yuv[1] + m[6 + row] * yuv[2];
            *out = v.clamp(0.0, 1.0);
        }
        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 0.01)
    }

    #[test]
    fn test_bt709_full_uses_zero_offsets() {
        let p = ConversionParams::select(ColorSpace::Bt709, ColorRange::Full);
        assert_eq!(p.matrix, BT709_FULL);
        assert_eq!(p.offsets, [0.0, 0.0, 0.0]);
        assert_ne!(p.offsets, LIMITED_LUMA_OFFSET);
    }

    #[test]
    fn test_every_tagged_combination() {
        let cases = [
            (ColorSpace::Bt601, ColorRange::Limited, BT601_LIMITED),
            (ColorSpace::Bt601, ColorRange::Full, BT601_FULL),
            (ColorSpace::Bt709, ColorRange::Limited, BT709_LIMITED),
            (ColorSpace::Bt709, ColorRange::Full, BT709_FULL),
            (ColorSpace::Bt2020, ColorRange::Limited, BT2020_LIMITED),
            (ColorSpace::Bt2020, ColorRange::Full, BT2020_FULL),
        ];
        for (space, range, matrix) in cases {
            let p = ConversionParams::select(space, range);
            assert_eq!((p.space, p.range), (space, range));
            assert_eq!(p.matrix, matrix);
        }
    }

    /// Column-major YCbCr to RGB matrix from the luma coefficients.
    fn derived(kr: f64, kb: f64, range: ColorRange) -> [f32; 9] {
        let kg = 1.0 - kr - kb;
        let (ys, cs) = match range {
            ColorRange::Limited => (255.0 / 219.0, 255.0 / 224.0),
            ColorRange::Full => (1.0, 1.0),
        };
        [
            ys,
            ys,
            ys,
            0.0,
            -2.0 * (1.0 - kb) * kb / kg * cs,
            2.0 * (1.0 - kb) * cs,
            2.0 * (1.0 - kr) * cs,
            -2.0 * (1.0 - kr) * kr / kg * cs,
            0.0,
        ]
        .map(|v| v as f32)
    }

    #[test]
    fn test_matrices_match_luma_coefficients() {
        let cases = [
            (0.299, 0.114, BT601_LIMITED, BT601_FULL),
            (0.2126, 0.0722, BT709_LIMITED, BT709_FULL),
            (0.2627, 0.0593, BT2020_LIMITED, BT2020_FULL),
        ];
        for (kr, kb, limited, full) in cases {
            for (range, table) in [(ColorRange::Limited, limited), (ColorRange::Full, full)] {
                let expected = derived(kr, kb, range);
                for (i, (got, want)) in table.iter().zip(expected).enumerate() {
                    assert!(
                        (got - want).abs() < 1e-4,
                        "kr={kr} {range:?} entry {i}: {got} vs {want}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_bt2020_limited_red_from_cr() {
        let p = ConversionParams::select(ColorSpace::Bt2020, ColorRange::Limited);
        assert_eq!(p.matrix[6], 1.6787);
    }

    #[test]
    fn test_unknown_falls_back_to_bt601_limited() {
        let p = ConversionParams::select(ColorSpace::Unknown, ColorRange::Full);
        assert_eq!(p.space, ColorSpace::Bt601);
        assert_eq!(p.range, ColorRange::Limited);
        assert_eq!(p.matrix, BT601_LIMITED);
        assert_eq!(p.offsets, LIMITED_LUMA_OFFSET);
    }

    #[test]
    fn test_black_and_white_levels() {
        let limited = ConversionParams::select(ColorSpace::Bt709, ColorRange::Limited);
        assert!(close(limited.convert(16, 128, 128), [0.0, 0.0, 0.0]));
        assert!(close(limited.convert(235, 128, 128), [1.0, 1.0, 1.0]));

        let full = ConversionParams::select(ColorSpace::Bt601, ColorRange::Full);
        assert!(close(full.convert(0, 128, 128), [0.0, 0.0, 0.0]));
        assert!(close(full.convert(255, 128, 128), [1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_saturated_red_bt601_full() {
        // BT.601 full-range encoding of pure red
        let p = ConversionParams::select(ColorSpace::Bt601, ColorRange::Full);
        assert!(close(p.convert(76, 85, 255), [1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_av_tags() {
        assert_eq!(ColorSpace::from_av(1), ColorSpace::Bt709);
        assert_eq!(ColorSpace::from_av(6), ColorSpace::Bt601);
        assert_eq!(ColorSpace::from_av(9), ColorSpace::Bt2020);
        assert_eq!(ColorSpace::from_av(2), ColorSpace::Unknown);
        assert_eq!(ColorRange::from_av(2), ColorRange::Full);
        assert_eq!(ColorRange::from_av(0), ColorRange::Limited);
    }
}
