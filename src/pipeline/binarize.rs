//! Reduction of an RGB page to a 1-bit [`BinaryPage`].
//!
//! Two strategies:
//!
//! * [`threshold`]: black below a fixed 50% luminance cut, white otherwise.
//!   Deterministic.
//! * [`dither`]: per-pixel stochastic rule: with `r = luminance / 255` and a
//!   fresh uniform `u ∈ [0, 1)`, the pixel is black iff `r <= 0.99 · u`.
//!   Each pixel is decided on its own; nothing is diffused to neighbours.
//!   Because `0.99 · u < 1`, white pixels always stay white, and because
//!   `u >= 0`, black pixels always stay black.

use crate::config::Binarization;
use crate::pipeline::luminance::luminance;
use image::RgbImage;
use rand::Rng;
use std::fmt;

/// Luminance at and above which [`threshold`] produces white.
pub const THRESHOLD_CUT: u8 = 128;

/// Upper bound (exclusive) of the dithering threshold.
pub const DITHER_CEILING: f32 = 0.99;

/// A bi-level page: one bit per pixel, rows packed MSB-first, set bit = black.
///
/// Rows are padded to whole bytes; padding bits are always clear.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryPage {
    width: u32,
    height: u32,
    stride: usize,
    bits: Vec<u8>,
}

impl BinaryPage {
    /// An all-white page.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = (width as usize).div_ceil(8);
        Self {
            width,
            height,
            stride,
            bits: vec![0; stride * height as usize],
        }
    }

    /// Build a page by asking `is_black` about every pixel, row by row.
    pub fn from_fn(width: u32, height: u32, mut is_black: impl FnMut(u32, u32) -> bool) -> Self {
        let mut page = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if is_black(x, y) {
                    page.set(x, y, true);
                }
            }
        }
        page
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        let byte = self.bits[y as usize * self.stride + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, black: bool) {
        let idx = y as usize * self.stride + x as usize / 8;
        let mask = 0x80 >> (x % 8);
        if black {
            self.bits[idx] |= mask;
        } else {
            self.bits[idx] &= !mask;
        }
    }

    /// Packed bits of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.bits[start..start + self.stride]
    }

    pub fn black_pixels(&self) -> u64 {
        self.bits.iter().map(|b| u64::from(b.count_ones())).sum()
    }

    pub fn is_all_white(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    pub fn is_all_black(&self) -> bool {
        self.black_pixels() == u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Debug for BinaryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryPage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("black_pixels", &self.black_pixels())
            .finish()
    }
}

/// Nearest of black or white under a 50% luminance cut.
pub fn threshold(page: &RgbImage) -> BinaryPage {
    BinaryPage::from_fn(page.width(), page.height(), |x, y| {
        luminance(*page.get_pixel(x, y)) < THRESHOLD_CUT
    })
}

/// Per-pixel stochastic binarization driven by `rng`.
///
/// The generator is advanced exactly once per pixel, in row-major order, so a
/// seeded generator reproduces the same page.
pub fn dither<G: Rng>(page: &RgbImage, rng: &mut G) -> BinaryPage {
    BinaryPage::from_fn(page.width(), page.height(), |x, y| {
        let r = f32::from(luminance(*page.get_pixel(x, y))) / 255.0;
        r <= DITHER_CEILING * rng.gen::<f32>()
    })
}

/// Apply the strategy selected by `rule`.
pub fn binarize<G: Rng>(page: &RgbImage, rule: Binarization, rng: &mut G) -> BinaryPage {
    match rule {
        Binarization::Threshold => threshold(page),
        Binarization::Dither => dither(page, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform(v: u8, w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([v, v, v]))
    }

    #[test]
    fn new_page_is_white_with_padded_rows() {
        let page = BinaryPage::new(10, 3);
        assert_eq!(page.stride(), 2);
        assert!(page.is_all_white());
        assert_eq!(page.black_pixels(), 0);
    }

    #[test]
    fn set_and_get_pixels() {
        let mut page = BinaryPage::new(10, 2);
        page.set(0, 0, true);
        page.set(9, 1, true);
        assert!(page.is_black(0, 0));
        assert!(page.is_black(9, 1));
        assert!(!page.is_black(1, 0));
        assert_eq!(page.row(0), &[0b1000_0000, 0]);
        assert_eq!(page.row(1), &[0, 0b0100_0000]);
        page.set(0, 0, false);
        assert!(!page.is_black(0, 0));
        assert_eq!(page.black_pixels(), 1);
    }

    #[test]
    fn all_black_ignores_row_padding() {
        let page = BinaryPage::from_fn(3, 2, |_, _| true);
        assert!(page.is_all_black());
        assert_eq!(page.black_pixels(), 6);
    }

    #[test]
    fn threshold_cut_at_half_luminance() {
        let page = RgbImage::from_fn(4, 1, |x, _| {
            let v = [0, 127, 128, 255][x as usize];
            Rgb([v, v, v])
        });
        let out = threshold(&page);
        assert!(out.is_black(0, 0));
        assert!(out.is_black(1, 0));
        assert!(!out.is_black(2, 0));
        assert!(!out.is_black(3, 0));
    }

    #[test]
    fn threshold_is_deterministic() {
        let page = RgbImage::from_fn(33, 17, |x, y| Rgb([(x * 7) as u8, (y * 13) as u8, (x * y) as u8]));
        assert_eq!(threshold(&page), threshold(&page));
    }

    #[test]
    fn threshold_keeps_dimensions() {
        let out = threshold(&uniform(200, 13, 5));
        assert_eq!((out.width(), out.height()), (13, 5));
    }

    #[test]
    fn dither_white_page_stays_white() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = dither(&uniform(255, 64, 64), &mut rng);
        assert!(out.is_all_white());
    }

    #[test]
    fn dither_black_page_stays_black() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = dither(&uniform(0, 64, 64), &mut rng);
        assert!(out.is_all_black());
    }

    #[test]
    fn dither_density_tracks_luminance() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = dither(&uniform(128, 200, 200), &mut rng);
        // P(black) = P(u >= r / 0.99) = 1 - 0.502 / 0.99 ≈ 0.493
        let ratio = out.black_pixels() as f64 / 40_000.0;
        assert!((0.45..0.54).contains(&ratio), "black ratio {ratio}");

        let dark = dither(&uniform(40, 200, 200), &mut rng).black_pixels();
        let light = dither(&uniform(220, 200, 200), &mut rng).black_pixels();
        assert!(dark > light, "dark={dark} light={light}");
    }

    #[test]
    fn seeded_dither_is_reproducible() {
        let page = uniform(100, 50, 50);
        let a = dither(&page, &mut StdRng::seed_from_u64(99));
        let b = dither(&page, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn binarize_dispatches_by_rule() {
        let page = uniform(100, 8, 8);
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(binarize(&page, Binarization::Threshold, &mut rng), threshold(&page));
        let dithered = binarize(&page, Binarization::Dither, &mut rng);
        assert_eq!((dithered.width(), dithered.height()), (8, 8));
    }
}
