//! Per-pixel luminance and whole-page luminance statistics.
//!
//! Luminance uses the perceptual weights 0.21 / 0.71 / 0.07. Those weights
//! sum to 0.99, so the weighted sum is divided by 0.99 before rounding: pure
//! white lands on 255 rather than 252, and the full `u8` range stays usable
//! by the normalizer and the binarizers.

use image::{Rgb, RgbImage};

const WEIGHT_R: f64 = 0.21;
const WEIGHT_G: f64 = 0.71;
const WEIGHT_B: f64 = 0.07;
const WEIGHT_SUM: f64 = WEIGHT_R + WEIGHT_G + WEIGHT_B;

/// Number of luminance buckets in a page histogram.
pub const LUMINANCE_LEVELS: usize = 256;

/// Luminance of one RGB pixel, rounded half-up and clamped to `[0, 255]`.
#[inline]
pub fn luminance(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0;
    let weighted = WEIGHT_R * f64::from(r) + WEIGHT_G * f64::from(g) + WEIGHT_B * f64::from(b);
    (weighted / WEIGHT_SUM + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// Count of pixels per luminance value.
pub fn histogram(page: &RgbImage) -> [u64; LUMINANCE_LEVELS] {
    let mut buckets = [0u64; LUMINANCE_LEVELS];
    for pixel in page.pixels() {
        buckets[luminance(*pixel) as usize] += 1;
    }
    buckets
}

/// Brightness statistics of a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStatistics {
    /// Darkest luminance present on the page; 255 for a page without pixels.
    pub min_luminance: u8,
    /// Brightest luminance present on the page; 0 for a page without pixels.
    pub max_luminance: u8,
    /// Lower weighted median: the smallest luminance whose cumulative pixel
    /// count reaches `⌊pixel_count / 2⌋`. 0 for a page without pixels.
    pub median_luminance: u8,
    /// Number of pixels the statistics were computed over.
    pub pixel_count: u64,
}

impl PageStatistics {
    /// Compute the statistics of `page` from its luminance histogram.
    pub fn of(page: &RgbImage) -> Self {
        Self::from_histogram(&histogram(page))
    }

    /// True when every pixel has the same luminance, or there are no pixels.
    pub fn is_uniform(&self) -> bool {
        self.max_luminance <= self.min_luminance
    }

    /// Derive the statistics from an existing histogram.
    ///
    /// An empty histogram yields `min = 255, max = 0, median = 0`: the
    /// extremum searches find no populated bucket, while a half-count of zero
    /// is reached at the very first bucket.
    pub fn from_histogram(buckets: &[u64; LUMINANCE_LEVELS]) -> Self {
        let pixel_count: u64 = buckets.iter().sum();
        let middle = pixel_count / 2;

        let mut min_luminance = u8::MAX;
        let mut max_luminance = 0u8;
        let mut median_luminance = None;
        let mut cumulative = 0u64;

        for (level, &count) in buckets.iter().enumerate() {
            if count > 0 {
                min_luminance = min_luminance.min(level as u8);
                max_luminance = level as u8;
            }
            cumulative += count;
            if median_luminance.is_none() && cumulative >= middle {
                median_luminance = Some(level as u8);
            }
        }

        Self {
            min_luminance,
            max_luminance,
            median_luminance: median_luminance.unwrap_or(0),
            pixel_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(lums: &[u8]) -> RgbImage {
        RgbImage::from_fn(lums.len() as u32, 1, |x, _| {
            let v = lums[x as usize];
            Rgb([v, v, v])
        })
    }

    #[test]
    fn luminance_extremes() {
        assert_eq!(luminance(Rgb([255, 255, 255])), 255);
        assert_eq!(luminance(Rgb([0, 0, 0])), 0);
    }

    #[test]
    fn gray_pixels_keep_their_level() {
        for v in 0..=255u8 {
            assert_eq!(luminance(Rgb([v, v, v])), v, "gray level {v}");
        }
    }

    #[test]
    fn green_dominates() {
        let red = luminance(Rgb([255, 0, 0]));
        let green = luminance(Rgb([0, 255, 0]));
        let blue = luminance(Rgb([0, 0, 255]));
        assert!(green > red && red > blue, "r={red} g={green} b={blue}");
        assert_eq!(red, 54);
        assert_eq!(green, 183);
        assert_eq!(blue, 18);
    }

    #[test]
    fn luminance_stays_in_range_for_sampled_triples() {
        // Coarse grid over the RGB cube, including both ends of every channel.
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(15) {
                for b in (0..=255u16).step_by(15) {
                    let lum = luminance(Rgb([r as u8, g as u8, b as u8]));
                    let max = r.max(g).max(b) as u8;
                    let min = r.min(g).min(b) as u8;
                    assert!(lum >= min && lum <= max, "({r},{g},{b}) -> {lum}");
                }
            }
        }
    }

    #[test]
    fn histogram_counts_every_pixel() {
        let page = page_of(&[0, 0, 10, 255]);
        let h = histogram(&page);
        assert_eq!(h[0], 2);
        assert_eq!(h[10], 1);
        assert_eq!(h[255], 1);
        assert_eq!(h.iter().sum::<u64>(), 4);
    }

    #[test]
    fn statistics_min_and_lower_median() {
        let page = page_of(&[200, 50, 90, 120, 250, 30]);
        let stats = PageStatistics::of(&page);
        assert_eq!(stats.min_luminance, 30);
        assert_eq!(stats.max_luminance, 250);
        // 6 pixels → half = 3; sorted 30, 50, 90 … → third value is 90
        assert_eq!(stats.median_luminance, 90);
        assert_eq!(stats.pixel_count, 6);
    }

    #[test]
    fn median_matches_brute_force_definition() {
        let cases: [&[u8]; 5] = [
            &[7],
            &[7, 3],
            &[1, 2, 3, 4, 5],
            &[255, 255, 0, 0, 0, 128, 64],
            &[9, 9, 9, 9, 200, 201, 202, 203, 204],
        ];
        for lums in cases {
            let stats = PageStatistics::of(&page_of(lums));
            let half = lums.len() as u64 / 2;
            let expected = (0..=255u8)
                .find(|&i| lums.iter().filter(|&&l| l <= i).count() as u64 >= half)
                .unwrap();
            assert_eq!(stats.median_luminance, expected, "{lums:?}");
            assert_eq!(stats.min_luminance, *lums.iter().min().unwrap(), "{lums:?}");
        }
    }

    #[test]
    fn single_pixel_median_is_zero() {
        // ⌊1/2⌋ = 0, so the very first bucket already satisfies the median.
        let stats = PageStatistics::of(&page_of(&[180]));
        assert_eq!(stats.median_luminance, 0);
        assert_eq!(stats.min_luminance, 180);
    }

    #[test]
    fn empty_page_convention() {
        let stats = PageStatistics::of(&RgbImage::new(0, 0));
        assert_eq!(stats.min_luminance, 255);
        assert_eq!(stats.max_luminance, 0);
        assert_eq!(stats.median_luminance, 0);
        assert_eq!(stats.pixel_count, 0);
        assert!(stats.is_uniform());
    }

    #[test]
    fn uniform_page_has_equal_min_and_median() {
        let page = RgbImage::from_pixel(8, 8, Rgb([128, 128, 128]));
        let stats = PageStatistics::of(&page);
        assert_eq!(stats.min_luminance, 128);
        assert_eq!(stats.median_luminance, 128);
        assert!(stats.is_uniform());
    }

    #[test]
    fn majority_at_minimum_is_not_uniform() {
        let stats = PageStatistics::of(&page_of(&[40, 40, 40, 220]));
        assert_eq!((stats.min_luminance, stats.median_luminance), (40, 40));
        assert!(!stats.is_uniform());
    }
}
