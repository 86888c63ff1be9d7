//! Contrast stretch of a page between two luminance anchors.
//!
//! The page pipeline anchors black at the page's darkest luminance and white
//! at its lower weighted median (see [`PageStatistics`]). Everything at or
//! above the median becomes pure white and only the darker half of the page
//! is spread across the gray ramp.
//!
//! When the anchors coincide (more than half of the page sits at its darkest
//! level) the stretch collapses to a cut: pixels at the anchor become black
//! and everything brighter becomes white. A page with a single luminance has
//! nothing to cut and is reported as degenerate.

use crate::error::Pdf2FaxError;
use crate::pipeline::luminance::{luminance, PageStatistics, LUMINANCE_LEVELS};
use image::{Rgb, RgbImage};

/// Remap every pixel's luminance so that `black_lum` becomes 0 and
/// `white_lum` becomes 255, linearly in between. The result is gray
/// (R = G = B).
///
/// Equal anchors map `lum <= black_lum` to 0 and the rest to 255.
///
/// # Errors
/// [`Pdf2FaxError::DegenerateNormalization`] when `white_lum < black_lum`.
pub fn normalize(page: &RgbImage, white_lum: u8, black_lum: u8) -> Result<RgbImage, Pdf2FaxError> {
    let table = stretch_table(white_lum, black_lum)?;

    let mut out = RgbImage::new(page.width(), page.height());
    for (src, dst) in page.pixels().zip(out.pixels_mut()) {
        let v = table[luminance(*src) as usize];
        *dst = Rgb([v, v, v]);
    }
    Ok(out)
}

/// [`normalize`] with the anchors taken from the page's own statistics:
/// white = median luminance, black = minimum luminance.
///
/// # Errors
/// [`Pdf2FaxError::DegenerateNormalization`] for a uniform or empty page.
pub fn normalize_page(page: &RgbImage, stats: &PageStatistics) -> Result<RgbImage, Pdf2FaxError> {
    if stats.is_uniform() {
        return Err(Pdf2FaxError::DegenerateNormalization {
            white: stats.median_luminance,
            black: stats.min_luminance,
        });
    }
    normalize(page, stats.median_luminance, stats.min_luminance)
}

/// Output gray level for every input luminance.
fn stretch_table(white_lum: u8, black_lum: u8) -> Result<[u8; LUMINANCE_LEVELS], Pdf2FaxError> {
    if white_lum < black_lum {
        return Err(Pdf2FaxError::DegenerateNormalization {
            white: white_lum,
            black: black_lum,
        });
    }

    let span = f32::from(white_lum - black_lum);
    let mut table = [0u8; LUMINANCE_LEVELS];
    for (lum, out) in table.iter_mut().enumerate() {
        let lum = lum as u8;
        *out = if lum <= black_lum {
            0
        } else if lum >= white_lum {
            255
        } else {
            (f32::from(lum - black_lum) * 255.0 / span).round() as u8
        };
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(v: u8) -> Rgb<u8> {
        Rgb([v, v, v])
    }

    fn ramp() -> RgbImage {
        RgbImage::from_fn(256, 1, |x, _| gray(x as u8))
    }

    #[test]
    fn clamps_outside_anchors() {
        let out = normalize(&ramp(), 200, 40).unwrap();
        for x in 0..=40 {
            assert_eq!(*out.get_pixel(x, 0), gray(0), "lum {x}");
        }
        for x in 200..=255 {
            assert_eq!(*out.get_pixel(x, 0), gray(255), "lum {x}");
        }
    }

    #[test]
    fn stretches_linearly_between_anchors() {
        let out = normalize(&ramp(), 200, 100).unwrap();
        // (150 - 100) * 255 / 100 = 127.5 → 128
        assert_eq!(*out.get_pixel(150, 0), gray(128));
        // (101 - 100) * 255 / 100 = 2.55 → 3
        assert_eq!(*out.get_pixel(101, 0), gray(3));
        // (199 - 100) * 255 / 100 = 252.45 → 252
        assert_eq!(*out.get_pixel(199, 0), gray(252));
    }

    #[test]
    fn output_is_monotonic_in_input_luminance() {
        for (white, black) in [(255, 0), (128, 127), (90, 10), (250, 249), (17, 3)] {
            let out = normalize(&ramp(), white, black).unwrap();
            let levels: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
            assert!(
                levels.windows(2).all(|w| w[0] <= w[1]),
                "not monotonic for white={white} black={black}"
            );
        }
    }

    #[test]
    fn output_is_gray() {
        let page = RgbImage::from_fn(4, 4, |x, y| Rgb([(x * 60) as u8, (y * 60) as u8, 90]));
        let out = normalize(&page, 180, 20).unwrap();
        assert!(out.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn keeps_dimensions() {
        let page = RgbImage::from_pixel(7, 3, gray(77));
        let out = normalize(&page, 200, 10).unwrap();
        assert_eq!(out.dimensions(), (7, 3));
    }

    #[test]
    fn equal_anchors_cut_at_the_anchor() {
        let out = normalize(&ramp(), 128, 128).unwrap();
        for x in 0..=128 {
            assert_eq!(*out.get_pixel(x, 0), gray(0), "lum {x}");
        }
        for x in 129..=255 {
            assert_eq!(*out.get_pixel(x, 0), gray(255), "lum {x}");
        }
    }

    #[test]
    fn inverted_anchors_are_degenerate() {
        assert!(normalize(&ramp(), 10, 200).is_err());
    }

    #[test]
    fn normalize_page_uses_median_as_white_and_min_as_black() {
        // Half the page at 40, half at 220: min = median = 40, so 40 → 0 and
        // 220 → 255.
        let half = RgbImage::from_fn(4, 1, |x, _| if x < 2 { gray(40) } else { gray(220) });
        let stats = PageStatistics::of(&half);
        let out = normalize_page(&half, &stats).unwrap();
        assert_eq!(*out.get_pixel(1, 0), gray(0));
        assert_eq!(*out.get_pixel(2, 0), gray(255));

        // One dark pixel among mid grays: min = 20, median = 100.
        let page = RgbImage::from_fn(5, 1, |x, _| if x == 0 { gray(20) } else { gray(100 + x as u8) });
        let stats = PageStatistics::of(&page);
        assert_eq!((stats.min_luminance, stats.median_luminance), (20, 101));
        let out = normalize_page(&page, &stats).unwrap();
        assert_eq!(*out.get_pixel(0, 0), gray(0));
        assert_eq!(*out.get_pixel(1, 0), gray(255));
        assert_eq!(*out.get_pixel(4, 0), gray(255));
    }

    #[test]
    fn majority_at_minimum_keeps_only_the_darkest_level_black() {
        // 6 of 8 pixels at 150 and two brighter ones at 151 and 240.
        let page = RgbImage::from_fn(8, 1, |x, _| match x {
            6 => gray(151),
            7 => gray(240),
            _ => gray(150),
        });
        let stats = PageStatistics::of(&page);
        assert_eq!((stats.min_luminance, stats.median_luminance), (150, 150));
        let out = normalize_page(&page, &stats).unwrap();
        assert!((0..6).all(|x| *out.get_pixel(x, 0) == gray(0)));
        assert_eq!(*out.get_pixel(6, 0), gray(255));
        assert_eq!(*out.get_pixel(7, 0), gray(255));
    }

    #[test]
    fn uniform_and_empty_pages_are_degenerate() {
        let page = RgbImage::from_pixel(4, 4, gray(128));
        let err = normalize_page(&page, &PageStatistics::of(&page)).unwrap_err();
        assert!(matches!(
            err,
            Pdf2FaxError::DegenerateNormalization {
                white: 128,
                black: 128
            }
        ));

        let empty = RgbImage::new(0, 0);
        assert!(normalize_page(&empty, &PageStatistics::of(&empty)).is_err());
    }
}
