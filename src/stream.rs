//! Lazy, forward-only stream of bi-level pages.
//!
//! [`PageStream`] pulls one rendered page at a time from a [`Rasterizer`],
//! runs the configured preprocessing and binarization on it and hands back a
//! [`BinaryPage`]. The RGB raster is dropped before the next page is
//! requested, so memory use is bounded by a single page regardless of the
//! document length.
//!
//! The stream cannot be rewound: every page index is visited exactly once, in
//! increasing order. One dithering generator is owned by the stream and
//! advanced across pages; it is never reseeded between pages.
//!
//! ```text
//! Rasterizer ──render──▶ RgbImage ──preprocess──▶ RgbImage ──binarize──▶ BinaryPage
//!                                   (identity |               (threshold |
//!                                    normalize)                dither)
//! ```

use crate::config::{ConversionConfig, ConversionMode, Preprocess};
use crate::error::Pdf2FaxError;
use crate::pipeline::binarize::{binarize, BinaryPage};
use crate::pipeline::luminance::PageStatistics;
use crate::pipeline::normalize::normalize_page;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Reduce one rendered page to 1 bit according to `mode`.
///
/// When normalization is requested but the page has a single luminance
/// (e.g. a blank page), the page is binarized as rendered and a warning is
/// logged.
pub fn reduce_page<G: Rng>(page: &RgbImage, mode: ConversionMode, rng: &mut G) -> BinaryPage {
    let prepared: Cow<'_, RgbImage> = match mode.preprocess() {
        Preprocess::Identity => Cow::Borrowed(page),
        Preprocess::Normalize => {
            let stats = PageStatistics::of(page);
            match normalize_page(page, &stats) {
                Ok(stretched) => Cow::Owned(stretched),
                Err(e) => {
                    warn!("{}; binarizing page without normalization", e);
                    Cow::Borrowed(page)
                }
            }
        }
    };
    binarize(&prepared, mode.binarization(), rng)
}

/// Pages of a document, converted on demand.
pub struct PageStream<R: Rasterizer> {
    rasterizer: R,
    mode: ConversionMode,
    rng: StdRng,
    next_index: usize,
    total: usize,
    progress: Option<ProgressCallback>,
}

impl<R: Rasterizer> PageStream<R> {
    /// Create a stream over every page of `rasterizer`.
    ///
    /// The generator is seeded from `config.seed` when set, otherwise from
    /// OS entropy.
    pub fn new(rasterizer: R, config: &ConversionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rasterizer, config, rng)
    }

    /// Create a stream that dithers with the given generator.
    pub fn with_rng(rasterizer: R, config: &ConversionConfig, rng: StdRng) -> Self {
        let total = rasterizer.page_count();
        Self {
            rasterizer,
            mode: config.mode,
            rng,
            next_index: 0,
            total,
            progress: config.progress_callback.clone(),
        }
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    /// Number of pages in the underlying document.
    pub fn total_pages(&self) -> usize {
        self.total
    }

    /// Number of pages already produced.
    pub fn pages_done(&self) -> usize {
        self.next_index
    }

    pub fn has_next(&self) -> bool {
        self.next_index < self.total
    }

    /// Render, preprocess and binarize the next page.
    ///
    /// # Errors
    /// [`Pdf2FaxError::StreamExhausted`] once every page has been produced;
    /// otherwise whatever the rasterizer reports for the page.
    pub fn next_page(&mut self) -> Result<BinaryPage, Pdf2FaxError> {
        if !self.has_next() {
            return Err(Pdf2FaxError::StreamExhausted { pages: self.total });
        }
        let index = self.next_index;
        let page_num = index + 1;
        // Advance first: a failed page is not retried.
        self.next_index += 1;

        if let Some(cb) = &self.progress {
            cb.on_page_start(page_num, self.total);
        }

        let raster = self.rasterizer.render(index)?;
        let page = reduce_page(&raster, self.mode, &mut self.rng);
        drop(raster);

        let black = page.black_pixels();
        debug!(
            "Page {}/{} → {}x{} bi-level, {} black px",
            page_num,
            self.total,
            page.width(),
            page.height(),
            black
        );
        if let Some(cb) = &self.progress {
            cb.on_page_complete(page_num, self.total, black);
        }

        Ok(page)
    }
}

impl<R: Rasterizer> Iterator for PageStream<R> {
    type Item = Result<BinaryPage, Pdf2FaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.next_page())
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next_index;
        (left, Some(left))
    }
}

impl<R: Rasterizer> ExactSizeIterator for PageStream<R> {}
