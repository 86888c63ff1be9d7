//! Page rasterisation: turn document pages into RGB images one at a time.
//!
//! The [`Rasterizer`] trait is the seam between the bi-level pipeline and
//! whatever produces pixels. [`PdfiumRasterizer`] renders PDF pages through
//! pdfium at the fixed [`RENDER_DPI`]; [`RenderedPages`] hands out images that
//! were rendered elsewhere (or synthesised in tests).
//!
//! Rendering is lazy: a page is only rasterised when the page stream asks for
//! it, so at most one full-resolution page is alive at a time. A 500 DPI A4
//! page is about 4 100 × 5 800 px, i.e. ~70 MB of RGB.

use crate::config::RENDER_DPI;
use crate::error::Pdf2FaxError;
use crate::output::DocumentMetadata;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF user space is measured in points: 72 per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// A source of rasterised pages.
pub trait Rasterizer {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based) to 8-bit RGB.
    fn render(&mut self, index: usize) -> Result<RgbImage, Pdf2FaxError>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for Box<R> {
    fn page_count(&self) -> usize {
        (**self).page_count()
    }

    fn render(&mut self, index: usize) -> Result<RgbImage, Pdf2FaxError> {
        (**self).render(index)
    }
}

// ── Pre-rendered pages ───────────────────────────────────────────────────

/// Pages that are already in memory. Each page can be taken exactly once.
#[derive(Debug, Default)]
pub struct RenderedPages {
    pages: Vec<Option<RgbImage>>,
}

impl RenderedPages {
    pub fn new(pages: Vec<RgbImage>) -> Self {
        Self {
            pages: pages.into_iter().map(Some).collect(),
        }
    }
}

impl From<Vec<RgbImage>> for RenderedPages {
    fn from(pages: Vec<RgbImage>) -> Self {
        Self::new(pages)
    }
}

impl Rasterizer for RenderedPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render(&mut self, index: usize) -> Result<RgbImage, Pdf2FaxError> {
        let len = self.pages.len();
        let slot = self
            .pages
            .get_mut(index)
            .ok_or_else(|| Pdf2FaxError::RasterisationFailed {
                page: index + 1,
                detail: format!("page index out of range (document has {} pages)", len),
            })?;
        slot.take().ok_or_else(|| Pdf2FaxError::RasterisationFailed {
            page: index + 1,
            detail: "page was already consumed".into(),
        })
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind to a pdfium library.
///
/// `PDFIUM_LIB_PATH` wins when set; it may name the library file itself or
/// the directory holding it. Otherwise a library next to the working
/// directory is tried before the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2FaxError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) if !raw.is_empty() => {
            let mut path = PathBuf::from(raw);
            if path.is_dir() {
                path = path.join(Pdfium::pdfium_platform_library_name());
            }
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_library(PathBuf::from(".").join(Pdfium::pdfium_platform_library_name()))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2FaxError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF held in memory.
pub fn load_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2FaxError> {
    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2FaxError::WrongPassword
            } else {
                Pdf2FaxError::PasswordRequired
            }
        } else {
            Pdf2FaxError::CorruptPdf { detail: err_str }
        }
    })
}

/// Renders pages of an open PDF document at [`RENDER_DPI`].
pub struct PdfiumRasterizer<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
    page_count: usize,
}

impl<'a> PdfiumRasterizer<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} pages", page_count);

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(RENDER_DPI as f32 / POINTS_PER_INCH);

        Self {
            document,
            render_config,
            page_count,
        }
    }
}

impl Rasterizer for PdfiumRasterizer<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render(&mut self, index: usize) -> Result<RgbImage, Pdf2FaxError> {
        let page_index = u16::try_from(index).map_err(|_| Pdf2FaxError::RasterisationFailed {
            page: index + 1,
            detail: "page index exceeds pdfium's 16-bit page range".into(),
        })?;

        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| Pdf2FaxError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&self.render_config).map_err(|e| {
            Pdf2FaxError::RasterisationFailed {
                page: index + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image().into_rgb8();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );

        Ok(image)
    }
}

/// Read the document information dictionary and page count without
/// rendering anything.
pub fn extract_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn rendered_pages_hand_out_each_page_once() {
        let mut pages = RenderedPages::new(vec![
            RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])),
            RgbImage::from_pixel(3, 1, Rgb([4, 5, 6])),
        ]);
        assert_eq!(pages.page_count(), 2);

        let second = pages.render(1).unwrap();
        assert_eq!(second.dimensions(), (3, 1));

        let err = pages.render(1).unwrap_err();
        assert!(matches!(err, Pdf2FaxError::RasterisationFailed { page: 2, .. }));
        assert_eq!(pages.page_count(), 2);
    }

    #[test]
    fn rendered_pages_out_of_range() {
        let mut pages = RenderedPages::from(Vec::new());
        assert_eq!(pages.page_count(), 0);
        assert!(pages.render(0).is_err());
    }

    #[test]
    fn rendered_pages_past_the_end_report_the_page_count() {
        let mut pages = RenderedPages::new(vec![RgbImage::new(1, 1), RgbImage::new(1, 1)]);
        match pages.render(5).unwrap_err() {
            Pdf2FaxError::RasterisationFailed { page, detail } => {
                assert_eq!(page, 6);
                assert!(detail.contains("has 2 pages"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // An out-of-range request leaves the real pages untouched.
        assert!(pages.render(0).is_ok());
        assert!(pages.render(1).is_ok());
    }

    #[test]
    fn boxed_rasterizer_delegates() {
        let mut boxed: Box<dyn Rasterizer> =
            Box::new(RenderedPages::new(vec![RgbImage::new(1, 1)]));
        assert_eq!(boxed.page_count(), 1);
        assert!(boxed.render(0).is_ok());
    }
}
