//! Pipeline stages for PDF-to-fax conversion.
//!
//! Each submodule implements one transformation step and can be tested on
//! its own with synthetic images.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ [normalize] ──▶ binarize ──▶ encode
//! (bytes)   (RGB)       (gray)          (1 bit)      (G4 TIFF)
//! ```
//!
//! 1. [`input`]: resolve a path or URL to PDF bytes
//! 2. [`render`]: rasterise one page at a time through pdfium
//! 3. [`luminance`]: per-pixel luminance and page statistics
//! 4. [`normalize`]: optional contrast stretch between min and median
//! 5. [`binarize`]: threshold or dither down to a [`binarize::BinaryPage`]
//! 6. [`encode`]: Group 4 compression into a multi-page TIFF
//!
//! Stages 2 to 5 are driven page by page by [`crate::stream::PageStream`].

pub mod binarize;
pub mod encode;
pub mod input;
pub mod luminance;
pub mod normalize;
pub mod render;
