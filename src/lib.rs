//! # pdf2fax
//!
//! Convert PDF documents into compact bi-level (1 bit per pixel) multi-page
//! TIFF files with CCITT Group 4 compression, the format fax servers and
//! document archives expect.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Render     rasterise one page at 500 DPI via pdfium
//!  ├─ 3. Normalize  optional contrast stretch (min → black, median → white)
//!  ├─ 4. Binarize   threshold at 50% or per-pixel stochastic dither
//!  └─ 5. Encode     Group 4 strip + TIFF directory, 300/1 dpi
//! ```
//!
//! Pages flow through steps 2–5 one at a time, so memory stays bounded by a
//! single rendered page however long the document is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2fax::{convert_to_file, ConversionConfig, ConversionMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .mode(ConversionMode::NormalizedDither)
//!         .build()?;
//!     let stats = convert_to_file("document.pdf", "document.tif", &config).await?;
//!     eprintln!("{} pages, {} bytes", stats.total_pages, stats.output_bytes);
//!     Ok(())
//! }
//! ```
//!
//! Already-rendered pages can skip pdfium entirely:
//!
//! ```rust
//! use image::{Rgb, RgbImage};
//! use pdf2fax::{convert_pages, ConversionConfig, RenderedPages};
//!
//! let pages = RenderedPages::new(vec![RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]))]);
//! let output = convert_pages(pages, &ConversionConfig::default()).unwrap();
//! assert_eq!(&output.tiff[..4], b"II*\0");
//! ```
//!
//! ## Conversion Modes
//!
//! | Mode | Result |
//! |------|--------|
//! | `threshold` | Crisp text, loses gray fills |
//! | `dither` (default) | Keeps gray levels as dot density |
//! | `normalized-threshold` | Rescues faint scans before thresholding |
//! | `normalized-dither` | Contrast stretch, then dither |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2fax` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConversionMode, OUTPUT_RESOLUTION, RENDER_DPI};
pub use convert::{
    convert, convert_async, convert_input, convert_pages, convert_sync, convert_to_file, inspect,
    inspect_container,
};
pub use error::Pdf2FaxError;
pub use output::{ContainerSummary, ConversionOutput, ConversionStats, DocumentMetadata};
pub use pipeline::binarize::BinaryPage;
pub use pipeline::encode::{decode_page, encode_tiff, read_directories, ContainerPage};
pub use pipeline::render::{Rasterizer, RenderedPages};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::PageStream;
