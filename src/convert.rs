//! Conversion entry points.
//!
//! Everything funnels into [`convert_pages`], which drives a [`PageStream`]
//! into the TIFF writer. The other functions only differ in where the pages
//! come from and where the bytes go:
//!
//! | Function | Input | Runs on |
//! |----------|-------|---------|
//! | [`convert_pages`] | any [`Rasterizer`] | caller's thread |
//! | [`convert`] | PDF bytes | caller's thread |
//! | [`convert_async`] | PDF bytes | Tokio blocking pool |
//! | [`convert_input`] | path or URL | async, then blocking pool |
//! | [`convert_sync`] | path or URL | private Tokio runtime |
//! | [`convert_to_file`] | path or URL | async, atomic file write |
//!
//! pdfium is not async-safe, so the async variants never render on a Tokio
//! worker thread.

use crate::config::ConversionConfig;
use crate::error::Pdf2FaxError;
use crate::output::{ContainerSummary, ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::encode::{encode_tiff, read_directories};
use crate::pipeline::render::{bind_pdfium, extract_metadata, load_document, PdfiumRasterizer, Rasterizer};
use crate::pipeline::input;
use crate::stream::PageStream;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Convert every page produced by `rasterizer` into one Group 4 TIFF.
///
/// The first page is converted eagerly; the rest are rendered, binarized and
/// compressed one at a time while the container is being written.
///
/// # Errors
/// [`Pdf2FaxError::EmptyDocument`] when the rasterizer has no pages;
/// otherwise the first rendering or encoding failure, which aborts the whole
/// document.
pub fn convert_pages<R: Rasterizer>(
    rasterizer: R,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2FaxError> {
    let start = Instant::now();
    let mut stream = PageStream::new(rasterizer, config);
    let total_pages = stream.total_pages();

    if !stream.has_next() {
        return Err(Pdf2FaxError::EmptyDocument);
    }
    info!("Converting {} pages (mode: {})", total_pages, config.mode);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    let first = stream.next_page()?;
    let mut black_pixels = first.black_pixels();
    let rest = stream.by_ref().map(|page| {
        if let Ok(ref p) = page {
            black_pixels += p.black_pixels();
        }
        page
    });
    let tiff = encode_tiff(first, rest)?;

    let stats = ConversionStats {
        total_pages: stream.pages_done(),
        mode: config.mode,
        black_pixels,
        output_bytes: tiff.len(),
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages → {} bytes in {}ms",
        stats.total_pages, stats.output_bytes, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(stats.total_pages, stats.output_bytes);
    }

    Ok(ConversionOutput { tiff, stats })
}

/// Convert a PDF held in memory.
///
/// Binds pdfium, opens the document with `config.password` and renders it
/// at 500 DPI. Blocking; see [`convert_async`] for use inside a runtime.
pub fn convert(bytes: &[u8], config: &ConversionConfig) -> Result<ConversionOutput, Pdf2FaxError> {
    input::check_pdf_magic(bytes, "<memory>")?;
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, bytes, config.password.as_deref())?;
    convert_pages(PdfiumRasterizer::new(document), config)
}

/// [`convert`] on Tokio's blocking pool.
pub async fn convert_async(
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2FaxError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || convert(&bytes, &config))
        .await
        .map_err(|e| Pdf2FaxError::Internal(format!("spawn_blocking join error: {}", e)))?
}

/// Convert a PDF file or URL.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Conversion configuration
pub async fn convert_input(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2FaxError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    debug!("Resolved {} to {} bytes", resolved.name, resolved.bytes.len());

    convert_async(resolved.bytes, config).await
}

/// Synchronous wrapper around [`convert_input`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2FaxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2FaxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_input(input_str, config))
}

/// Convert a PDF and write the TIFF to `output_path`.
///
/// The file is written to a temporary file in the same directory and then
/// renamed over the target, so readers never observe a partial TIFF.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2FaxError> {
    let output = convert_input(input_str, config).await?;
    let path = output_path.as_ref().to_path_buf();

    let stats = output.stats;
    let tiff = output.tiff;
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&target, &tiff))
        .await
        .map_err(|e| Pdf2FaxError::Internal(format!("spawn_blocking join error: {}", e)))??;

    info!("Wrote {}", path.display());
    Ok(stats)
}

/// Extract PDF metadata without rendering any page.
///
/// Uses `config.password` to open encrypted documents and
/// `config.download_timeout_secs` for URLs; the other fields are ignored.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Pdf2FaxError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let password = config.password.clone();
    tokio::task::spawn_blocking(move || inspect_bytes(&resolved.bytes, password.as_deref()))
        .await
        .map_err(|e| Pdf2FaxError::Internal(format!("spawn_blocking join error: {}", e)))?
}

/// List the pages of an existing TIFF container.
pub fn inspect_container(bytes: &[u8]) -> Result<ContainerSummary, Pdf2FaxError> {
    Ok(ContainerSummary {
        file_bytes: bytes.len(),
        pages: read_directories(bytes)?,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn inspect_bytes(bytes: &[u8], password: Option<&str>) -> Result<DocumentMetadata, Pdf2FaxError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, bytes, password)?;
    Ok(extract_metadata(&document))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2FaxError> {
    let write_err = |source: std::io::Error| Pdf2FaxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionMode;
    use crate::pipeline::render::RenderedPages;
    use image::{Rgb, RgbImage};

    #[test]
    fn empty_rasterizer_is_empty_document() {
        let err = convert_pages(RenderedPages::default(), &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, Pdf2FaxError::EmptyDocument));
    }

    #[test]
    fn stats_describe_the_run() {
        let pages = RenderedPages::new(vec![
            RgbImage::from_pixel(8, 4, Rgb([0, 0, 0])),
            RgbImage::from_pixel(8, 4, Rgb([255, 255, 255])),
        ]);
        let config = ConversionConfig::builder()
            .mode(ConversionMode::Threshold)
            .build()
            .unwrap();
        let out = convert_pages(pages, &config).unwrap();
        assert_eq!(out.stats.total_pages, 2);
        assert_eq!(out.stats.mode, ConversionMode::Threshold);
        assert_eq!(out.stats.black_pixels, 32);
        assert_eq!(out.stats.output_bytes, out.tiff.len());
    }

    #[test]
    fn bytes_that_are_not_a_pdf_are_rejected_before_pdfium() {
        let err = convert(b"GIF89a....", &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, Pdf2FaxError::NotAPdf { .. }));
    }

    #[test]
    fn convert_input_reports_missing_file() {
        let err = tokio_test::block_on(convert_input(
            "/no/such/file.pdf",
            &ConversionConfig::default(),
        ))
        .unwrap_err();
        assert!(matches!(err, Pdf2FaxError::FileNotFound { .. }));
    }

    #[test]
    fn inspect_reads_input_with_the_configured_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"GIF89a, not a pdf").unwrap();
        let config = ConversionConfig::builder()
            .password("secret")
            .download_timeout_secs(5)
            .build()
            .unwrap();
        let err = tokio_test::block_on(inspect(file.path().to_str().unwrap(), &config)).unwrap_err();
        assert!(matches!(err, Pdf2FaxError::NotAPdf { .. }));

        let err = tokio_test::block_on(inspect("/no/such/file.pdf", &config)).unwrap_err();
        assert!(matches!(err, Pdf2FaxError::FileNotFound { .. }));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.tif");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // No stray temp files left next to the output.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn inspect_container_lists_pages() {
        let pages = RenderedPages::new(vec![RgbImage::new(16, 16), RgbImage::new(24, 8)]);
        let out = convert_pages(pages, &ConversionConfig::default()).unwrap();
        let summary = inspect_container(&out.tiff).unwrap();
        assert_eq!(summary.file_bytes, out.tiff.len());
        assert_eq!(summary.pages.len(), 2);
        assert_eq!((summary.pages[1].width, summary.pages[1].height), (24, 8));
    }
}
