//! Error types for the pdf2fax library.
//!
//! Every failure is fatal for the document being converted: the pipeline is a
//! single forward pass over a non-rewindable page source, so there is nothing
//! to resume and nothing is retried. The one recoverable condition,
//! [`Pdf2FaxError::DegenerateNormalization`], is produced by
//! [`crate::pipeline::normalize::normalize_page`] and handled inside the page
//! pipeline by falling back to the unnormalized page.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf2fax library.
#[derive(Debug, Error)]
pub enum Pdf2FaxError {
    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The configured conversion mode is not one of the known modes.
    #[error(
        "Unsupported conversion mode '{mode}'\n\
Expected one of: threshold, dither, normalized-threshold, normalized-dither."
    )]
    UnsupportedMode { mode: String },

    /// The document has no pages, so there is nothing to put in the container.
    #[error("Document has no pages; a TIFF container needs at least one page")]
    EmptyDocument,

    /// The page has no luminance range to stretch: inverted anchors or a
    /// single luminance across the whole page.
    #[error("Cannot normalize: no luminance range between black {black} and white {white}")]
    DegenerateNormalization { white: u8, black: u8 },

    /// `next_page` was called after the last page was produced.
    #[error("Page stream exhausted after {pages} pages")]
    StreamExhausted { pages: usize },

    /// Group 4 lines are addressed with 16-bit column indices.
    #[error("Page {page} is {width}x{height} px; Group 4 encoding supports lines of at most 65535 px")]
    PageTooLarge { page: usize, width: u32, height: u32 },

    /// The Group 4 coder reported a failure.
    #[error("Failed to encode page {page}: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// Bytes handed to the container reader are not a TIFF we understand.
    #[error("Invalid TIFF container: {0}")]
    InvalidContainer(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("Input is not a valid PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output TIFF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or set PDFIUM_LIB_PATH to the library\n\
file (or the directory containing it).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_mode_lists_choices() {
        let e = Pdf2FaxError::UnsupportedMode {
            mode: "sepia".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("sepia"), "got: {msg}");
        assert!(msg.contains("normalized-dither"), "got: {msg}");
    }

    #[test]
    fn degenerate_normalization_display() {
        let e = Pdf2FaxError::DegenerateNormalization {
            white: 128,
            black: 128,
        };
        assert!(e.to_string().contains("128"));
    }

    #[test]
    fn stream_exhausted_display() {
        let e = Pdf2FaxError::StreamExhausted { pages: 3 };
        assert!(e.to_string().contains("3 pages"));
    }

    #[test]
    fn page_too_large_display() {
        let e = Pdf2FaxError::PageTooLarge {
            page: 2,
            width: 70_000,
            height: 10,
        };
        assert!(e.to_string().contains("Page 2"));
        assert!(e.to_string().contains("70000x10"));
    }
}
