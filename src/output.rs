//! Output types returned by the conversion entry points.

use crate::config::ConversionMode;
use crate::pipeline::encode::ContainerPage;
use serde::{Deserialize, Serialize};

/// A finished conversion: the TIFF bytes plus a summary of the run.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Multi-page Group 4 TIFF, one directory per source page.
    pub tiff: Vec<u8>,
    pub stats: ConversionStats,
}

/// Summary of a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages written to the container.
    pub total_pages: usize,
    pub mode: ConversionMode,
    /// Black pixels summed over all pages.
    pub black_pixels: u64,
    /// Size of the TIFF in bytes.
    pub output_bytes: usize,
    /// Wall-clock time from the first render to the finished container.
    pub total_duration_ms: u64,
}

/// Document information read from a PDF without rendering it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Directory listing of an existing TIFF container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub file_bytes: usize,
    pub pages: Vec<ContainerPage>,
}
