//! Configuration types for PDF-to-TIFF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The conversion mode is fixed for a
//! whole document; there is no per-page override.

use crate::error::Pdf2FaxError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rasterisation resolution, in pixels per inch. Not configurable.
pub const RENDER_DPI: u32 = 500;

/// Resolution recorded in the TIFF XResolution/YResolution tags (dots per inch).
pub const OUTPUT_RESOLUTION: u32 = 300;

/// Configuration for a PDF-to-TIFF conversion.
///
/// # Example
/// ```rust
/// use pdf2fax::{ConversionConfig, ConversionMode};
///
/// let config = ConversionConfig::builder()
///     .mode(ConversionMode::NormalizedThreshold)
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(config.mode, ConversionMode::NormalizedThreshold);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// How each page is reduced to 1 bit. Default: [`ConversionMode::Dither`].
    pub mode: ConversionMode,

    /// Seed for the dithering generator. Default: None (seeded from OS entropy).
    ///
    /// One generator serves the whole document, so a fixed seed makes the
    /// dithered output of a document reproducible byte for byte.
    pub seed: Option<u64>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-page progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: ConversionMode::default(),
            seed: None,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("mode", &self.mode)
            .field("seed", &self.seed)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn mode(mut self, mode: ConversionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2FaxError> {
        if self.config.download_timeout_secs == 0 {
            return Err(Pdf2FaxError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a rendered page is reduced to black and white.
///
/// Each mode is a combination of a [`Preprocess`] step and a
/// [`Binarization`] strategy:
///
/// | Mode | Preprocess | Binarization |
/// |------|------------|--------------|
/// | `Threshold` | identity | threshold |
/// | `Dither` (default) | identity | dither |
/// | `NormalizedThreshold` | normalize | threshold |
/// | `NormalizedDither` | normalize | dither |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    /// Nearest of black/white under a fixed 50% luminance cut.
    Threshold,
    /// Per-pixel stochastic threshold.
    #[default]
    Dither,
    /// Contrast stretch, then threshold.
    NormalizedThreshold,
    /// Contrast stretch, then dither.
    NormalizedDither,
}

/// Page preparation applied before binarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocess {
    Identity,
    Normalize,
}

/// Rule that decides black or white for each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binarization {
    Threshold,
    Dither,
}

impl ConversionMode {
    /// All modes, in declaration order.
    pub const ALL: [ConversionMode; 4] = [
        ConversionMode::Threshold,
        ConversionMode::Dither,
        ConversionMode::NormalizedThreshold,
        ConversionMode::NormalizedDither,
    ];

    pub fn preprocess(self) -> Preprocess {
        match self {
            ConversionMode::Threshold | ConversionMode::Dither => Preprocess::Identity,
            ConversionMode::NormalizedThreshold | ConversionMode::NormalizedDither => {
                Preprocess::Normalize
            }
        }
    }

    pub fn binarization(self) -> Binarization {
        match self {
            ConversionMode::Threshold | ConversionMode::NormalizedThreshold => {
                Binarization::Threshold
            }
            ConversionMode::Dither | ConversionMode::NormalizedDither => Binarization::Dither,
        }
    }

    /// Canonical kebab-case name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::Threshold => "threshold",
            ConversionMode::Dither => "dither",
            ConversionMode::NormalizedThreshold => "normalized-threshold",
            ConversionMode::NormalizedDither => "normalized-dither",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = Pdf2FaxError;

    /// Parse a mode name. Case-insensitive; `_` and `-` are interchangeable,
    /// and `round` / `normalized-round` are accepted for the threshold modes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "threshold" | "round" => Ok(ConversionMode::Threshold),
            "dither" => Ok(ConversionMode::Dither),
            "normalized-threshold" | "normalized-round" => Ok(ConversionMode::NormalizedThreshold),
            "normalized-dither" => Ok(ConversionMode::NormalizedDither),
            _ => Err(Pdf2FaxError::UnsupportedMode {
                mode: s.to_string(),
            }),
        }
    }
}
