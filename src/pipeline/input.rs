//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! pdfium opens documents straight from a byte slice, so URLs are downloaded
//! into memory and local files are read whole. Both paths check the `%PDF`
//! magic before returning, so callers get [`Pdf2FaxError::NotAPdf`] rather
//! than an opaque pdfium failure.

use crate::error::Pdf2FaxError;
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF bytes plus a human-readable name for log and error messages.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
///
/// If the input is a URL, download it. Otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2FaxError> {
    if input.trim().is_empty() {
        return Err(Pdf2FaxError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Reject byte buffers that do not start with the PDF magic.
pub fn check_pdf_magic(bytes: &[u8], source_name: &str) -> Result<(), Pdf2FaxError> {
    if bytes.len() >= 4 && &bytes[..4] == b"%PDF" {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(Pdf2FaxError::NotAPdf {
        source_name: source_name.to_string(),
        magic,
    })
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, Pdf2FaxError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2FaxError::PermissionDenied { path: path.clone() },
        _ => Pdf2FaxError::FileNotFound { path: path.clone() },
    })?;

    check_pdf_magic(&bytes, path_str)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());

    Ok(ResolvedInput {
        name: path.display().to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2FaxError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2FaxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2FaxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2FaxError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Pdf2FaxError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2FaxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    check_pdf_magic(&bytes, url)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedInput {
        name: url.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_check() {
        assert!(check_pdf_magic(b"%PDF-1.7\n", "a").is_ok());
        let err = check_pdf_magic(b"II*\0rest", "b.tif").unwrap_err();
        assert!(matches!(err, Pdf2FaxError::NotAPdf { magic, .. } if &magic == b"II*\0"));
        let err = check_pdf_magic(b"%P", "short").unwrap_err();
        assert!(matches!(err, Pdf2FaxError::NotAPdf { magic, .. } if magic == [b'%', b'P', 0, 0]));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/a/real/file.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2FaxError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn empty_input_is_invalid() {
        let err = resolve_input("  ", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2FaxError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn local_file_is_read_and_checked() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        good.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
        let resolved = resolve_input(good.path().to_str().unwrap(), 5).await.unwrap();
        assert!(resolved.bytes.starts_with(b"%PDF"));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"hello world").unwrap();
        let err = resolve_input(bad.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, Pdf2FaxError::NotAPdf { .. }));
    }
}
