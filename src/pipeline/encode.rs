//! Container encoding: bi-level pages → multi-page Group 4 TIFF.
//!
//! Each page is compressed with CCITT T.6 (Group 4) by the `fax` crate and
//! stored as a single strip. The TIFF itself is little-endian with one IFD
//! per page, chained in page order:
//!
//! ```text
//! "II" 42 ──▶ strip₁ xres₁ yres₁ IFD₁ ──▶ strip₂ xres₂ yres₂ IFD₂ ──▶ … ──▶ 0
//! ```
//!
//! Every IFD records Compression = 4, PhotometricInterpretation =
//! WhiteIsZero and X/Y resolution 300/1 per inch.
//!
//! The reader half ([`read_directories`], [`decode_page`]) understands what
//! the writer produces (either byte order, single-strip pages) and backs
//! [`crate::convert::inspect_container`].

use crate::config::OUTPUT_RESOLUTION;
use crate::error::Pdf2FaxError;
use crate::pipeline::binarize::BinaryPage;
use fax::encoder::Encoder;
use fax::{Color, VecWriter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

// ── TIFF constants ───────────────────────────────────────────────────────

const TAG_NEW_SUBFILE_TYPE: u16 = 254;
const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_T6_OPTIONS: u16 = 293;
const TAG_RESOLUTION_UNIT: u16 = 296;
const TAG_PAGE_NUMBER: u16 = 297;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

/// TIFF Compression value for CCITT T.6.
pub const COMPRESSION_GROUP4: u16 = 4;
/// PhotometricInterpretation: 0 is white, 1 is black.
pub const PHOTOMETRIC_WHITE_IS_ZERO: u16 = 0;
/// ResolutionUnit: inch.
pub const RESOLUTION_UNIT_INCH: u16 = 2;
/// NewSubfileType bit marking one page of a multi-page document.
const SUBFILE_PAGE: u32 = 2;

const HEADER_LEN: usize = 8;
const MAX_DIRECTORIES: usize = 1 << 16;

// ── Group 4 ──────────────────────────────────────────────────────────────

/// Compress one page with CCITT T.6. `page_num` is only used in errors.
pub fn encode_g4(page: &BinaryPage, page_num: usize) -> Result<Vec<u8>, Pdf2FaxError> {
    let width = u16::try_from(page.width()).map_err(|_| Pdf2FaxError::PageTooLarge {
        page: page_num,
        width: page.width(),
        height: page.height(),
    })?;

    let mut encoder = Encoder::new(VecWriter::new());
    for y in 0..page.height() {
        let pels = (0..page.width()).map(|x| {
            if page.is_black(x, y) {
                Color::Black
            } else {
                Color::White
            }
        });
        encoder
            .encode_line(pels, width)
            .map_err(|e| Pdf2FaxError::EncodeFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;
    }

    let writer = encoder.finish().map_err(|e| Pdf2FaxError::EncodeFailed {
        page: page_num,
        detail: format!("{:?}", e),
    })?;
    Ok(writer.finish())
}

/// Decompress a CCITT T.6 strip back into a page.
pub fn decode_g4(data: &[u8], width: u32, height: u32) -> Result<BinaryPage, Pdf2FaxError> {
    let line_width = u16::try_from(width)
        .map_err(|_| Pdf2FaxError::InvalidContainer(format!("page width {width} exceeds Group 4 limit")))?;

    let mut page = BinaryPage::new(width, height);
    let mut y = 0u32;
    // The decoder can stop cleanly before `height` lines; the count decides.
    let _ = fax::decoder::decode_g4(
        data.iter().copied(),
        line_width,
        u16::try_from(height).ok(),
        |transitions| {
            if y < height {
                fill_line(&mut page, y, transitions);
            }
            y += 1;
        },
    );

    if y < height {
        return Err(Pdf2FaxError::InvalidContainer(format!(
            "Group 4 data ended after {y} of {height} lines"
        )));
    }
    Ok(page)
}

/// Paint the black runs of one decoded line. Transitions alternate
/// white→black→white…, starting with white at column 0.
fn fill_line(page: &mut BinaryPage, y: u32, transitions: &[u16]) {
    let width = page.width();
    for run in transitions.chunks(2) {
        let start = u32::from(run[0]).min(width);
        let end = run.get(1).map_or(width, |&e| u32::from(e).min(width));
        for x in start..end {
            page.set(x, y, true);
        }
    }
}

// ── Writer ───────────────────────────────────────────────────────────────

/// One 12-byte IFD entry with its value already laid out in the 4-byte slot.
struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    value: [u8; 4],
}

impl IfdEntry {
    fn short(tag: u16, v: u16) -> Self {
        let [a, b] = v.to_le_bytes();
        Self {
            tag,
            field_type: TYPE_SHORT,
            count: 1,
            value: [a, b, 0, 0],
        }
    }

    fn short_pair(tag: u16, first: u16, second: u16) -> Self {
        let [a, b] = first.to_le_bytes();
        let [c, d] = second.to_le_bytes();
        Self {
            tag,
            field_type: TYPE_SHORT,
            count: 2,
            value: [a, b, c, d],
        }
    }

    fn long(tag: u16, v: u32) -> Self {
        Self {
            tag,
            field_type: TYPE_LONG,
            count: 1,
            value: v.to_le_bytes(),
        }
    }

    fn rational_at(tag: u16, offset: u32) -> Self {
        Self {
            tag,
            field_type: TYPE_RATIONAL,
            count: 1,
            value: offset.to_le_bytes(),
        }
    }
}

/// Incremental multi-page TIFF builder.
///
/// Pages are appended one at a time; nothing about later pages needs to be
/// known up front except the total used in the PageNumber tag.
pub struct TiffWriter {
    buf: Vec<u8>,
    /// Position of the "next IFD offset" field to patch with the next page.
    next_ifd_slot: usize,
    pages_written: usize,
    total_pages: usize,
}

impl TiffWriter {
    pub fn new(total_pages: usize) -> Self {
        let mut buf = Vec::with_capacity(64 * 1000);
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        Self {
            buf,
            next_ifd_slot: 4,
            pages_written: 0,
            total_pages,
        }
    }

    pub fn pages_written(&self) -> usize {
        self.pages_written
    }

    /// Compress `page` and append it with its directory.
    pub fn push_page(&mut self, page: &BinaryPage) -> Result<(), Pdf2FaxError> {
        let page_num = self.pages_written + 1;
        let (page_index, total) = match (
            u16::try_from(self.pages_written),
            u16::try_from(self.total_pages),
        ) {
            (Ok(index), Ok(total)) => (index, total),
            _ => {
                return Err(Pdf2FaxError::EncodeFailed {
                    page: page_num,
                    detail: format!(
                        "{} pages do not fit the 16-bit PageNumber tag",
                        self.total_pages.max(page_num)
                    ),
                })
            }
        };
        let strip = encode_g4(page, page_num)?;

        let strip_offset = self.offset(page_num)?;
        self.buf.extend_from_slice(&strip);
        self.pad_to_word();

        let x_res_offset = self.offset(page_num)?;
        self.push_rational(OUTPUT_RESOLUTION, 1);
        let y_res_offset = self.offset(page_num)?;
        self.push_rational(OUTPUT_RESOLUTION, 1);

        let subfile_type = if self.total_pages > 1 { SUBFILE_PAGE } else { 0 };
        let strip_len = u32::try_from(strip.len()).map_err(|_| Pdf2FaxError::EncodeFailed {
            page: page_num,
            detail: "compressed strip exceeds 4 GiB".into(),
        })?;

        // Entries must be sorted by tag.
        let entries = [
            IfdEntry::long(TAG_NEW_SUBFILE_TYPE, subfile_type),
            IfdEntry::long(TAG_IMAGE_WIDTH, page.width()),
            IfdEntry::long(TAG_IMAGE_LENGTH, page.height()),
            IfdEntry::short(TAG_BITS_PER_SAMPLE, 1),
            IfdEntry::short(TAG_COMPRESSION, COMPRESSION_GROUP4),
            IfdEntry::short(TAG_PHOTOMETRIC, PHOTOMETRIC_WHITE_IS_ZERO),
            IfdEntry::long(TAG_STRIP_OFFSETS, strip_offset),
            IfdEntry::short(TAG_SAMPLES_PER_PIXEL, 1),
            IfdEntry::long(TAG_ROWS_PER_STRIP, page.height()),
            IfdEntry::long(TAG_STRIP_BYTE_COUNTS, strip_len),
            IfdEntry::rational_at(TAG_X_RESOLUTION, x_res_offset),
            IfdEntry::rational_at(TAG_Y_RESOLUTION, y_res_offset),
            IfdEntry::long(TAG_T6_OPTIONS, 0),
            IfdEntry::short(TAG_RESOLUTION_UNIT, RESOLUTION_UNIT_INCH),
            IfdEntry::short_pair(TAG_PAGE_NUMBER, page_index, total),
        ];

        let ifd_offset = self.offset(page_num)?;
        self.buf[self.next_ifd_slot..self.next_ifd_slot + 4].copy_from_slice(&ifd_offset.to_le_bytes());

        self.buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for entry in &entries {
            self.buf.extend_from_slice(&entry.tag.to_le_bytes());
            self.buf.extend_from_slice(&entry.field_type.to_le_bytes());
            self.buf.extend_from_slice(&entry.count.to_le_bytes());
            self.buf.extend_from_slice(&entry.value);
        }
        self.next_ifd_slot = self.buf.len();
        self.buf.extend_from_slice(&0u32.to_le_bytes());

        self.pages_written += 1;
        debug!(
            "Encoded page {} ({}x{} px) → {} bytes G4",
            page_num,
            page.width(),
            page.height(),
            strip.len()
        );
        Ok(())
    }

    /// Finish the container. Fails if no page was written.
    pub fn finish(self) -> Result<Vec<u8>, Pdf2FaxError> {
        if self.pages_written == 0 {
            return Err(Pdf2FaxError::EmptyDocument);
        }
        Ok(self.buf)
    }

    fn offset(&self, page_num: usize) -> Result<u32, Pdf2FaxError> {
        u32::try_from(self.buf.len()).map_err(|_| Pdf2FaxError::EncodeFailed {
            page: page_num,
            detail: "container exceeds 4 GiB".into(),
        })
    }

    fn push_rational(&mut self, numerator: u32, denominator: u32) {
        self.buf.extend_from_slice(&numerator.to_le_bytes());
        self.buf.extend_from_slice(&denominator.to_le_bytes());
    }

    fn pad_to_word(&mut self) {
        if self.buf.len() % 2 == 1 {
            self.buf.push(0);
        }
    }
}

/// Encode a first page eagerly, then stream the remaining pages into the
/// same container as the iterator yields them.
///
/// The first error from `rest` aborts encoding and is returned as-is.
pub fn encode_tiff<I>(first: BinaryPage, rest: I) -> Result<Vec<u8>, Pdf2FaxError>
where
    I: ExactSizeIterator<Item = Result<BinaryPage, Pdf2FaxError>>,
{
    let mut writer = TiffWriter::new(1 + rest.len());
    writer.push_page(&first)?;
    drop(first);

    for page in rest {
        writer.push_page(&page?)?;
    }
    writer.finish()
}

// ── Reader ───────────────────────────────────────────────────────────────

/// The directory of one page in a TIFF container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPage {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u16,
    pub compression: u16,
    pub photometric: u16,
    /// (numerator, denominator)
    pub x_resolution: Option<(u32, u32)>,
    pub y_resolution: Option<(u32, u32)>,
    pub resolution_unit: Option<u16>,
    /// (0-based page index, total pages)
    pub page_number: Option<(u16, u16)>,
    pub strip_offset: u32,
    pub strip_byte_count: u32,
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    big_endian: bool,
}

impl ByteReader<'_> {
    fn slice(&self, offset: usize, len: usize) -> Result<&[u8], Pdf2FaxError> {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or_else(|| {
                Pdf2FaxError::InvalidContainer(format!("read of {len} bytes at offset {offset} is out of bounds"))
            })
    }

    fn u16_at(&self, offset: usize) -> Result<u16, Pdf2FaxError> {
        let b: [u8; 2] = self.slice(offset, 2)?.try_into().map_err(|_| short_read())?;
        Ok(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    fn u32_at(&self, offset: usize) -> Result<u32, Pdf2FaxError> {
        let b: [u8; 4] = self.slice(offset, 4)?.try_into().map_err(|_| short_read())?;
        Ok(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    /// First value of a SHORT or LONG field stored inline.
    fn scalar(&self, entry_offset: usize, field_type: u16, count: u32) -> Result<u32, Pdf2FaxError> {
        match (field_type, count) {
            (TYPE_SHORT, 1 | 2) => Ok(u32::from(self.u16_at(entry_offset + 8)?)),
            (TYPE_LONG, 1) => self.u32_at(entry_offset + 8),
            _ => Err(Pdf2FaxError::InvalidContainer(format!(
                "unsupported field layout (type {field_type}, count {count})"
            ))),
        }
    }

    fn rational(&self, entry_offset: usize) -> Result<(u32, u32), Pdf2FaxError> {
        let at = self.u32_at(entry_offset + 8)? as usize;
        Ok((self.u32_at(at)?, self.u32_at(at + 4)?))
    }
}

fn short_read() -> Pdf2FaxError {
    Pdf2FaxError::InvalidContainer("short read".into())
}

/// List the page directories of a TIFF container, in file order.
pub fn read_directories(bytes: &[u8]) -> Result<Vec<ContainerPage>, Pdf2FaxError> {
    if bytes.len() < HEADER_LEN {
        return Err(Pdf2FaxError::InvalidContainer("file is shorter than a TIFF header".into()));
    }
    let big_endian = match &bytes[..2] {
        b"II" => false,
        b"MM" => true,
        other => {
            return Err(Pdf2FaxError::InvalidContainer(format!(
                "unknown byte-order mark {other:?}"
            )))
        }
    };
    let reader = ByteReader { bytes, big_endian };
    if reader.u16_at(2)? != 42 {
        return Err(Pdf2FaxError::InvalidContainer("missing TIFF magic 42".into()));
    }

    let mut pages = Vec::new();
    let mut seen = HashSet::new();
    let mut next = reader.u32_at(4)? as usize;

    while next != 0 {
        if !seen.insert(next) || seen.len() > MAX_DIRECTORIES {
            return Err(Pdf2FaxError::InvalidContainer("IFD chain loops".into()));
        }
        let count = reader.u16_at(next)? as usize;
        let mut page = ContainerPage {
            width: 0,
            height: 0,
            bits_per_sample: 1,
            compression: 1,
            photometric: PHOTOMETRIC_WHITE_IS_ZERO,
            x_resolution: None,
            y_resolution: None,
            resolution_unit: None,
            page_number: None,
            strip_offset: 0,
            strip_byte_count: 0,
        };

        for i in 0..count {
            let at = next + 2 + i * 12;
            let tag = reader.u16_at(at)?;
            let field_type = reader.u16_at(at + 2)?;
            let n = reader.u32_at(at + 4)?;
            match tag {
                TAG_IMAGE_WIDTH => page.width = reader.scalar(at, field_type, n)?,
                TAG_IMAGE_LENGTH => page.height = reader.scalar(at, field_type, n)?,
                TAG_BITS_PER_SAMPLE => page.bits_per_sample = reader.scalar(at, field_type, n)? as u16,
                TAG_COMPRESSION => page.compression = reader.scalar(at, field_type, n)? as u16,
                TAG_PHOTOMETRIC => page.photometric = reader.scalar(at, field_type, n)? as u16,
                TAG_STRIP_OFFSETS => page.strip_offset = single_strip(&reader, at, field_type, n)?,
                TAG_STRIP_BYTE_COUNTS => page.strip_byte_count = single_strip(&reader, at, field_type, n)?,
                TAG_X_RESOLUTION => page.x_resolution = Some(reader.rational(at)?),
                TAG_Y_RESOLUTION => page.y_resolution = Some(reader.rational(at)?),
                TAG_RESOLUTION_UNIT => page.resolution_unit = Some(reader.scalar(at, field_type, n)? as u16),
                TAG_PAGE_NUMBER if field_type == TYPE_SHORT && n == 2 => {
                    page.page_number = Some((reader.u16_at(at + 8)?, reader.u16_at(at + 10)?));
                }
                _ => {}
            }
        }

        pages.push(page);
        next = reader.u32_at(next + 2 + count * 12)? as usize;
    }

    Ok(pages)
}

fn single_strip(reader: &ByteReader<'_>, at: usize, field_type: u16, count: u32) -> Result<u32, Pdf2FaxError> {
    if count != 1 {
        return Err(Pdf2FaxError::InvalidContainer(format!(
            "pages with {count} strips are not supported"
        )));
    }
    reader.scalar(at, field_type, count)
}

/// Decode the pixels of one Group 4 page listed by [`read_directories`].
pub fn decode_page(bytes: &[u8], page: &ContainerPage) -> Result<BinaryPage, Pdf2FaxError> {
    if page.compression != COMPRESSION_GROUP4 {
        return Err(Pdf2FaxError::InvalidContainer(format!(
            "compression {} is not Group 4",
            page.compression
        )));
    }
    let start = page.strip_offset as usize;
    let strip = start
        .checked_add(page.strip_byte_count as usize)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| Pdf2FaxError::InvalidContainer("strip lies outside the file".into()))?;

    let decoded = decode_g4(strip, page.width, page.height)?;
    if page.photometric == PHOTOMETRIC_WHITE_IS_ZERO {
        Ok(decoded)
    } else {
        Ok(BinaryPage::from_fn(decoded.width(), decoded.height(), |x, y| {
            !decoded.is_black(x, y)
        }))
    }
}
