//! Content kind detection and image header inspection.
//!
//! Hosts often mislabel or omit the content type of proxied downloads, so
//! the declared header is trusted only when it names a concrete kind.
//! Otherwise the leading bytes are matched against known signatures.

use serde::{Deserialize, Serialize};

/// How an extension was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Declared `Content-Type` header
    Header,
    /// Leading byte signature
    Signature,
    /// Configured default
    Default,
}

/// Map a declared content type to an extension
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        "video/mp4" => "mp4",
        _ => return None,
    };
    Some(ext)
}

/// Match leading bytes against known binary signatures
pub fn extension_from_signature(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("png")
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some("gif")
    } else if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        Some("webp")
    } else if head.len() >= 12 && &head[4..8] == b"ftyp" && (&head[8..12] == b"avif" || &head[8..12] == b"avis") {
        Some("avif")
    } else if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        Some("tiff")
    } else if head.starts_with(b"%PDF") {
        Some("pdf")
    } else if head.starts_with(b"BM") && head.len() >= 26 {
        Some("bmp")
    } else {
        None
    }
}

/// Pick an extension: declared header, then signature, then `default`
pub fn detect_extension(
    content_type: Option<&str>,
    head: &[u8],
    default: &str,
) -> (String, DetectionSource) {
    if let Some(ext) = content_type.and_then(extension_from_content_type) {
        return (ext.to_string(), DetectionSource::Header);
    }
    if let Some(ext) = extension_from_signature(head) {
        return (ext.to_string(), DetectionSource::Signature);
    }
    (default.trim_start_matches('.').to_string(), DetectionSource::Default)
}

/// Whether the payload looks like an HTML page rather than binary content
pub fn looks_like_html(content_type: Option<&str>, head: &[u8]) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return true;
    }

    let prefix = String::from_utf8_lossy(&head[..head.len().min(512)]).to_ascii_lowercase();
    let prefix = prefix.trim_start();
    prefix.starts_with("<!doctype html") || prefix.starts_with("<html")
}

/// Pixel dimensions read from an image header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Width over height, rounded to two decimals
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        (self.width as f64 / self.height as f64 * 100.0).round() / 100.0
    }
}

/// Read image dimensions from the file header (PNG, GIF, JPEG, WebP, BMP)
pub fn read_dimensions(data: &[u8]) -> Option<Dimensions> {
    match extension_from_signature(data)? {
        "png" => png_dimensions(data),
        "gif" => gif_dimensions(data),
        "jpg" => jpeg_dimensions(data),
        "webp" => webp_dimensions(data),
        "bmp" => bmp_dimensions(data),
        _ => None,
    }
}

fn be_u16(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]) as u32)
}

fn le_u16(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]) as u32)
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn le_u24(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 3)?;
    Some(bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16)
}

fn png_dimensions(data: &[u8]) -> Option<Dimensions> {
    // IHDR is always the first chunk
    if data.get(12..16)? != b"IHDR" {
        return None;
    }
    Some(Dimensions {
        width: be_u32(data, 16)?,
        height: be_u32(data, 20)?,
    })
}

fn gif_dimensions(data: &[u8]) -> Option<Dimensions> {
    Some(Dimensions {
        width: le_u16(data, 6)?,
        height: le_u16(data, 8)?,
    })
}

fn bmp_dimensions(data: &[u8]) -> Option<Dimensions> {
    let width = i32::from_le_bytes(data.get(18..22)?.try_into().ok()?);
    let height = i32::from_le_bytes(data.get(22..26)?.try_into().ok()?);
    Some(Dimensions {
        width: width.unsigned_abs(),
        height: height.unsigned_abs(),
    })
}

fn jpeg_dimensions(data: &[u8]) -> Option<Dimensions> {
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];

        // Fill bytes and standalone markers carry no length
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let length = be_u16(data, pos + 2)? as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            return Some(Dimensions {
                height: be_u16(data, pos + 5)?,
                width: be_u16(data, pos + 7)?,
            });
        }

        pos += 2 + length;
    }

    None
}

fn webp_dimensions(data: &[u8]) -> Option<Dimensions> {
    match data.get(12..16)? {
        b"VP8 " => Some(Dimensions {
            width: le_u16(data, 26)? & 0x3FFF,
            height: le_u16(data, 28)? & 0x3FFF,
        }),
        b"VP8L" => {
            let b = data.get(21..25)?;
            let bits = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            Some(Dimensions {
                width: (bits & 0x3FFF) + 1,
                height: ((bits >> 14) & 0x3FFF) + 1,
            })
        }
        b"VP8X" => Some(Dimensions {
            width: le_u24(data, 24)? + 1,
            height: le_u24(data, 27)? + 1,
        }),
        _ => None,
    }
}
