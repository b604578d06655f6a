//! Raster image decoding for embedding as PDF image XObjects.
//!
//! JPEG data passes through untouched as DCTDecode; only the SOF header is
//! scanned for dimensions. PNG data is decoded with the `png` crate and
//! re-compressed with zlib as FlateDecode.

use crate::error::CoreError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl ColorSpace {
    pub(crate) fn pdf_name(&self) -> &'static [u8] {
        match self {
            ColorSpace::DeviceGray => b"DeviceGray",
            ColorSpace::DeviceRgb => b"DeviceRGB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageFilter {
    Dct,
    Flate,
}

impl ImageFilter {
    pub(crate) fn pdf_name(&self) -> &'static [u8] {
        match self {
            ImageFilter::Dct => b"DCTDecode",
            ImageFilter::Flate => b"FlateDecode",
        }
    }
}

/// A decoded image ready to become an image XObject.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub(crate) bits_per_component: u8,
    pub(crate) filter: ImageFilter,
    pub(crate) data: Vec<u8>,
}

impl ImageData {
    /// Sniff the format from magic bytes and decode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.starts_with(&[0xFF, 0xD8]) {
            Self::from_jpeg(bytes)
        } else if bytes.starts_with(&PNG_MAGIC) {
            Self::from_png(bytes)
        } else {
            Err(CoreError::Image("Unrecognized image format".into()))
        }
    }

    /// Wrap JPEG data for DCTDecode embedding. The data is not re-encoded.
    pub fn from_jpeg(bytes: &[u8]) -> Result<Self, CoreError> {
        let (width, height, components) = jpeg_dimensions(bytes)?;
        if width == 0 || height == 0 {
            return Err(CoreError::Image("JPEG has zero dimensions".into()));
        }
        let color_space = match components {
            1 => ColorSpace::DeviceGray,
            3 => ColorSpace::DeviceRgb,
            n => {
                return Err(CoreError::Image(format!(
                    "Unsupported JPEG component count: {}",
                    n
                )))
            }
        };
        Ok(Self {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: ImageFilter::Dct,
            data: bytes.to_vec(),
        })
    }

    /// Decode a PNG to 8-bit samples and compress as FlateDecode.
    /// Alpha channels are stripped.
    pub fn from_png(bytes: &[u8]) -> Result<Self, CoreError> {
        let mut decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| CoreError::Image(format!("Failed to read PNG: {}", e)))?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|e| CoreError::Image(format!("Failed to decode PNG: {}", e)))?;
        buf.truncate(info.buffer_size());

        if info.width == 0 || info.height == 0 {
            return Err(CoreError::Image("PNG has zero dimensions".into()));
        }

        let (color_space, samples) = match info.color_type {
            png::ColorType::Grayscale => (ColorSpace::DeviceGray, buf),
            png::ColorType::Rgb => (ColorSpace::DeviceRgb, buf),
            png::ColorType::GrayscaleAlpha => (
                ColorSpace::DeviceGray,
                buf.chunks_exact(2).map(|px| px[0]).collect(),
            ),
            png::ColorType::Rgba => (
                ColorSpace::DeviceRgb,
                buf.chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect(),
            ),
            other => {
                return Err(CoreError::Image(format!(
                    "Unsupported PNG color type after expansion: {:?}",
                    other
                )))
            }
        };

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&samples)?;
        let data = encoder.finish()?;

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space,
            bits_per_component: 8,
            filter: ImageFilter::Flate,
            data,
        })
    }
}

/// Scan JPEG markers for the frame header and return (width, height,
/// component count).
fn jpeg_dimensions(bytes: &[u8]) -> Result<(u32, u32, u8), CoreError> {
    let mut pos = 2; // past SOI
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(CoreError::Image("Malformed JPEG marker stream".into()));
        }
        let marker = bytes[pos + 1];
        // Standalone markers without a length field
        if (0xD0..=0xD9).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 {
            return Err(CoreError::Image("Invalid JPEG segment length".into()));
        }
        let is_sof = matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE
                | 0xCF
        );
        if is_sof {
            if pos + 9 >= bytes.len() {
                return Err(CoreError::Image("Truncated JPEG frame header".into()));
            }
            let height = u16::from_be_bytes([bytes[pos + 5], bytes[pos + 6]]) as u32;
            let width = u16::from_be_bytes([bytes[pos + 7], bytes[pos + 8]]) as u32;
            let components = bytes[pos + 9];
            return Ok((width, height, components));
        }
        pos += 2 + len;
    }
    Err(CoreError::Image("No JPEG frame header found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal JPEG header: SOI, APP0 stub, SOF0 for a 16x8 RGB image.
    fn fake_jpeg(width: u16, height: u16, components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // APP0, length 4 (no payload beyond the length itself)
        data.extend([0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        // SOF0
        let seg_len = (8 + 3 * components as u16).to_be_bytes();
        data.extend([0xFF, 0xC0]);
        data.extend(seg_len);
        data.push(8); // precision
        data.extend(height.to_be_bytes());
        data.extend(width.to_be_bytes());
        data.push(components);
        for i in 0..components {
            data.extend([i + 1, 0x11, 0x00]);
        }
        data
    }

    fn small_png(color: png::ColorType) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 2, 2);
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let samples_per_px = match color {
                png::ColorType::Grayscale => 1,
                png::ColorType::GrayscaleAlpha => 2,
                png::ColorType::Rgb => 3,
                png::ColorType::Rgba => 4,
                _ => unreachable!(),
            };
            let data = vec![0x7Fu8; 4 * samples_per_px];
            writer.write_image_data(&data).unwrap();
        }
        out
    }

    #[test]
    fn test_jpeg_dimensions_parsed() {
        let img = ImageData::from_bytes(&fake_jpeg(640, 480, 3)).unwrap();
        assert_eq!(img.width, 640);
        assert_eq!(img.height, 480);
        assert_eq!(img.color_space, ColorSpace::DeviceRgb);
        assert_eq!(img.filter, ImageFilter::Dct);
    }

    #[test]
    fn test_jpeg_grayscale() {
        let img = ImageData::from_bytes(&fake_jpeg(10, 10, 1)).unwrap();
        assert_eq!(img.color_space, ColorSpace::DeviceGray);
    }

    #[test]
    fn test_jpeg_cmyk_rejected() {
        let result = ImageData::from_bytes(&fake_jpeg(10, 10, 4));
        assert!(result.is_err());
    }

    #[test]
    fn test_jpeg_zero_size_rejected() {
        let result = ImageData::from_bytes(&fake_jpeg(0, 10, 3));
        assert!(result.is_err());
    }

    #[test]
    fn test_png_rgb_roundtrip() {
        let img = ImageData::from_bytes(&small_png(png::ColorType::Rgb)).unwrap();
        assert_eq!(img.width, 2);
        assert_eq!(img.height, 2);
        assert_eq!(img.color_space, ColorSpace::DeviceRgb);
        assert_eq!(img.filter, ImageFilter::Flate);
    }

    #[test]
    fn test_png_rgba_alpha_stripped() {
        let img = ImageData::from_bytes(&small_png(png::ColorType::Rgba)).unwrap();
        assert_eq!(img.color_space, ColorSpace::DeviceRgb);

        // Decompress and verify 3 bytes per pixel remain
        use std::io::Read;
        let mut decoder = flate2::read::ZlibDecoder::new(&img.data[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw).unwrap();
        assert_eq!(raw.len(), 2 * 2 * 3);
    }

    #[test]
    fn test_png_grayscale_alpha_stripped() {
        let img = ImageData::from_bytes(&small_png(png::ColorType::GrayscaleAlpha)).unwrap();
        assert_eq!(img.color_space, ColorSpace::DeviceGray);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = ImageData::from_bytes(b"GIF89a not supported");
        assert!(matches!(result, Err(CoreError::Image(_))));
    }
}
