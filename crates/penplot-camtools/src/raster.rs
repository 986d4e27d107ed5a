//! Raster Codec
//!
//! Locates the header marker in a raw byte stream returned by the edge
//! accelerator and unpacks the payload that follows into a [`RasterFrame`].
//!
//! Wire layout: `[1-byte marker][payload]`. No length prefix, no checksum;
//! the payload size is fixed by the agreed frame geometry and mode.

use image::{GrayImage, Luma};
use penplot_core::{RasterError, RasterFrame};
use serde::{Deserialize, Serialize};

/// Byte values above this are ON in byte-per-pixel mode
pub const BYTE_THRESHOLD: u8 = 127;

/// Bit order inside a packed byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitOrder {
    /// Most significant bit is the first pixel
    #[default]
    Big,
    /// Least significant bit is the first pixel
    Little,
}

/// Payload encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelMode {
    /// Eight pixels per byte
    #[default]
    Packed1bpp,
    /// One byte per pixel, thresholded at the midpoint
    BytePerPixel,
}

/// Frame geometry and wire encoding agreed with the accelerator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterSpec {
    /// Frame width in pixels
    pub width: usize,
    /// Frame height in pixels
    pub height: usize,
    /// Marker byte preceding the payload
    pub header_marker: u8,
    /// Payload encoding
    #[serde(default)]
    pub mode: PixelMode,
    /// Bit order for packed payloads
    #[serde(default)]
    pub bit_order: BitOrder,
}

impl Default for RasterSpec {
    fn default() -> Self {
        Self {
            width: 170,
            height: 240,
            header_marker: 0xAA,
            mode: PixelMode::Packed1bpp,
            bit_order: BitOrder::Big,
        }
    }
}

impl RasterSpec {
    /// Payload bytes required after the marker
    pub fn payload_len(&self) -> usize {
        let pixels = self.width * self.height;
        match self.mode {
            PixelMode::Packed1bpp => pixels.div_ceil(8),
            PixelMode::BytePerPixel => pixels,
        }
    }

    /// Full frame length on the wire, marker included
    pub fn wire_len(&self) -> usize {
        1 + self.payload_len()
    }
}

/// Decoder for header + payload raster dumps
#[derive(Debug, Clone, Default)]
pub struct RasterCodec {
    spec: RasterSpec,
}

impl RasterCodec {
    /// Create a codec for the given frame layout
    pub fn new(spec: RasterSpec) -> Self {
        Self { spec }
    }

    /// The frame layout this codec expects
    pub fn spec(&self) -> &RasterSpec {
        &self.spec
    }

    /// Decode the first frame found in `bytes`.
    ///
    /// Bytes before the first marker are skipped; bytes after the payload
    /// are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<RasterFrame, RasterError> {
        let spec = &self.spec;
        if spec.width == 0 || spec.height == 0 {
            return Err(RasterError::InvalidFrame {
                reason: format!("non-positive dimensions {}x{}", spec.width, spec.height),
            });
        }

        let marker_pos = bytes
            .iter()
            .position(|&b| b == spec.header_marker)
            .ok_or(RasterError::HeaderNotFound {
                marker: spec.header_marker,
                searched: bytes.len(),
            })?;
        if marker_pos > 0 {
            tracing::debug!("Skipped {} bytes before header marker", marker_pos);
        }

        let payload = &bytes[marker_pos + 1..];
        let needed = spec.payload_len();
        if payload.len() < needed {
            return Err(RasterError::TruncatedPayload {
                needed,
                available: payload.len(),
            });
        }
        let payload = &payload[..needed];

        let pixels = spec.width * spec.height;
        let data = match spec.mode {
            PixelMode::Packed1bpp => unpack_bits(payload, pixels, spec.bit_order),
            PixelMode::BytePerPixel => payload
                .iter()
                .map(|&b| u8::from(b > BYTE_THRESHOLD))
                .collect(),
        };

        RasterFrame::from_raw(spec.width, spec.height, data)
    }
}

fn unpack_bits(payload: &[u8], pixels: usize, order: BitOrder) -> Vec<u8> {
    (0..pixels)
        .map(|i| {
            let byte = payload[i / 8];
            let shift = match order {
                BitOrder::Big => 7 - (i % 8),
                BitOrder::Little => i % 8,
            };
            (byte >> shift) & 1
        })
        .collect()
}

/// Pack a frame into 1bpp bytes, trailing bits zero
pub fn encode_packed(frame: &RasterFrame, order: BitOrder) -> Vec<u8> {
    let values = frame.as_slice();
    let mut out = vec![0u8; values.len().div_ceil(8)];
    for (i, &v) in values.iter().enumerate() {
        if v != 0 {
            let shift = match order {
                BitOrder::Big => 7 - (i % 8),
                BitOrder::Little => i % 8,
            };
            out[i / 8] |= 1 << shift;
        }
    }
    out
}

/// Build the full wire frame (marker + payload) for a raster
pub fn encode_frame(frame: &RasterFrame, spec: &RasterSpec) -> Vec<u8> {
    let mut out = Vec::with_capacity(spec.wire_len());
    out.push(spec.header_marker);
    match spec.mode {
        PixelMode::Packed1bpp => out.extend(encode_packed(frame, spec.bit_order)),
        PixelMode::BytePerPixel => out.extend(frame.as_slice().iter().map(|&v| v * 255)),
    }
    out
}

/// Render a frame as an 8-bit image, ON = 255
pub fn to_luma(frame: &RasterFrame) -> GrayImage {
    GrayImage::from_fn(frame.width() as u32, frame.height() as u32, |x, y| {
        Luma([if frame.get(x as usize, y as usize) { 255 } else { 0 }])
    })
}

/// Threshold an 8-bit image into a binary frame
pub fn from_luma(image: &GrayImage) -> RasterFrame {
    RasterFrame::from_fn(image.width() as usize, image.height() as usize, |x, y| {
        image.get_pixel(x as u32, y as u32)[0] > BYTE_THRESHOLD
    })
}
