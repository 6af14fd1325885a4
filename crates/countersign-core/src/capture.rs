use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Intrinsic pixel buffer of a fresh pad.
pub const DEFAULT_PAD_WIDTH: u32 = 400;
pub const DEFAULT_PAD_HEIGHT: u32 = 150;

const PAYLOAD_PREFIX: &str = "data:image/x-portable-graymap;base64,";
const INK: u8 = 0;
const BACKGROUND: u8 = 255;

/// Upper bound on decoded raster size. Payloads are stored as-is, so the
/// header dimensions are untrusted input.
const MAX_RASTER_PIXELS: u64 = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadState {
    Idle,
    Drawing,
}

/// Opaque grayscale raster backing a signature payload.
///
/// Serialized as a binary PGM image wrapped in base64, optionally carried
/// with a data-URI prefix. The background is always opaque white; a
/// transparent export is never produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl SignatureRaster {
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; (width * height) as usize],
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> String {
        let mut bytes = format!("P5 {} {} 255\n", self.width, self.height).into_bytes();
        bytes.extend_from_slice(&self.pixels);
        format!("{PAYLOAD_PREFIX}{}", STANDARD.encode(bytes))
    }

    /// Decode a serialized payload back into a raster. Accepts payloads
    /// with or without the data-URI prefix.
    pub fn from_payload(payload: &str) -> Result<Self> {
        let encoded = payload
            .split_once("base64,")
            .map_or(payload, |(_, rest)| rest);

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::MalformedPayload(e.to_string()))?;

        let header_end = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| Error::MalformedPayload("missing raster header".into()))?;
        let header = std::str::from_utf8(&bytes[..header_end])
            .map_err(|e| Error::MalformedPayload(e.to_string()))?;

        let mut parts = header.split_ascii_whitespace();
        if parts.next() != Some("P5") {
            return Err(Error::MalformedPayload("not a grayscale raster".into()));
        }
        let width: u32 = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::MalformedPayload("bad width".into()))?;
        let height: u32 = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::MalformedPayload("bad height".into()))?;

        // Dimensions come straight out of the stored payload; multiply in
        // u64 and bound them before trusting the product.
        let expected = u64::from(width) * u64::from(height);
        if expected == 0 || expected > MAX_RASTER_PIXELS {
            return Err(Error::MalformedPayload(format!(
                "implausible dimensions {width}x{height}"
            )));
        }

        let pixels = bytes[header_end + 1..].to_vec();
        if pixels.len() as u64 != expected {
            return Err(Error::MalformedPayload(format!(
                "expected {expected} pixels, got {}",
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    fn set(&mut self, x: i64, y: i64) {
        if x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height) {
            self.pixels[(y * i64::from(self.width) + x) as usize] = INK;
        }
    }

    fn draw_segment(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.set(x, y);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

/// Freehand drawing surface for capturing a signature.
///
/// Pointer input arrives in display coordinates and is scaled to the
/// intrinsic buffer, so ink stays where the user drew it even when the
/// surface is resized responsively. Each up-transition (pointer up or
/// pointer leaving the surface) saves the current ink to a payload.
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    display_width: f64,
    display_height: f64,
    strokes: Vec<Vec<(f64, f64)>>,
    state: PadState,
    payload: Option<String>,
}

impl SignaturePad {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            display_width: f64::from(width),
            display_height: f64::from(height),
            strokes: Vec::new(),
            state: PadState::Idle,
            payload: None,
        }
    }

    /// Tell the pad how large it is currently rendered on screen.
    pub fn set_display_size(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.display_width = width;
            self.display_height = height;
        }
    }

    #[must_use]
    pub fn state(&self) -> PadState {
        self.state
    }

    fn scale(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * f64::from(self.width) / self.display_width,
            y * f64::from(self.height) / self.display_height,
        )
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        let point = self.scale(x, y);
        self.strokes.push(vec![point]);
        self.state = PadState::Drawing;
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if self.state != PadState::Drawing {
            return;
        }
        let point = self.scale(x, y);
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// End the current stroke and save the ink. Returns the serialized
    /// payload when any ink exists.
    pub fn pointer_up(&mut self) -> Option<&str> {
        if self.state == PadState::Drawing {
            self.state = PadState::Idle;
            self.save();
        }
        self.payload.as_deref()
    }

    /// The pointer leaving the surface ends the stroke the same way a
    /// pointer-up does.
    pub fn pointer_leave(&mut self) -> Option<&str> {
        self.pointer_up()
    }

    fn save(&mut self) {
        if !self.has_ink() {
            self.payload = None;
            return;
        }
        let mut raster = SignatureRaster::blank(self.width, self.height);
        for stroke in &self.strokes {
            match stroke.as_slice() {
                [] => {}
                [(x, y)] => {
                    #[allow(clippy::cast_possible_truncation)]
                    raster.set(x.round() as i64, y.round() as i64);
                }
                points => {
                    for pair in points.windows(2) {
                        #[allow(clippy::cast_possible_truncation)]
                        raster.draw_segment(
                            pair[0].0.round() as i64,
                            pair[0].1.round() as i64,
                            pair[1].0.round() as i64,
                            pair[1].1.round() as i64,
                        );
                    }
                }
            }
        }
        self.payload = Some(raster.to_payload());
    }

    fn has_ink(&self) -> bool {
        self.strokes.iter().any(|s| !s.is_empty())
    }

    /// Reset the surface and the serialized payload to empty.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.payload = None;
        self.state = PadState::Idle;
    }

    /// Submission must be rejected locally while this is true.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(DEFAULT_PAD_WIDTH, DEFAULT_PAD_HEIGHT)
    }
}
