//! Image compositor: paints opaque rectangles over a source image.

use std::io::Cursor;

use blackline_core::{Error, RedactionBox, Result};
use image::{ImageFormat, Rgb, RgbImage};
use tracing::debug;

/// Trait for image compositors. A failed composite is an error, never the
/// unmodified source.
pub trait ImageCompositor: Send + Sync {
    /// Returns the encoded redacted image.
    fn composite(&self, image: &[u8], boxes: &[RedactionBox]) -> Result<Vec<u8>>;
}

/// Raster compositor: decodes PNG/JPEG, fills each box, re-encodes as PNG.
#[derive(Debug, Clone, Copy)]
pub struct RasterCompositor {
    pub fill: [u8; 3],
}

impl Default for RasterCompositor {
    fn default() -> Self {
        Self { fill: [0, 0, 0] }
    }
}

impl ImageCompositor for RasterCompositor {
    fn composite(&self, image: &[u8], boxes: &[RedactionBox]) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| Error::Compositor(format!("Failed to decode image: {}", e)))?;
        let mut canvas: RgbImage = decoded.to_rgb8();

        for b in boxes {
            fill_rect(&mut canvas, b, Rgb(self.fill));
        }

        let mut out = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| Error::Compositor(format!("Failed to encode image: {}", e)))?;
        debug!("Composited {} boxes onto {}x{} image", boxes.len(), canvas.width(), canvas.height());
        Ok(out)
    }
}

/// Fill the pixel cells a box touches, clamped to the canvas.
fn fill_rect(canvas: &mut RgbImage, b: &RedactionBox, color: Rgb<u8>) {
    let (w, h) = (canvas.width() as f64, canvas.height() as f64);
    let x0 = b.x.floor().clamp(0.0, w) as u32;
    let y0 = b.y.floor().clamp(0.0, h) as u32;
    let x1 = (b.x + b.width).ceil().clamp(0.0, w) as u32;
    let y1 = (b.y + b.height).ceil().clamp(0.0, h) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}
