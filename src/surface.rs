//! 2D drawing surfaces: the canvas-like trait and a CPU RGBA raster.

use std::path::Path;

use crate::error::RenderError;

/// 8-bit color with floating-point opacity (canvas `rgba()` semantics)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity, 0.0 - 1.0
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }
}

/// Minimal immediate-mode drawing target
pub trait DrawingSurface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);

    /// Stroke connected segments through `points`
    fn stroke_polyline(&mut self, points: &[(f32, f32)], line_width: f32, color: Rgba);
}

/// RGBA8 pixel buffer with source-over blending
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Framebuffer {
    /// Transparent black framebuffer
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        })
    }

    /// Raw RGBA8 bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(rgba)
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba) {
        let offset = ((y * self.width + x) * 4) as usize;
        let alpha = color.a.clamp(0.0, 1.0);
        let dst = &mut self.pixels[offset..offset + 4];
        for (channel, src) in dst.iter_mut().zip([color.r, color.g, color.b]) {
            let mixed = src as f32 * alpha + *channel as f32 * (1.0 - alpha);
            *channel = mixed.round() as u8;
        }
        let dst_alpha = dst[3] as f32 / 255.0;
        dst[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round() as u8;
    }

    /// Pixel span covered by [start, start + len), clipped to `limit`
    fn span(start: f32, len: f32, limit: u32) -> std::ops::Range<u32> {
        let from = start.round().clamp(0.0, limit as f32) as u32;
        let to = (start + len).round().clamp(0.0, limit as f32) as u32;
        from..to.max(from)
    }

    /// Write the frame as a PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )?;
        Ok(())
    }
}

impl DrawingSurface for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        for py in Self::span(y, height, self.height) {
            for px in Self::span(x, width, self.width) {
                self.blend(px, py, color);
            }
        }
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], line_width: f32, color: Rgba) {
        // Each pixel is blended once per stroke, however many segments cover it
        let mut covered = vec![false; (self.width * self.height) as usize];
        let half = line_width / 2.0;

        for segment in points.windows(2) {
            let (x0, y0) = segment[0];
            let (x1, y1) = segment[1];
            let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;

            for step in 0..=steps {
                let t = step as f32 / steps as f32;
                let cx = x0 + (x1 - x0) * t;
                let cy = y0 + (y1 - y0) * t;
                for py in Self::span(cy - half, line_width, self.height) {
                    for px in Self::span(cx - half, line_width, self.width) {
                        covered[(py * self.width + px) as usize] = true;
                    }
                }
            }
        }

        for (index, _) in covered.iter().enumerate().filter(|(_, &hit)| hit) {
            let index = index as u32;
            self.blend(index % self.width, index / self.width, color);
        }
    }
}
