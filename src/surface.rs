//! Drawable targets backed by in-memory pixel buffers.
//!
//! An [`ImageSurface`] owns a premultiplied RGBA pixel buffer that drawing
//! contexts render into. The declared [`Format`] governs how caller-supplied
//! data is interpreted, what the surface's [`Content`] is, and how PNG
//! export treats the channels; internally every surface stores 4 bytes per
//! pixel.

use std::fmt;

use tiny_skia::Pixmap;

use crate::error::{Result, Status};

/// Pixel format of caller-visible image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// 4 bytes per pixel: premultiplied red, green, blue, alpha
    ARgb32,
    /// 4 bytes per pixel: red, green, blue, one unused byte
    Rgb24,
    /// 1 byte per pixel: alpha only
    A8,
    /// 1 bit per pixel: alpha only, LSB-first within each byte
    A1,
}

impl Format {
    fn bits_per_pixel(self) -> usize {
        match self {
            Format::ARgb32 | Format::Rgb24 => 32,
            Format::A8 => 8,
            Format::A1 => 1,
        }
    }

    /// Compute the minimal stride for an image row, aligned to 4 bytes.
    ///
    /// # Returns
    /// `Err(Status::InvalidStride)` when the width is zero or too large for
    /// the stride to be computed.
    pub fn stride_for_width(self, width: u32) -> Result<usize> {
        if width == 0 || width > (i32::MAX as u32) / 8 {
            return Err(Status::InvalidStride);
        }
        let bits = width as usize * self.bits_per_pixel();
        Ok((bits + 31) / 32 * 4)
    }

    /// The content classification implied by this format.
    pub fn content(self) -> Content {
        match self {
            Format::ARgb32 => Content::ColorAlpha,
            Format::Rgb24 => Content::Color,
            Format::A8 | Format::A1 => Content::Alpha,
        }
    }
}

/// What a surface (or pattern) carries: color, alpha, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Color,
    Alpha,
    ColorAlpha,
}

impl Content {
    /// The image format used to back this content.
    pub fn format(self) -> Format {
        match self {
            Content::Color => Format::Rgb24,
            Content::Alpha => Format::A8,
            Content::ColorAlpha => Format::ARgb32,
        }
    }
}

/// The backend kind of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceType {
    Image,
}

/// An in-memory drawable surface.
pub struct ImageSurface {
    pixmap: Pixmap,
    format: Format,
    finished: bool,
    device_offset: (f64, f64),
}

impl fmt::Debug for ImageSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSurface")
            .field("format", &self.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("finished", &self.finished)
            .finish()
    }
}

impl ImageSurface {
    /// Create a surface initialized to transparent black.
    ///
    /// # Returns
    /// `Err(Status::NoMemory)` when the buffer cannot be allocated
    /// (including zero-sized dimensions).
    pub fn new(format: Format, width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(Status::NoMemory)?;
        Ok(ImageSurface {
            pixmap,
            format,
            finished: false,
            device_offset: (0.0, 0.0),
        })
    }

    /// Create a surface from caller-provided pixel data.
    ///
    /// `data` is interpreted according to `format` (see [`Format`]) with
    /// the given row stride and copied into the surface.
    ///
    /// # Returns
    /// `Err(Status::InvalidStride)` when the stride is not 4-byte aligned
    /// or smaller than the minimal stride for the width;
    /// `Err(Status::NullPointer)` when `data` is too short.
    pub fn from_data(
        data: &[u8],
        format: Format,
        width: u32,
        height: u32,
        stride: usize,
    ) -> Result<Self> {
        let min_stride = format.stride_for_width(width)?;
        if stride < min_stride || stride % 4 != 0 {
            return Err(Status::InvalidStride);
        }
        if data.len() < stride * height as usize {
            return Err(Status::NullPointer);
        }

        let mut surface = ImageSurface::new(format, width, height)?;
        {
            let w = width as usize;
            let out = surface.pixmap.data_mut();
            for row in 0..height as usize {
                let src = &data[row * stride..];
                let dst = &mut out[row * w * 4..(row + 1) * w * 4];
                match format {
                    Format::ARgb32 => {
                        for x in 0..w {
                            let a = src[x * 4 + 3];
                            // Premultiplied input: no channel may exceed alpha.
                            dst[x * 4] = src[x * 4].min(a);
                            dst[x * 4 + 1] = src[x * 4 + 1].min(a);
                            dst[x * 4 + 2] = src[x * 4 + 2].min(a);
                            dst[x * 4 + 3] = a;
                        }
                    }
                    Format::Rgb24 => {
                        for x in 0..w {
                            dst[x * 4] = src[x * 4];
                            dst[x * 4 + 1] = src[x * 4 + 1];
                            dst[x * 4 + 2] = src[x * 4 + 2];
                            dst[x * 4 + 3] = 255;
                        }
                    }
                    Format::A8 => {
                        for x in 0..w {
                            let a = src[x];
                            dst[x * 4] = 0;
                            dst[x * 4 + 1] = 0;
                            dst[x * 4 + 2] = 0;
                            dst[x * 4 + 3] = a;
                        }
                    }
                    Format::A1 => {
                        for x in 0..w {
                            let bit = (src[x / 8] >> (x % 8)) & 1;
                            let a = if bit != 0 { 255 } else { 0 };
                            dst[x * 4] = 0;
                            dst[x * 4 + 1] = 0;
                            dst[x * 4 + 2] = 0;
                            dst[x * 4 + 3] = a;
                        }
                    }
                }
            }
        }
        Ok(surface)
    }

    /// Create a surface sized and formatted for the given content, suitable
    /// as an intermediate target compatible with this surface.
    pub fn create_similar(&self, content: Content, width: u32, height: u32) -> Result<Self> {
        ImageSurface::new(content.format(), width, height)
    }

    /// The declared pixel format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// The surface's content classification.
    pub fn content(&self) -> Content {
        self.format.content()
    }

    /// The backend type of this surface.
    pub fn surface_type(&self) -> SurfaceType {
        SurfaceType::Image
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Row stride in bytes of the internal buffer.
    ///
    /// The internal buffer always stores 4 bytes per pixel, so this is
    /// `width * 4` regardless of the declared format.
    pub fn stride(&self) -> usize {
        self.width() as usize * 4
    }

    /// The surface's status: `SurfaceFinished` once `finish` has been
    /// called, success otherwise.
    pub fn status(&self) -> Result<()> {
        if self.finished {
            Err(Status::SurfaceFinished)
        } else {
            Ok(())
        }
    }

    /// Whether `finish` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Finish the surface: further drawing or data access fails with
    /// `SurfaceFinished`.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Flush pending drawing. The in-memory backend is always coherent, so
    /// this only exists for API parity.
    pub fn flush(&self) {}

    /// Tell the surface its pixels were modified externally. The in-memory
    /// backend needs no invalidation; kept for API parity.
    pub fn mark_dirty(&mut self) {}

    /// Raw pixel data: premultiplied RGBA, row-major, `stride()` bytes per
    /// row.
    pub fn data(&self) -> Result<&[u8]> {
        if self.finished {
            return Err(Status::SurfaceFinished);
        }
        Ok(self.pixmap.data())
    }

    /// Mutable raw pixel data. Writes must keep channels premultiplied.
    pub fn data_mut(&mut self) -> Result<&mut [u8]> {
        if self.finished {
            return Err(Status::SurfaceFinished);
        }
        Ok(self.pixmap.data_mut())
    }

    /// Read one pixel as premultiplied (r, g, b, a), or `None` when out of
    /// bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8, u8)> {
        let c = self.pixmap.pixel(x, y)?;
        Some((c.red(), c.green(), c.blue(), c.alpha()))
    }

    /// Set the offset added to device coordinates by contexts targeting
    /// this surface.
    pub fn set_device_offset(&mut self, x: f64, y: f64) {
        self.device_offset = (x, y);
    }

    /// The device offset as (x, y).
    pub fn device_offset(&self) -> (f64, f64) {
        self.device_offset
    }

    /// Deep copy of the surface's pixels, used by surface patterns.
    pub(crate) fn snapshot(&self) -> ImageSurface {
        ImageSurface {
            pixmap: self.pixmap.clone(),
            format: self.format,
            finished: false,
            device_offset: (0.0, 0.0),
        }
    }

    pub(crate) fn from_pixmap(pixmap: Pixmap, format: Format) -> ImageSurface {
        ImageSurface {
            pixmap,
            format,
            finished: false,
            device_offset: (0.0, 0.0),
        }
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_for_width() {
        assert_eq!(Format::ARgb32.stride_for_width(100).unwrap(), 400);
        assert_eq!(Format::Rgb24.stride_for_width(100).unwrap(), 400);
        assert_eq!(Format::A8.stride_for_width(100).unwrap(), 100);
        // A8 strides stay 4-byte aligned
        assert_eq!(Format::A8.stride_for_width(5).unwrap(), 8);
        // 1 bit per pixel packs 32 pixels into 4 bytes
        assert_eq!(Format::A1.stride_for_width(32).unwrap(), 4);
        assert_eq!(Format::A1.stride_for_width(33).unwrap(), 8);
        assert_eq!(Format::A1.stride_for_width(0), Err(Status::InvalidStride));
    }

    #[test]
    fn test_new_surface_is_transparent() {
        let surface = ImageSurface::new(Format::ARgb32, 4, 4).unwrap();
        assert_eq!(surface.pixel(0, 0), Some((0, 0, 0, 0)));
        assert_eq!(surface.width(), 4);
        assert_eq!(surface.height(), 4);
        assert_eq!(surface.stride(), 16);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert_eq!(
            ImageSurface::new(Format::ARgb32, 0, 4).err(),
            Some(Status::NoMemory)
        );
    }

    #[test]
    fn test_from_data_argb32() {
        let data: Vec<u8> = vec![
            255, 0, 0, 255, /* */ 0, 128, 0, 128, //
            0, 0, 0, 0, /*    */ 255, 255, 255, 255,
        ];
        let surface = ImageSurface::from_data(&data, Format::ARgb32, 2, 2, 8).unwrap();
        assert_eq!(surface.pixel(0, 0), Some((255, 0, 0, 255)));
        assert_eq!(surface.pixel(1, 0), Some((0, 128, 0, 128)));
        assert_eq!(surface.pixel(0, 1), Some((0, 0, 0, 0)));
    }

    #[test]
    fn test_from_data_a8_with_padding() {
        // Width 5 requires stride 8; two rows.
        let data: Vec<u8> = vec![
            10, 20, 30, 40, 50, 0, 0, 0, //
            60, 70, 80, 90, 100, 0, 0, 0,
        ];
        let surface = ImageSurface::from_data(&data, Format::A8, 5, 2, 8).unwrap();
        assert_eq!(surface.pixel(4, 0), Some((0, 0, 0, 50)));
        assert_eq!(surface.pixel(0, 1), Some((0, 0, 0, 60)));
        assert_eq!(surface.content(), Content::Alpha);
    }

    #[test]
    fn test_from_data_bad_stride() {
        let data = vec![0u8; 64];
        assert_eq!(
            ImageSurface::from_data(&data, Format::ARgb32, 4, 2, 12).err(),
            Some(Status::InvalidStride)
        );
    }

    #[test]
    fn test_from_data_short_buffer() {
        let data = vec![0u8; 8];
        assert_eq!(
            ImageSurface::from_data(&data, Format::ARgb32, 2, 2, 8).err(),
            Some(Status::NullPointer)
        );
    }

    #[test]
    fn test_finish_blocks_data_access() {
        let mut surface = ImageSurface::new(Format::ARgb32, 2, 2).unwrap();
        surface.finish();
        assert_eq!(surface.data().err(), Some(Status::SurfaceFinished));
        assert_eq!(surface.data_mut().err(), Some(Status::SurfaceFinished));
    }

    #[test]
    fn test_create_similar_formats() {
        let surface = ImageSurface::new(Format::ARgb32, 2, 2).unwrap();
        let similar = surface.create_similar(Content::Alpha, 8, 8).unwrap();
        assert_eq!(similar.format(), Format::A8);
        assert_eq!(similar.width(), 8);
    }
}
