//! PNG import and export for image surfaces.
//!
//! Export un-premultiplies the internal buffer; `Rgb24` surfaces are
//! written without an alpha channel and `A8`/`A1` surfaces as grayscale.
//! Import always produces an `ARgb32` surface with premultiplied pixels.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path as FsPath;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use tiny_skia::Pixmap;

use crate::error::{Result, Status};
use crate::surface::{Format, ImageSurface};

fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        0
    } else {
        let v = (channel as u32 * 255 + alpha as u32 / 2) / alpha as u32;
        v.min(255) as u8
    }
}

impl ImageSurface {
    /// Write the surface to a PNG file.
    ///
    /// # Returns
    /// `Err(Status::SurfaceFinished)` on a finished surface,
    /// `Err(Status::WriteError)` when the file cannot be created or encoded.
    pub fn write_to_png<P: AsRef<FsPath>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(|_| Status::WriteError)?;
        self.write_to_png_stream(BufWriter::new(file))
    }

    /// Write the surface as PNG to an arbitrary writer.
    pub fn write_to_png_stream<W: Write>(&self, writer: W) -> Result<()> {
        let data = self.data()?;
        let width = self.width();
        let height = self.height();

        let (pixels, color_type) = match self.format() {
            Format::ARgb32 => {
                let mut out = Vec::with_capacity(data.len());
                for px in data.chunks_exact(4) {
                    let a = px[3];
                    out.push(unpremultiply(px[0], a));
                    out.push(unpremultiply(px[1], a));
                    out.push(unpremultiply(px[2], a));
                    out.push(a);
                }
                (out, ExtendedColorType::Rgba8)
            }
            Format::Rgb24 => {
                let mut out = Vec::with_capacity(data.len() / 4 * 3);
                for px in data.chunks_exact(4) {
                    out.push(px[0]);
                    out.push(px[1]);
                    out.push(px[2]);
                }
                (out, ExtendedColorType::Rgb8)
            }
            Format::A8 | Format::A1 => {
                let out: Vec<u8> = data.chunks_exact(4).map(|px| px[3]).collect();
                (out, ExtendedColorType::L8)
            }
        };

        PngEncoder::new(writer)
            .write_image(&pixels, width, height, color_type)
            .map_err(|_| Status::WriteError)
    }

    /// Read a PNG file into a new `ARgb32` surface.
    ///
    /// # Returns
    /// `Err(Status::FileNotFound)` when the file does not exist,
    /// `Err(Status::ReadError)` when it cannot be read or decoded.
    pub fn from_png<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Status::FileNotFound,
            _ => Status::ReadError,
        })?;
        Self::decode_png(&data)
    }

    /// Read PNG data from an arbitrary reader into a new `ARgb32` surface.
    pub fn from_png_stream<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|_| Status::ReadError)?;
        Self::decode_png(&data)
    }

    fn decode_png(data: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(data, ImageFormat::Png)
            .map_err(|_| Status::ReadError)?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut pixmap = Pixmap::new(width, height).ok_or(Status::NoMemory)?;
        let out = pixmap.data_mut();
        for (i, px) in rgba.pixels().enumerate() {
            let [r, g, b, a] = px.0;
            // Premultiply into the internal representation.
            out[i * 4] = (r as u32 * a as u32 / 255) as u8;
            out[i * 4 + 1] = (g as u32 * a as u32 / 255) as u8;
            out[i * 4 + 2] = (b as u32 * a as u32 / 255) as u8;
            out[i * 4 + 3] = a;
        }

        Ok(ImageSurface::from_pixmap(pixmap, Format::ARgb32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_round_trip_in_memory() {
        let mut surface = ImageSurface::new(Format::ARgb32, 2, 1).unwrap();
        {
            let data = surface.data_mut().unwrap();
            // Opaque red, half-transparent green (premultiplied).
            data.copy_from_slice(&[255, 0, 0, 255, 0, 128, 0, 128]);
        }

        let mut encoded = Vec::new();
        surface.write_to_png_stream(&mut encoded).unwrap();

        let decoded = ImageSurface::from_png_stream(&encoded[..]).unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 1);
        assert_eq!(decoded.pixel(0, 0), Some((255, 0, 0, 255)));
        let (r, g, b, a) = decoded.pixel(1, 0).unwrap();
        assert_eq!((r, b), (0, 0));
        assert_eq!(a, 128);
        // Premultiplied green channel survives the unpremultiply/premultiply
        // round trip to within rounding.
        assert!((g as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_from_png_missing_file() {
        assert_eq!(
            ImageSurface::from_png("definitely/not/here.png").err(),
            Some(Status::FileNotFound)
        );
    }

    #[test]
    fn test_from_png_garbage() {
        assert_eq!(
            ImageSurface::from_png_stream(&b"not a png"[..]).err(),
            Some(Status::ReadError)
        );
    }

    #[test]
    fn test_finished_surface_cannot_export() {
        let mut surface = ImageSurface::new(Format::ARgb32, 2, 2).unwrap();
        surface.finish();
        let mut out = Vec::new();
        assert_eq!(
            surface.write_to_png_stream(&mut out).err(),
            Some(Status::SurfaceFinished)
        );
    }
}
