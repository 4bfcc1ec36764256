//! Screen captures.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// A screen capture as encoded PNG bytes.
#[derive(Debug, Clone)]
pub struct Snapshot {
	png: Vec<u8>,
}

impl Snapshot {
	pub fn from_png(png: Vec<u8>) -> Self {
		Self { png }
	}

	/// Builds a capture from raw RGBA pixels, row-major.
	pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
		let img = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
			Error::InvalidPixels(format!("buffer does not match {width}x{height} RGBA"))
		})?;
		let mut out = Cursor::new(Vec::new());
		DynamicImage::ImageRgba8(img).write_to(&mut out, ImageFormat::Png)?;
		Ok(Self::from_png(out.into_inner()))
	}

	pub fn as_png(&self) -> &[u8] {
		&self.png
	}

	/// Encodes the capture as `format` (`png`, `jpg`, `bmp`, ...).
	///
	/// PNG is returned as captured; other formats are decoded and re-encoded.
	pub fn encode(&self, format: &str) -> Result<Vec<u8>> {
		let format = parse_format(format)?;
		if format == ImageFormat::Png {
			return Ok(self.png.clone());
		}

		let decoded = image::load_from_memory_with_format(&self.png, ImageFormat::Png)?;
		let decoded = match format {
			// No alpha channel in these encoders.
			ImageFormat::Jpeg | ImageFormat::Bmp => DynamicImage::ImageRgb8(decoded.to_rgb8()),
			_ => decoded,
		};

		let mut out = Cursor::new(Vec::new());
		decoded.write_to(&mut out, format)?;
		Ok(out.into_inner())
	}

	/// Encodes the capture as `format` and writes it to `path`.
	pub async fn write_to_file(&self, path: &Path, format: &str) -> Result<()> {
		let bytes = self.encode(format)?;
		tokio::fs::write(path, bytes).await?;
		Ok(())
	}
}

fn parse_format(name: &str) -> Result<ImageFormat> {
	ImageFormat::from_extension(name.trim_start_matches('.'))
		.filter(|format| format.writing_enabled())
		.ok_or_else(|| Error::UnknownImageFormat(name.to_string()))
}
