use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::bitmap::Bitmap;
use crate::error::ExportError;

/// Encodes `bitmap` as a JPEG of the given quality (clamped to 1..=100)
pub fn write_jpeg<W: Write>(bitmap: &Bitmap, writer: W, quality: u8) -> Result<(), ExportError> {
    let rgb = image::DynamicImage::ImageRgba8(bitmap.to_rgba_image()).to_rgb8();
    let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
    encoder.encode_image(&rgb)?;
    Ok(())
}

/// A saved image written to a uniquely named file, removed when dropped
#[derive(Debug)]
pub struct ExportedFile {
    path: PathBuf,
}

impl ExportedFile {
    /// Writes `bitmap` to `<dir>/<uuid>.jpg`
    pub fn write_jpeg_in(dir: &Path, bitmap: &Bitmap, quality: u8) -> Result<Self, ExportError> {
        let path = dir.join(format!("{}.jpg", Uuid::new_v4()));
        let exported = Self { path };
        let mut writer = BufWriter::new(File::create(&exported.path)?);
        write_jpeg(bitmap, &mut writer, quality)?;
        writer.flush()?;
        log::info!(
            "Exported bitmap {} to {}",
            bitmap.id(),
            exported.path.display()
        );
        Ok(exported)
    }

    /// Writes `bitmap` into the system temporary directory
    pub fn write_temp_jpeg(bitmap: &Bitmap, quality: u8) -> Result<Self, ExportError> {
        Self::write_jpeg_in(&std::env::temp_dir(), bitmap, quality)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExportedFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::error!("Failed to remove {}: {}", self.path.display(), err);
            }
        }
    }
}
