//! In-memory image normalisation.

use std::io::Cursor;

use image::{ImageError, ImageFormat};

/// Decode any supported image and re-encode it as an RGBA PNG.
pub fn to_rgba_png(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let mut out = Cursor::new(Vec::new());
    rgba.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// File extension for encoded image bytes, `png` when unrecognised.
pub fn extension_for(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(ImageFormat::WebP) => "webp",
        _ => "png",
    }
}
