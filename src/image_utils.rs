use std::io::Cursor;

use image::{DynamicImage, ImageReader};

use crate::error::Result;

/// Decodes an in-memory image, detecting the format from its content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.decode()?)
}

/// MIME type guessed from the leading magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}
