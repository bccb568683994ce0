use crate::deck::PictureData;
use crate::types::*;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// A decoded-and-verified image ready to embed
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub picture: PictureData,
    pub width_px: u32,
    pub height_px: u32,
}

/// Decode `bytes` to learn the native size.
///
/// PNG and JPEG are embedded as they are; any other decodable format is
/// re-encoded as PNG so every viewer can show it.
pub fn prepare_image(bytes: Vec<u8>, name: &str) -> Result<PreparedImage> {
    let format = image::guess_format(&bytes)?;
    let decoded = ImageReader::with_format(Cursor::new(bytes.as_slice()), format).decode()?;
    let (width_px, height_px) = (decoded.width(), decoded.height());
    if width_px == 0 || height_px == 0 {
        return Err(AssembleError::ImageUnavailable(format!(
            "{name} has no pixels"
        )));
    }

    let (bytes, extension) = match format {
        ImageFormat::Png => (bytes, "png"),
        ImageFormat::Jpeg => (bytes, "jpeg"),
        other => {
            log::debug!("re-encoding {name} from {other:?} to PNG");
            let mut png = Vec::new();
            decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            (png, "png")
        }
    };

    Ok(PreparedImage {
        picture: PictureData {
            bytes,
            extension: extension.to_string(),
            name: name.to_string(),
        },
        width_px,
        height_px,
    })
}
