//! `data:` URL transport for captured images.
//!
//! The viewer uploads canvases as `data:image/png;base64,...`. Parsing is
//! strict about the prefix and the `;base64,` marker and lenient about
//! whitespace inside the payload, which some encoders wrap.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, RgbaImage};

use super::MaskError;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DataUrlError {
    #[error("missing data: prefix")]
    MissingPrefix,
    #[error("missing ;base64, marker")]
    NotBase64,
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("invalid base64 payload: {0}")]
    Decode(String),
    #[error("empty payload")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn from_mime(mime: &str) -> Result<Self, DataUrlError> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Ok(Self::Png),
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            other => Err(DataUrlError::UnsupportedType(other.to_owned())),
        }
    }

    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// A decoded image data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(raw: &str) -> Result<Self, DataUrlError> {
        let rest = raw.trim_start().strip_prefix("data:").ok_or(DataUrlError::MissingPrefix)?;
        let (mime, payload) = rest.split_once(";base64,").ok_or(DataUrlError::NotBase64)?;
        let format = ImageFormat::from_mime(mime)?;

        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(DataUrlError::Empty);
        }
        let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| DataUrlError::Decode(e.to_string()))?;
        Ok(Self { format, bytes })
    }

    /// Render back to `data:<mime>;base64,<payload>`.
    #[must_use]
    pub fn to_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), STANDARD.encode(&self.bytes))
    }

    /// Decode the payload into pixels.
    pub fn decode_image(&self) -> Result<RgbaImage, MaskError> {
        let format = match self.format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        };
        Ok(image::load_from_memory_with_format(&self.bytes, format)?.to_rgba8())
    }
}

/// Encode pixels as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, MaskError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone()).write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Encode pixels as a PNG data URL, the same shape a canvas produces.
pub fn encode_png_data_url(image: &RgbaImage) -> Result<String, MaskError> {
    Ok(DataUrl { format: ImageFormat::Png, bytes: encode_png(image)? }.to_url())
}

#[cfg(test)]
#[path = "datauri_test.rs"]
mod tests;
