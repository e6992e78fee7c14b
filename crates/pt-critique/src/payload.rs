//! Inline image payloads.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};

use crate::error::CritiqueError;

const DEFAULT_MIME: &str = "image/png";

/// A base64-encoded bitmap ready to embed in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 without any `data:` prefix
    pub data: String,
}

impl InlineImage {
    /// Accept either a `data:<mime>;base64,<payload>` URI or bare base64.
    pub fn from_data_uri(uri: &str) -> Result<Self, CritiqueError> {
        let uri = uri.trim();
        let (mime_type, data) = match uri.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| CritiqueError::Image("data URI has no payload".to_string()))?;
                let mime = header.split(';').next().unwrap_or_default();
                let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
                (mime.to_string(), payload)
            }
            None => (DEFAULT_MIME.to_string(), uri),
        };

        if data.is_empty() {
            return Err(CritiqueError::Image("empty image payload".to_string()));
        }
        STANDARD
            .decode(data)
            .map_err(|e| CritiqueError::Image(format!("invalid base64: {e}")))?;

        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self {
            mime_type: DEFAULT_MIME.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Encode an RGBA bitmap as PNG.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self, CritiqueError> {
        Ok(Self::from_png_bytes(&encode_png(image)?))
    }

    pub fn decode(&self) -> Result<Vec<u8>, CritiqueError> {
        STANDARD
            .decode(&self.data)
            .map_err(|e| CritiqueError::Image(format!("invalid base64: {e}")))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// PNG-encode an RGBA bitmap.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CritiqueError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CritiqueError::Image(e.to_string()))?;
    Ok(bytes)
}
