use super::EncodedImage;
use crate::{Error, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use image::ImageFormat;

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Split a `data:<mime>;base64,<payload>` URL, returning the payload.
///
/// Bare base64 is returned unchanged.
fn strip_data_url(input: &str) -> Result<&str> {
    let Some(rest) = input.strip_prefix("data:") else {
        return Ok(input);
    };

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidInput("data URL is missing its payload".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(Error::InvalidInput(
            "data URL must be base64 encoded".to_string(),
        ));
    }
    if !header.starts_with("image/") {
        return Err(Error::InvalidInput(format!(
            "data URL has non-image media type '{}'",
            header.trim_end_matches(";base64")
        )));
    }

    Ok(payload)
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD]
        .into_iter()
        .find_map(|engine| engine.decode(cleaned.as_bytes()).ok())
}

/// Decode and validate one client image payload.
pub fn decode_image(input: &str) -> Result<EncodedImage> {
    let payload = strip_data_url(input.trim())?;

    let bytes = decode_base64(payload)
        .ok_or_else(|| Error::InvalidInput("image is not valid base64".to_string()))?;
    if bytes.is_empty() {
        return Err(Error::InvalidInput("image payload is empty".to_string()));
    }

    let mime_type = image::guess_format(&bytes)
        .ok()
        .and_then(mime_for)
        .ok_or_else(|| {
            tracing::debug!(
                "Unrecognized image format (first 4 bytes: {:02X?})",
                &bytes[..bytes.len().min(4)]
            );
            Error::InvalidInput(
                "unsupported image format, expected JPEG, PNG, WebP or GIF".to_string(),
            )
        })?;

    Ok(EncodedImage {
        mime_type,
        base64: STANDARD.encode(&bytes),
        byte_len: bytes.len(),
    })
}

/// Decode every payload, naming the offending index on failure.
pub fn decode_images(inputs: &[String]) -> Result<Vec<EncodedImage>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            decode_image(input).map_err(|e| match e {
                Error::InvalidInput(msg) => Error::InvalidInput(format!("image {}: {}", index, msg)),
                other => other,
            })
        })
        .collect()
}
