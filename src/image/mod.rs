//! Uploaded image payloads
//!
//! Decodes the base64 strings clients send (data URLs or bare base64) and
//! validates that each one really is an image format the vision providers
//! accept.

pub mod decoder;

pub use decoder::{decode_image, decode_images};

/// A validated image ready to be forwarded to a vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type sniffed from the decoded bytes, not the client's claim.
    pub mime_type: &'static str,
    /// Standard (padded) base64 of the image bytes.
    pub base64: String,
    pub byte_len: usize,
}

impl EncodedImage {
    /// `data:` URL form used by OpenAI-style `image_url` parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}
