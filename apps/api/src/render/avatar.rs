//! Avatar decoding and orientation correction.
//!
//! Camera photos often carry their rotation in EXIF rather than in the pixel data.
//! Browsers honour that tag, PDF viewers do not, so avatars are re-encoded upright
//! before they are embedded.

use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine as _;
use image::{DynamicImage, ImageOutputFormat};

use super::RenderError;
use crate::content::CollaboratorError;

const DATA_URL_PREFIX: &str = "data:image/";
const JPEG_QUALITY: u8 = 92;

/// Image-orientation-fix collaborator.
///
/// Returns a replacement reference for the avatar. Callers treat an error as
/// non-fatal and keep the original reference.
#[async_trait]
pub trait AvatarProcessor: Send + Sync {
    async fn process(&self, reference: &str) -> Result<String, CollaboratorError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Pure helpers
// ────────────────────────────────────────────────────────────────────────────

pub fn is_data_image(reference: &str) -> bool {
    reference.trim_start().starts_with(DATA_URL_PREFIX)
}

/// Extracts the bytes of a `data:image/...;base64,` URL.
pub fn decode_data_url(reference: &str) -> Result<Vec<u8>, RenderError> {
    let reference = reference.trim();
    if !is_data_image(reference) {
        return Err(RenderError::Avatar("not an image data URL".to_string()));
    }
    let (meta, payload) = reference
        .split_once(',')
        .ok_or_else(|| RenderError::Avatar("data URL has no payload".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(RenderError::Avatar("data URL is not base64 encoded".to_string()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| RenderError::Avatar(format!("invalid base64: {e}")))
}

/// Reads the EXIF orientation tag. Returns 1 (upright) when absent or unreadable.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Applies an EXIF orientation value to decoded pixels.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Decodes raw image bytes with their EXIF orientation applied.
pub fn decode_upright(bytes: &[u8]) -> Result<DynamicImage, RenderError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| RenderError::Avatar(format!("undecodable image: {e}")))?;
    Ok(apply_orientation(img, read_exif_orientation(bytes)))
}

/// Decodes, orients and re-encodes as a JPEG data URL.
pub fn normalize_to_data_url(bytes: &[u8]) -> Result<String, RenderError> {
    let upright = decode_upright(bytes)?;
    let rgb = DynamicImage::ImageRgb8(upright.to_rgb8());
    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| RenderError::Avatar(format!("JPEG encoding failed: {e}")))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(cursor.into_inner());
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}

// ────────────────────────────────────────────────────────────────────────────
// EXIF-based processor
// ────────────────────────────────────────────────────────────────────────────

pub struct ExifAvatarProcessor {
    /// Present only when remote avatars may be downloaded.
    http: Option<reqwest::Client>,
    max_bytes: usize,
}

impl ExifAvatarProcessor {
    pub fn new(fetch_remote: bool, max_bytes: usize) -> Self {
        Self {
            http: fetch_remote.then(reqwest::Client::new),
            max_bytes,
        }
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<Vec<u8>, CollaboratorError> {
        let response = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CollaboratorError::Unavailable(format!("avatar download failed: {e}")))?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Err(CollaboratorError::Malformed(format!(
                    "avatar is {len} bytes, limit is {}",
                    self.max_bytes
                )));
            }
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CollaboratorError::Unavailable(format!("avatar download failed: {e}")))?;
        self.check_size(bytes.len())?;
        Ok(bytes.to_vec())
    }

    fn check_size(&self, len: usize) -> Result<(), CollaboratorError> {
        if len > self.max_bytes {
            return Err(CollaboratorError::Malformed(format!(
                "avatar is {len} bytes, limit is {}",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AvatarProcessor for ExifAvatarProcessor {
    async fn process(&self, reference: &str) -> Result<String, CollaboratorError> {
        let reference = reference.trim();
        let bytes = if is_data_image(reference) {
            let bytes = decode_data_url(reference)
                .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
            self.check_size(bytes.len())?;
            bytes
        } else if reference.starts_with("http://") || reference.starts_with("https://") {
            match &self.http {
                Some(client) => self.fetch(client, reference).await?,
                None => return Ok(reference.to_string()),
            }
        } else {
            return Ok(reference.to_string());
        };

        tokio::task::spawn_blocking(move || normalize_to_data_url(&bytes))
            .await
            .map_err(|e| CollaboratorError::Unavailable(format!("avatar task failed: {e}")))?
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))
    }
}
