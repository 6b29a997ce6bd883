use image::ImageFormat;
use mime::Mime;
use std::path::Path;

use crate::errors::{AppError, Result};

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif"];

fn is_allowed_mime(candidate: &Mime) -> bool {
    *candidate == mime::IMAGE_JPEG || *candidate == mime::IMAGE_PNG || *candidate == mime::IMAGE_GIF
}

/// Accepts JPEG, PNG and GIF only. The name, the declared content type
/// (or the one guessed from the name) and the leading bytes must all agree
/// on being an image.
pub fn validate_image_upload(file_name: &str, content_type: Option<&str>, data: &[u8]) -> Result<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or(AppError::InvalidFileFormat)?;
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::InvalidFileFormat);
    }

    let declared = content_type
        .and_then(|ct| ct.parse::<Mime>().ok())
        .filter(|m| m.type_() != mime::APPLICATION || m.subtype() != mime::OCTET_STREAM)
        .or_else(|| mime_guess::from_path(file_name).first())
        .ok_or(AppError::InvalidFileFormat)?;
    let essence: Mime = declared
        .essence_str()
        .parse()
        .map_err(|_| AppError::InvalidFileFormat)?;
    if !is_allowed_mime(&essence) {
        return Err(AppError::InvalidFileFormat);
    }

    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif) => Ok(()),
        _ => Err(AppError::InvalidFileFormat),
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes
/// `_`. Leading dots are dropped so a name can never climb directories or
/// hide itself.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn upload_file_name(original: &str, timestamp_millis: i64) -> String {
    format!("{}-{}", timestamp_millis, sanitize_file_name(original))
}

/// `1700-photo.jpg` -> `restored-1700-photo.png`
pub fn restored_file_name(upload_name: &str) -> String {
    let stem = Path::new(upload_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(upload_name);
    format!("restored-{}.png", stem)
}
