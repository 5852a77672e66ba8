//! Multipart extraction and validation for image uploads

use axum::extract::Multipart;
use phyllo_core::AppError;

/// Multipart field that must carry the image.
pub const IMAGE_FIELD: &str = "image";

/// Longest sanitized filename in bytes. Scratch files add a 33-byte prefix and
/// must stay within the 255-byte file name limit.
pub const MAX_FILENAME_BYTES: usize = 200;

/// An image pulled out of the request body, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Size and type limits applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

/// Extract the image from the multipart form.
///
/// Exactly one field named `image` is accepted. Other fields are ignored; a
/// missing image field is [`AppError::NoImageUploaded`].
pub async fn extract_image_field(mut multipart: Multipart) -> Result<UploadedImage, AppError> {
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if image.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple image fields are not allowed; send exactly one field named 'image'"
                    .to_string(),
            ));
        }

        let filename = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        image = Some(UploadedImage {
            data: data.to_vec(),
            filename,
            content_type,
        });
    }

    image.ok_or(AppError::NoImageUploaded)
}

/// Validate file size. Empty files are rejected outright.
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size == 0 {
        return Err(AppError::InvalidInput("Uploaded image is empty".to_string()));
    }
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Validate content type against the allow-list, ignoring MIME parameters.
pub fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type).to_lowercase();
    if !allowed_types.iter().any(|ct| normalized == ct.to_lowercase()) {
        return Err(AppError::InvalidInput(format!(
            "Invalid content type. Allowed types: {}",
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

/// Validate file extension and return it lowercased, without the dot.
pub fn validate_file_extension(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<String, AppError> {
    let extension = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    };

    if !allowed_extensions.contains(&extension) {
        return Err(AppError::InvalidInput(format!(
            "Invalid file extension. Allowed extensions: {}",
            allowed_extensions.join(", ")
        )));
    }

    Ok(extension)
}

/// Sanitize filename to prevent path traversal and invalid characters.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = truncate_filename(&sanitized, MAX_FILENAME_BYTES);

    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        return Err(AppError::InvalidInput("Filename is empty".to_string()));
    }

    Ok(sanitized)
}

/// Shorten `name` to at most `max_bytes`, cutting the stem on a char boundary and
/// keeping the extension.
fn truncate_filename(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 1 < max_bytes => {
            (stem, &name[stem.len()..])
        }
        _ => (name, ""),
    };

    let mut end = (max_bytes - ext.len()).min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}{}", stem[..end].trim_end_matches('.'), ext)
}

/// Run every check on an extracted image and return it with a sanitized filename.
pub fn validate_image(image: UploadedImage, limits: &UploadLimits) -> Result<UploadedImage, AppError> {
    validate_file_size(image.data.len(), limits.max_file_size)?;
    validate_content_type(&image.content_type, &limits.allowed_content_types)?;
    let filename = sanitize_filename(&image.filename)?;
    validate_file_extension(&filename, &limits.allowed_extensions)?;

    Ok(UploadedImage {
        filename,
        content_type: normalize_mime_type(&image.content_type).to_lowercase(),
        ..image
    })
}
