//! Checks applied to uploaded image files before they are stored.

use crate::error::AppError;

const MAX_FILENAME_CHARS: usize = 255;

/// Validate an uploaded filename and return it trimmed.
///
/// Filenames end up in `Content-Disposition` headers on download, so path
/// components and control characters are refused outright.
pub fn clean_filename(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(AppError::Validation("Filename cannot be empty".into()));
    }
    if name.chars().count() > MAX_FILENAME_CHARS {
        return Err(AppError::Validation(format!(
            "Filename must be at most {MAX_FILENAME_CHARS} characters"
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(AppError::Validation(
            "Filename must not contain control characters".into(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(AppError::Validation(
            "Filename must not contain path separators".into(),
        ));
    }
    if name.starts_with('.') {
        return Err(AppError::Validation(
            "Filename must not start with '.'".into(),
        ));
    }

    Ok(name)
}

/// Guess the MIME type from the filename and require an `image/*` type.
pub fn image_content_type(filename: &str) -> Result<String, AppError> {
    mime_guess::from_path(filename)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .ok_or_else(|| {
            AppError::Validation(
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.".into(),
            )
        })
}

/// Build a safe `Content-Disposition` header value.
pub fn content_disposition(filename: &str) -> String {
    let ascii_name: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_name.is_empty() {
        "image".to_string()
    } else {
        ascii_name
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect();

    format!("inline; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
