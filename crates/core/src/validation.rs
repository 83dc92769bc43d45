//! Identifier, image reference and upload validation.

use uuid::Uuid;

use crate::error::CoreError;

/// File extensions accepted by the upload endpoint.
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Maximum accepted upload size (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Parse a hyphenated UUID identifier, naming the field in the error.
pub fn parse_id(field: &str, raw: &str) -> Result<Uuid, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Uuid::parse_str(raw)
        .map_err(|_| CoreError::Validation(format!("{field} '{raw}' is not a valid id")))
}

/// Validate an image reference: either an `http(s)` URL or a storage-relative
/// path. Other URL schemes and blank values are rejected.
pub fn validate_image_ref(field: &str, raw: &str) -> Result<(), CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    if let Some((scheme, _)) = raw.split_once("://") {
        if !matches!(scheme, "http" | "https") {
            return Err(CoreError::Validation(format!(
                "{field} must use http or https, got '{scheme}'"
            )));
        }
    }
    Ok(())
}

/// Validate an upload file name and return its lowercased extension.
pub fn upload_extension(filename: &str) -> Result<String, CoreError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    if ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(CoreError::Validation(format!(
            "File type not allowed. Allowed types: {}",
            ALLOWED_UPLOAD_EXTENSIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parse_id_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("process_id", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_blank_and_garbage() {
        assert_matches!(parse_id("process_id", "  "), Err(CoreError::Validation(msg)) if msg.contains("required"));
        assert_matches!(parse_id("page_id", "page_1"), Err(CoreError::Validation(msg)) if msg.contains("page_id"));
    }

    #[test]
    fn image_ref_accepts_urls_and_paths() {
        assert!(validate_image_ref("source_url", "https://cdn.example.com/a.png").is_ok());
        assert!(validate_image_ref("source_url", "http://localhost:8000/storage/uploads/a.png").is_ok());
        assert!(validate_image_ref("source_url", "a.png").is_ok());
    }

    #[test]
    fn image_ref_rejects_blank_and_foreign_schemes() {
        assert!(validate_image_ref("source_url", "").is_err());
        assert!(validate_image_ref("target_url", "ftp://host/a.png").is_err());
        assert!(validate_image_ref("target_url", "file:///etc/passwd").is_err());
    }

    #[test]
    fn upload_extension_is_lowercased() {
        assert_eq!(upload_extension("Photo.JPG").unwrap(), "jpg");
        assert_eq!(upload_extension("a.b.png").unwrap(), "png");
    }

    #[test]
    fn upload_extension_rejects_unknown_types() {
        assert!(upload_extension("notes.txt").is_err());
        assert!(upload_extension("noextension").is_err());
    }
}
