use mime::Mime;
use reqwest::multipart::{Form, Part};
use std::path::Path;

use super::ApiError;

pub fn mime_for(path: &Path) -> Mime {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Read a file from disk into a named multipart part
pub async fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Upload {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for(path).as_ref())?;
    Ok(part)
}

pub fn text_form(fields: Vec<(&'static str, String)>) -> Form {
    fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("a/b/photo.JPG")), mime::IMAGE_JPEG);
        assert_eq!(mime_for(Path::new("shot.png")), mime::IMAGE_PNG);
        assert_eq!(mime_for(Path::new("notes")), mime::APPLICATION_OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_missing_file_is_upload_error() {
        let err = file_part(&PathBuf::from("/definitely/not/here.jpg")).await.unwrap_err();
        assert!(matches!(err, ApiError::Upload { .. }));
        assert!(err.user_message("fallback").starts_with("Could not read"));
    }

    #[tokio::test]
    async fn test_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("front.png");
        std::fs::write(&path, b"\x89PNG").unwrap();
        assert!(file_part(&path).await.is_ok());
    }
}
