use std::path::Path;

use crate::core::errors::ApiError;
use crate::rag::engine::strip_html_tags;

/// Lower-cased extension including the dot, `.unknown` when absent.
pub fn doc_type(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_else(|| ".unknown".to_string())
}

/// Reads a document as plain text according to its extension.
///
/// Binary office formats are rejected; everything else must be UTF-8.
pub async fn load_text(path: &Path) -> Result<String, ApiError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let kind = doc_type(&file_name);

    if matches!(kind.as_str(), ".pdf" | ".docx" | ".doc") {
        return Err(ApiError::BadRequest(format!(
            "Unsupported document format {}: {}",
            kind, file_name
        )));
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("File not found: {}", path.display()))
        } else {
            ApiError::internal(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;

    let raw = String::from_utf8(bytes)
        .map_err(|_| ApiError::BadRequest(format!("Not a UTF-8 text file: {}", file_name)))?;

    let text = match kind.as_str() {
        ".html" | ".htm" => strip_html_tags(&raw),
        _ => raw,
    };

    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("Document is empty: {}", file_name)));
    }
    Ok(text)
}
