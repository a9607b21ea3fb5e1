//! File Upload Bodies
//!
//! The service accepts uploads as a JSON body carrying base64 content and a
//! purpose tag. Uploaded files are referenced from messages by id and must
//! be deleted explicitly at teardown.

use base64::Engine;
use chrono::Utc;
use serde_json::Value;

use crate::types::FileInfo;

/// Build the JSON upload body for `POST /files`.
pub(crate) fn upload_body(filename: &str, bytes: &[u8], purpose: &str) -> Value {
    serde_json::json!({
        "filename": filename,
        "purpose": purpose,
        "content": base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

/// Decode the upload response into `FileInfo`, falling back to the request
/// values for fields the service omits.
pub(crate) fn parse_file(v: &Value, filename: &str, purpose: &str) -> FileInfo {
    FileInfo {
        id: v["id"]
            .as_str()
            .or_else(|| v["file_id"].as_str())
            .unwrap_or("")
            .to_string(),
        filename: v["filename"].as_str().unwrap_or(filename).to_string(),
        purpose: v["purpose"].as_str().unwrap_or(purpose).to_string(),
        uploaded_at: v["created_at"]
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
    }
}
