//! Request body encoding by mode.

use std::path::{Path, PathBuf};

use relay_domain::{KeyValue, MultipartField, RequestBody};

use crate::ports::TransportError;

/// Bytes and media type produced for a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` to use when the request sets none.
    pub content_type: String,
}

/// Encodes `body`; `None` for the `none` mode.
///
/// Multipart file parts are read relative to `root` unless absolute.
///
/// # Errors
///
/// Returns `TransportError::InvalidBody` when form fields cannot be encoded
/// or a file part cannot be read.
pub async fn encode_body(
    body: &RequestBody,
    root: &Path,
) -> Result<Option<EncodedBody>, TransportError> {
    let Some(content_type) = body.default_content_type() else {
        return Ok(None);
    };

    let encoded = match body {
        RequestBody::None => return Ok(None),
        RequestBody::Text { text: raw }
        | RequestBody::Xml { xml: raw }
        | RequestBody::Sparql { sparql: raw }
        | RequestBody::Json { json: raw } => EncodedBody {
            bytes: raw.as_bytes().to_vec(),
            content_type: content_type.to_string(),
        },
        RequestBody::FormUrlEncoded { fields } => EncodedBody {
            bytes: encode_form(fields)?.into_bytes(),
            content_type: content_type.to_string(),
        },
        RequestBody::Multipart { fields } => {
            let boundary = format!("----RelayBoundary{}", uuid::Uuid::new_v4().simple());
            EncodedBody {
                bytes: encode_multipart(fields, &boundary, root).await?,
                content_type: format!("{content_type}; boundary={boundary}"),
            }
        }
    };
    Ok(Some(encoded))
}

fn encode_form(fields: &[KeyValue]) -> Result<String, TransportError> {
    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .filter(|f| f.enabled)
        .map(|f| (f.name.as_str(), f.value.as_str()))
        .collect();
    serde_urlencoded::to_string(pairs).map_err(|e| TransportError::InvalidBody(e.to_string()))
}

async fn encode_multipart(
    fields: &[MultipartField],
    boundary: &str,
    root: &Path,
) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::new();

    for field in fields.iter().filter(|f| f.is_enabled()) {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match field {
            MultipartField::Text { name, value, .. } => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", quote(name))
                        .as_bytes(),
                );
                out.extend_from_slice(value.as_bytes());
            }
            MultipartField::File { name, path, .. } => {
                let file_path = resolve_path(path, root);
                let content = tokio::fs::read(&file_path).await.map_err(|e| {
                    TransportError::InvalidBody(format!("{}: {e}", file_path.display()))
                })?;
                let filename = file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file");
                let mime_type = mime_guess::from_path(&file_path).first_or_octet_stream();

                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {mime_type}\r\n\r\n",
                        quote(name),
                        quote(filename)
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(&content);
            }
        }
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(out)
}

fn quote(value: &str) -> String {
    value.replace('"', "%22")
}

/// Resolves a path relative to the collection root unless absolute.
fn resolve_path(path: &str, root: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
