use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;

/// An image either held in memory or reachable at a URL (`http(s)://` or `data:`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Bytes),
    Url(String),
}

impl ImageSource {
    /// Short description for log fields; never dumps payload bytes.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Bytes(bytes) => format!("{} inline bytes", bytes.len()),
            ImageSource::Url(url) if url.starts_with("data:") => {
                format!("data URI ({} chars)", url.len())
            }
            ImageSource::Url(url) => url.clone(),
        }
    }
}

/// Encodes `bytes` as a `data:<mime>;base64,...` URI.
pub fn to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Decodes a base64 data URI into `(mime, bytes)`. Returns `None` for anything that is not a
/// well-formed base64 data URI.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = BASE64.decode(payload.trim()).ok()?;
    let mime = if mime.is_empty() {
        "application/octet-stream"
    } else {
        mime
    };
    Some((mime.to_string(), bytes))
}
