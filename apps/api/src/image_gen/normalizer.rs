//! Response normalisation: collapses every output shape the generation service can hand
//! back into one `ImageSource`.
//!
//! Precedence (first match wins):
//! 1. chunked binary stream → all chunks concatenated in arrival order
//! 2. plain string → URL
//! 3. non-empty list whose first element is a string → that element
//! 4. object with an `images` list whose first element is a string → that element
//!
//! Anything else is a `NormalizationError`. Shapes are never coerced.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::imaging::source::ImageSource;

/// Binary body delivered in chunks.
pub type ChunkStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Raw job output, tagged by shape.
pub enum RawOutput {
    Chunks(ChunkStream),
    Text(String),
    List(Vec<Value>),
    Object(Map<String, Value>),
    Other(Value),
}

impl RawOutput {
    /// Tags a JSON output value by its shape.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => RawOutput::Text(s),
            Value::Array(items) => RawOutput::List(items),
            Value::Object(map) => RawOutput::Object(map),
            other => RawOutput::Other(other),
        }
    }

    #[cfg(test)]
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        let chunks = chunks.into_iter().map(Ok::<Bytes, std::io::Error>);
        RawOutput::Chunks(futures::stream::iter(chunks).boxed())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RawOutput::Chunks(_) => "chunked stream",
            RawOutput::Text(_) => "string",
            RawOutput::List(_) => "list",
            RawOutput::Object(_) => "object",
            RawOutput::Other(Value::Null) => "null",
            RawOutput::Other(Value::Bool(_)) => "boolean",
            RawOutput::Other(Value::Number(_)) => "number",
            RawOutput::Other(_) => "unknown",
        }
    }
}

impl fmt::Debug for RawOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawOutput::Chunks(_) => f.write_str("Chunks(..)"),
            RawOutput::Text(s) => f.debug_tuple("Text").field(s).finish(),
            RawOutput::List(items) => f.debug_tuple("List").field(items).finish(),
            RawOutput::Object(map) => f.debug_tuple("Object").field(map).finish(),
            RawOutput::Other(v) => f.debug_tuple("Other").field(v).finish(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("failed reading image stream: {0}")]
    Stream(#[from] std::io::Error),

    #[error("image stream ended without any data")]
    EmptyStream,

    #[error("job succeeded without any output")]
    MissingOutput,

    #[error("unrecognized generation output shape: {0}")]
    UnrecognizedShape(String),
}

/// Reduces raw job output to a single image payload or URL.
pub async fn normalize(raw: RawOutput) -> Result<ImageSource, NormalizationError> {
    match raw {
        RawOutput::Chunks(mut stream) => {
            let mut buffer = BytesMut::new();
            while let Some(chunk) = stream.next().await {
                buffer.extend_from_slice(&chunk?);
            }
            if buffer.is_empty() {
                return Err(NormalizationError::EmptyStream);
            }
            Ok(ImageSource::Bytes(buffer.freeze()))
        }
        RawOutput::Text(url) => Ok(ImageSource::Url(url)),
        RawOutput::List(items) => match items.into_iter().next() {
            Some(Value::String(url)) => Ok(ImageSource::Url(url)),
            Some(_) => Err(NormalizationError::UnrecognizedShape(
                "list whose first element is not a string".to_string(),
            )),
            None => Err(NormalizationError::UnrecognizedShape(
                "empty list".to_string(),
            )),
        },
        RawOutput::Object(mut map) => match map.remove("images") {
            Some(Value::Array(images)) => match images.into_iter().next() {
                Some(Value::String(url)) => Ok(ImageSource::Url(url)),
                _ => Err(NormalizationError::UnrecognizedShape(
                    "object whose images list has no leading string".to_string(),
                )),
            },
            _ => Err(NormalizationError::UnrecognizedShape(
                "object without an images list".to_string(),
            )),
        },
        other @ RawOutput::Other(_) => {
            Err(NormalizationError::UnrecognizedShape(other.kind().to_string()))
        }
    }
}
