use serde_json::Value;

use crate::http::request::Headers;
use crate::http::writer::ConnectionWriter;

/// Header builder bound to one connection's write path.
///
/// Handlers accumulate headers with [`set_header`](Response::set_header) and
/// then produce the body with [`write`](Response::write) or
/// [`json`](Response::json). A response can be written at most once; writing
/// hands the payload to the connection, which serializes it and closes the
/// transport. Any later write is a logged no-op.
pub struct Response {
    writer: ConnectionWriter,
    headers: Headers,
    written: bool,
}

impl Response {
    pub(crate) fn new(writer: ConnectionWriter) -> Self {
        Self {
            writer,
            headers: Headers::new(),
            written: false,
        }
    }

    /// Sets one header, overwriting any prior value for the name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Merges a batch of headers, the batch winning on name collisions.
    pub fn set_headers(&mut self, headers: &Headers) {
        self.headers.extend(headers);
    }

    /// Writes the response and closes the connection.
    ///
    /// The held headers are merged with the computed Content-Type and
    /// Content-Length pair; the computed pair wins on collisions.
    pub async fn write(&mut self, data: impl AsRef<[u8]>, status: u16, content_type: &str) {
        if self.written {
            tracing::warn!("response already written, ignoring write");
            return;
        }
        self.written = true;
        self.writer
            .write(data.as_ref(), status, content_type, &self.headers)
            .await;
    }

    /// Serializes `value` as JSON and writes it with an
    /// `application/json` content type.
    pub async fn json(&mut self, value: Value, status: u16) {
        match serde_json::to_vec(&value) {
            Ok(data) => self.write(data, status, "application/json").await,
            Err(e) => {
                tracing::error!("serialize json response failed: {e}");
                self.write("Internal Server Error", 500, "text/plain").await;
            }
        }
    }
}
