use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::http::request::Headers;

/// Reason phrase for an HTTP status code.
///
/// Codes outside the table render a literal `UNKNOWN` reason.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",

        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",

        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        306 => "(Unused)",
        307 => "Temporary Redirect",

        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",

        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",

        _ => "UNKNOWN",
    }
}

/// Serializes a complete response into one byte buffer.
///
/// Final headers are `extra_headers` merged with the computed Content-Type
/// and Content-Length pair, the computed pair winning on name collisions.
/// Headers serialize in insertion order.
pub fn serialize_response(
    body: &[u8],
    status: u16,
    content_type: &str,
    version: &str,
    extra_headers: &Headers,
) -> Vec<u8> {
    let mut headers = extra_headers.clone();
    headers.insert("Content-Type", content_type);
    headers.insert("Content-Length", body.len().to_string());

    let mut buf = Vec::with_capacity(128 + body.len());

    let status_line = format!("HTTP/{} {} {}\r\n", version, status, reason_phrase(status));
    buf.extend_from_slice(status_line.as_bytes());

    for (name, value) in headers.iter() {
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(body);

    buf
}

/// The single write path of a connection.
///
/// Owns the transport from dispatch time onward. Writing always closes the
/// connection afterwards; there is no keep-alive. A transport write failure
/// is logged and swallowed, never propagated.
pub struct ConnectionWriter {
    stream: Option<TcpStream>,
    version: String,
}

impl ConnectionWriter {
    pub fn new(stream: TcpStream, version: String) -> Self {
        Self {
            stream: Some(stream),
            version,
        }
    }

    /// Serializes and writes one response, then closes the transport.
    pub async fn write(
        &mut self,
        body: &[u8],
        status: u16,
        content_type: &str,
        extra_headers: &Headers,
    ) {
        let buf = serialize_response(body, status, content_type, &self.version, extra_headers);

        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = stream.write_all(&buf).await {
                tracing::error!("write response data failed, connection closed: {e}");
            }
        }

        self.close().await;
    }

    /// Closes the transport. Closing twice is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}
