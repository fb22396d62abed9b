use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Upper bound handed to httparse per parse attempt.
const MAX_HEADERS: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request: {0}")]
    Malformed(#[from] httparse::Error),
    #[error("invalid Content-Length header")]
    InvalidContentLength,
}

/// One parse event, emitted in the fixed per-message order:
/// `Url* Header* HeadersComplete Body* MessageComplete`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    Url(Bytes),
    Header(String, String),
    HeadersComplete,
    Body(Bytes),
    MessageComplete,
}

enum Phase {
    Headers,
    Body,
    Done,
}

/// Incremental adapter over `httparse`.
///
/// Raw chunks go in via [`feed`](RequestParser::feed); typed events come out.
/// The adapter buffers until the request head is complete, then streams body
/// bytes as they arrive, bounded by `Content-Length` (absent means zero).
/// Method and version become queryable once `HeadersComplete` has been
/// emitted.
pub struct RequestParser {
    buffer: BytesMut,
    phase: Phase,
    method: Option<String>,
    version: Option<String>,
    remaining_body: usize,
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            phase: Phase::Headers,
            method: None,
            version: None,
            remaining_body: 0,
        }
    }

    /// The request method as it appeared on the wire, once parsed.
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// The negotiated HTTP version ("1.0" or "1.1"), once parsed.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Feeds one chunk of bytes, returning the events it produced.
    ///
    /// An incomplete request head produces no events; the bytes stay buffered
    /// until a later chunk completes it. Bytes past the end of the message
    /// are ignored (the connection never carries a second request).
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<ParseEvent>, ParseError> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        if let Phase::Headers = self.phase {
            // httparse borrows the buffer, so copy the head out before
            // advancing past it.
            let parsed = {
                let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
                let mut req = httparse::Request::new(&mut headers);
                match req.parse(&self.buffer)? {
                    httparse::Status::Partial => None,
                    httparse::Status::Complete(consumed) => {
                        let method = req.method.unwrap_or("").to_string();
                        let minor = req.version.unwrap_or(1);
                        let url =
                            Bytes::copy_from_slice(req.path.unwrap_or("/").as_bytes());
                        let pairs: Vec<(String, String)> = req
                            .headers
                            .iter()
                            .map(|h| {
                                (
                                    h.name.to_string(),
                                    String::from_utf8_lossy(h.value).into_owned(),
                                )
                            })
                            .collect();
                        Some((consumed, method, minor, url, pairs))
                    }
                }
            };

            if let Some((consumed, method, minor, url, pairs)) = parsed {
                self.method = Some(method);
                self.version = Some(format!("1.{minor}"));
                self.remaining_body = content_length(&pairs)?;
                self.buffer.advance(consumed);
                self.phase = Phase::Body;

                events.push(ParseEvent::Url(url));
                for (name, value) in pairs {
                    events.push(ParseEvent::Header(name, value));
                }
                events.push(ParseEvent::HeadersComplete);
            }
        }

        if let Phase::Body = self.phase {
            let take = self.remaining_body.min(self.buffer.len());
            if take > 0 {
                let fragment = self.buffer.split_to(take).freeze();
                self.remaining_body -= take;
                events.push(ParseEvent::Body(fragment));
            }
            if self.remaining_body == 0 {
                self.phase = Phase::Done;
                events.push(ParseEvent::MessageComplete);
            }
        }

        Ok(events)
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

fn content_length(headers: &[(String, String)]) -> Result<usize, ParseError> {
    match headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
    {
        Some((_, value)) => value
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength),
        None => Ok(0),
    }
}
