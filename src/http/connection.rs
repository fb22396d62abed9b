use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::http::parser::{ParseEvent, RequestParser};
use crate::http::request::{self, Headers, Method, Request};
use crate::http::response::Response;
use crate::http::writer::ConnectionWriter;
use crate::router::Router;

/// Protocol state owned by one TCP session.
///
/// Feeds inbound bytes to the parser adapter, accumulates URL, header and
/// body fragments, and on message completion matches a route and invokes its
/// handler. Every response closes the connection; there is no keep-alive.
pub struct Connection {
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
    router: Arc<Router>,
    parser: Option<RequestParser>,
    url: BytesMut,
    headers: Headers,
    body: Vec<Bytes>,
    version: String,
    state: ConnectionState,
}

pub enum ConnectionState {
    Idle,
    Parsing,
    Dispatching,
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, router: Arc<Router>) -> Self {
        Self {
            stream: Some(stream),
            peer: Some(peer),
            router,
            parser: None,
            url: BytesMut::new(),
            headers: Headers::new(),
            body: Vec::new(),
            version: String::from("1.1"),
            state: ConnectionState::Idle,
        }
    }

    /// Drives the connection from first byte to close.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut chunk = [0u8; 4096];

        loop {
            match self.state {
                ConnectionState::Idle | ConnectionState::Parsing => {
                    let n = match self.stream.as_mut() {
                        Some(stream) => stream.read(&mut chunk).await?,
                        None => {
                            self.state = ConnectionState::Closed;
                            continue;
                        }
                    };

                    if n == 0 {
                        // Peer went away before completing a message.
                        self.close().await;
                        continue;
                    }

                    self.feed(&chunk[..n]).await;
                }

                ConnectionState::Dispatching => {
                    self.dispatch().await;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Feeds one byte chunk to the parser and applies the resulting events.
    async fn feed(&mut self, data: &[u8]) {
        if self.parser.is_none() {
            self.parser = Some(RequestParser::new());
            self.state = ConnectionState::Parsing;
        }

        let result = match self.parser.as_mut() {
            Some(parser) => parser.feed(data),
            None => return,
        };

        match result {
            Ok(events) => {
                for event in events {
                    self.on_event(event);
                }
            }
            Err(e) => {
                tracing::error!("http parse error: {e}");
                self.write_error(400, "Bad Request").await;
            }
        }
    }

    fn on_event(&mut self, event: ParseEvent) {
        match event {
            ParseEvent::Url(fragment) => {
                self.url.extend_from_slice(&fragment);
            }
            ParseEvent::Header(name, value) => {
                self.headers.insert(name, value);
            }
            ParseEvent::HeadersComplete => {
                if let Some(version) = self.parser.as_ref().and_then(|p| p.version()) {
                    self.version = version.to_string();
                }
            }
            ParseEvent::Body(fragment) => {
                self.body.push(fragment);
            }
            ParseEvent::MessageComplete => {
                self.state = ConnectionState::Dispatching;
            }
        }
    }

    /// Matches the completed message against the route table and invokes the
    /// winning handler, or answers 404 when nothing matches.
    async fn dispatch(&mut self) {
        let method_str = self
            .parser
            .as_ref()
            .and_then(|p| p.method())
            .unwrap_or("")
            .to_ascii_uppercase();
        let method = Method::from_str(&method_str);

        let url = std::mem::take(&mut self.url).freeze();
        let headers = std::mem::take(&mut self.headers);
        let body = concat_fragments(std::mem::take(&mut self.body));
        let path = request::decode_path(&url);

        let router = Arc::clone(&self.router);
        if let Some(method) = method {
            // Registration order is match priority: first full match wins.
            for route in router.method_queue(method) {
                if let Some(args) = route.matches(&path) {
                    tracing::debug!(
                        method = method.as_str(),
                        path = %path,
                        pattern = route.pattern(),
                        "dispatching request"
                    );

                    let request = Request::new(
                        method,
                        url,
                        headers,
                        self.version.clone(),
                        body,
                        self.peer,
                        false,
                    );
                    if let Some(stream) = self.stream.take() {
                        let writer = ConnectionWriter::new(stream, self.version.clone());
                        let response = Response::new(writer);
                        route.handler().invoke(request, response, args).await;
                    }
                    self.state = ConnectionState::Closed;
                    return;
                }
            }
        }

        tracing::debug!(method = %method_str, path = %path, "no route matched");
        self.write_error(404, "Page Not Found").await;
    }

    /// Writes a built-in error response and closes.
    async fn write_error(&mut self, status: u16, body: &str) {
        if let Some(stream) = self.stream.take() {
            let mut writer = ConnectionWriter::new(stream, self.version.clone());
            writer
                .write(body.as_bytes(), status, "text/plain", &Headers::new())
                .await;
        }
        self.state = ConnectionState::Closed;
    }

    /// Closes the transport. Closing an already-closed connection is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = tokio::io::AsyncWriteExt::shutdown(&mut stream).await;
        }
        self.state = ConnectionState::Closed;
    }
}

/// Concatenates body fragments in arrival order.
fn concat_fragments(fragments: Vec<Bytes>) -> Bytes {
    match fragments.len() {
        0 => Bytes::new(),
        1 => fragments.into_iter().next().unwrap_or_default(),
        _ => {
            let total = fragments.iter().map(Bytes::len).sum();
            let mut buf = BytesMut::with_capacity(total);
            for fragment in &fragments {
                buf.extend_from_slice(fragment);
            }
            buf.freeze()
        }
    }
}
