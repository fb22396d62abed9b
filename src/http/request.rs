use std::net::{IpAddr, SocketAddr};
use std::sync::OnceLock;

use bytes::Bytes;
use percent_encoding::percent_decode;
use serde_json::Value;

use crate::error::Error;

/// HTTP request methods the router can register handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Every supported method, in the order routes default to.
    pub const ALL: [Method; 6] = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::HEAD,
        Method::PATCH,
    ];

    /// Parses an HTTP method from an upper-case string.
    ///
    /// # Example
    ///
    /// ```
    /// # use littleweb::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("TRACE"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::PATCH => "PATCH",
        }
    }
}

/// Header mapping that preserves insertion order.
///
/// Serialization order is observable on the wire, so a plain `HashMap` is not
/// enough. Duplicate names overwrite the prior value in place
/// (last-write-wins), keeping the position of the first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, overwriting the value of an existing name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Looks up a header value by exact name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Merges `other` into `self`, `other` winning on name collisions.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decoded argument mapping: text key to the ordered list of raw values.
///
/// Values stay as bytes so binary form fields survive decoding; the accessor
/// methods on [`Request`] convert to text on the way out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgMap {
    entries: Vec<(String, Vec<Vec<u8>>)>,
}

impl ArgMap {
    fn push(&mut self, key: String, value: Vec<u8>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// All values recorded for `name`, in arrival order.
    pub fn get(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses a query string into an [`ArgMap`], percent-decoding keys and values.
///
/// `+` decodes to a space. With `keep_blank_values` set, `a=` and a bare `a`
/// both record an empty value; otherwise such fields are dropped.
pub(crate) fn parse_qs_bytes(qs: &[u8], keep_blank_values: bool) -> ArgMap {
    let mut args = ArgMap::default();
    for field in qs.split(|&b| b == b'&') {
        if field.is_empty() {
            continue;
        }
        let (key, value) = match field.iter().position(|&b| b == b'=') {
            Some(i) => (&field[..i], &field[i + 1..]),
            None => (field, &field[field.len()..]),
        };
        if value.is_empty() && !keep_blank_values {
            continue;
        }
        let key = String::from_utf8_lossy(&decode_component(key)).into_owned();
        args.push(key, decode_component(value));
    }
    args
}

fn decode_component(raw: &[u8]) -> Vec<u8> {
    let unplus: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&unplus).collect()
}

/// Splits a raw URL into its path and optional query component.
fn split_url(url: &[u8]) -> (&[u8], Option<&[u8]>) {
    match url.iter().position(|&b| b == b'?') {
        Some(i) => (&url[..i], Some(&url[i + 1..])),
        None => (url, None),
    }
}

/// Percent-decodes the path component of a raw URL.
pub(crate) fn decode_path(url: &[u8]) -> String {
    let (path, _) = split_url(url);
    String::from_utf8_lossy(&percent_decode(path).collect::<Vec<u8>>()).into_owned()
}

/// A read view over one completed HTTP message.
///
/// Built by the connection once the parser reports message completion. The
/// raw fields (method, URL, headers, version, body) are fixed at
/// construction; every derived projection (query args, body args, JSON value,
/// peer address, forwarded address) is computed at most once on first access
/// and cached for the life of the request.
pub struct Request {
    /// The HTTP method (GET, POST, ...)
    pub method: Method,
    /// HTTP version as reported by the parser (e.g. "1.1")
    pub version: String,
    url: Bytes,
    path: String,
    headers: Headers,
    body: Bytes,
    peer: Option<SocketAddr>,
    tls: bool,
    query_arguments: OnceLock<ArgMap>,
    body_arguments: OnceLock<ArgMap>,
    json_arguments: OnceLock<Value>,
    address: OnceLock<(Option<IpAddr>, Option<u16>)>,
    remote_addr: OnceLock<String>,
}

impl Request {
    pub fn new(
        method: Method,
        url: Bytes,
        headers: Headers,
        version: String,
        body: Bytes,
        peer: Option<SocketAddr>,
        tls: bool,
    ) -> Self {
        let path = decode_path(&url);
        Self {
            method,
            version,
            url,
            path,
            headers,
            body,
            peer,
            tls,
            query_arguments: OnceLock::new(),
            body_arguments: OnceLock::new(),
            json_arguments: OnceLock::new(),
            address: OnceLock::new(),
            remote_addr: OnceLock::new(),
        }
    }

    /// The percent-decoded path component of the request URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw URL bytes as accumulated from the wire.
    pub fn url(&self) -> &[u8] {
        &self.url
    }

    /// Retrieves a header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The Host header, or an empty string when absent.
    pub fn host(&self) -> &str {
        self.headers.get("Host").unwrap_or("")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Query arguments parsed from the URL, decoded once on first access.
    pub fn query_args(&self) -> &ArgMap {
        self.query_arguments.get_or_init(|| {
            let (_, query) = split_url(&self.url);
            match query {
                Some(qs) => parse_qs_bytes(qs, false),
                None => ArgMap::default(),
            }
        })
    }

    /// Form-body arguments, decoded once on first access.
    ///
    /// Only `application/x-www-form-urlencoded` bodies decode; anything else
    /// yields an empty map with a logged warning, never an error.
    pub fn body_args(&self) -> &ArgMap {
        self.body_arguments.get_or_init(|| {
            if self.body.is_empty() {
                tracing::warn!("request body is empty");
                return ArgMap::default();
            }
            let content_type = self.headers.get("Content-Type").unwrap_or("");
            if content_type.starts_with("application/x-www-form-urlencoded") {
                parse_qs_bytes(&self.body, true)
            } else {
                tracing::warn!("unsupported Content-Type: {content_type}");
                ArgMap::default()
            }
        })
    }

    /// The body decoded as JSON, parsed once on first access.
    ///
    /// Invalid UTF-8 or invalid JSON yields an empty object, logged, never
    /// raised.
    pub fn json_args(&self) -> &Value {
        self.json_arguments.get_or_init(|| {
            match serde_json::from_slice(&self.body) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!("request json body parse error: {e}");
                    Value::Object(serde_json::Map::new())
                }
            }
        })
    }

    /// All query values for `name`, in original order, decoded to text.
    pub fn get_query_arguments(&self, name: &str, strip: bool) -> Vec<String> {
        get_arguments(self.query_args(), name, strip)
    }

    /// The last query value for `name`, or `default`.
    ///
    /// Fails with [`Error::MissingArgument`] when the key is absent and no
    /// default was supplied.
    pub fn get_query_argument(
        &self,
        name: &str,
        default: Option<&str>,
        strip: bool,
    ) -> Result<String, Error> {
        get_argument(self.query_args(), name, default, strip)
    }

    /// All form-body values for `name`, in original order, decoded to text.
    pub fn get_body_arguments(&self, name: &str, strip: bool) -> Vec<String> {
        get_arguments(self.body_args(), name, strip)
    }

    /// The last form-body value for `name`, or `default`.
    pub fn get_body_argument(
        &self,
        name: &str,
        default: Option<&str>,
        strip: bool,
    ) -> Result<String, Error> {
        get_argument(self.body_args(), name, default, strip)
    }

    /// The decoded JSON value under `name`, or `default`.
    ///
    /// JSON values are returned as-is; there is no whitespace stripping here.
    pub fn get_json_argument(
        &self,
        name: &str,
        default: Option<Value>,
    ) -> Result<Value, Error> {
        match self.json_args().get(name) {
            Some(value) => Ok(value.clone()),
            None => default.ok_or_else(|| Error::MissingArgument(name.to_string())),
        }
    }

    fn peer_address(&self) -> &(Option<IpAddr>, Option<u16>) {
        self.address.get_or_init(|| match self.peer {
            Some(SocketAddr::V4(addr)) => (Some(IpAddr::V4(*addr.ip())), Some(addr.port())),
            // IPv6 peers report (ip, port, flowinfo, scope); only the first
            // two matter here.
            Some(SocketAddr::V6(addr)) => (Some(IpAddr::V6(*addr.ip())), Some(addr.port())),
            None => (None, None),
        })
    }

    /// The client IP, when the transport reported a peer address.
    pub fn ip(&self) -> Option<IpAddr> {
        self.peer_address().0
    }

    /// The client port, when the transport reported a peer address.
    pub fn port(&self) -> Option<u16> {
        self.peer_address().1
    }

    /// "ws"/"http", with an "s" suffix when the transport carries TLS.
    ///
    /// A request whose Upgrade header equals "websocket" reports the ws
    /// scheme even before any upgrade completes.
    pub fn scheme(&self) -> String {
        let mut scheme = if self.headers.get("Upgrade") == Some("websocket") {
            String::from("ws")
        } else {
            String::from("http")
        };
        if self.tls {
            scheme.push('s');
        }
        scheme
    }

    /// The original client address per X-Forwarded-For.
    ///
    /// Returns the first non-empty, trimmed entry of the comma-split header,
    /// or an empty string when the header is absent or empty.
    pub fn remote_addr(&self) -> &str {
        self.remote_addr.get_or_init(|| {
            self.headers
                .get("X-Forwarded-For")
                .unwrap_or("")
                .split(',')
                .map(str::trim)
                .find(|addr| !addr.is_empty())
                .unwrap_or("")
                .to_string()
        })
    }
}

fn get_arguments(source: &ArgMap, name: &str, strip: bool) -> Vec<String> {
    source
        .get(name)
        .unwrap_or(&[])
        .iter()
        .map(|v| {
            let text = String::from_utf8_lossy(v);
            if strip {
                text.trim().to_string()
            } else {
                text.into_owned()
            }
        })
        .collect()
}

fn get_argument(
    source: &ArgMap,
    name: &str,
    default: Option<&str>,
    strip: bool,
) -> Result<String, Error> {
    let mut values = get_arguments(source, name, strip);
    match values.pop() {
        Some(last) => Ok(last),
        None => default
            .map(str::to_string)
            .ok_or_else(|| Error::MissingArgument(name.to_string())),
    }
}
