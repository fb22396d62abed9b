//! littleweb - Minimal async HTTP/1.1 server core
//!
//! One request per connection: bytes in, parse events, route match, handler,
//! response out, close.

pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
