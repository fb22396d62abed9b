//! HTTP protocol implementation.
//!
//! One-shot HTTP/1.1: each connection carries exactly one request/response
//! exchange and closes after the response is written.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection protocol state machine
//! - **`parser`**: Adapter over `httparse` emitting a typed parse-event stream
//! - **`request`**: Lazily-decoded read view over a completed message
//! - **`response`**: Header builder handed to application handlers
//! - **`writer`**: The single write path serializing responses to the client
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← Transport accepted, no bytes yet
//!        └──────┬──────┘
//!               │ First chunk arrives (parser created)
//!               ▼
//!        ┌──────────────────┐
//!        │    Parsing       │ ← Accumulate URL/header/body fragments
//!        └──────┬───────────┘
//!               │ Message complete        (parse error → 400 → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Route match, handler invocation
//!        └──────┬───────────┘
//!               │ Response written        (no match → 404)
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use littleweb::http::connection::Connection;
//! use littleweb::router::Router;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Arc::new(Router::new());
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, peer) = listener.accept().await?;
//!         let router = Arc::clone(&router);
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, peer, router);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
