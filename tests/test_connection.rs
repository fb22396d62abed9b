use std::sync::Arc;
use std::time::Duration;

use littleweb::http::request::{Method, Request};
use littleweb::http::response::Response;
use littleweb::router::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use littleweb::http::connection::Connection;

async fn serve_once(router: Arc<Router>) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, peer) = listener.accept().await.unwrap();
        let mut conn = Connection::new(socket, peer, router);
        let _ = conn.run().await;
    });

    addr
}

/// Sends raw bytes and reads the full response; the server closing the
/// connection is what lets read_to_end return.
async fn roundtrip(router: Arc<Router>, raw: &[u8]) -> String {
    let addr = serve_once(router).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(raw).await.unwrap();

    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn test_handler_response_round_trip() {
    let mut router = Router::new();
    router
        .add_get("/", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.write("hello", 200, "text/plain").await;
        })
        .unwrap();

    let response = roundtrip(Arc::new(router), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.contains("Content-Length: 5\r\n"));
    assert!(response.ends_with("\r\n\r\nhello"));
}

#[tokio::test]
async fn test_unmatched_path_returns_404() {
    let mut router = Router::new();
    router
        .add_get("/known", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.write("ok", 200, "text/plain").await;
        })
        .unwrap();

    let response =
        roundtrip(Arc::new(router), b"GET /unknown HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.contains("Content-Type: text/plain\r\n"));
    assert!(response.ends_with("Page Not Found"));
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let mut router = Router::new();
    router
        .add_get("/dup/(.*)", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.write("first", 200, "text/plain").await;
        })
        .unwrap();
    router
        .add_get(r"/dup/(\d+)", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.write("second", 200, "text/plain").await;
        })
        .unwrap();

    let response =
        roundtrip(Arc::new(router), b"GET /dup/42 HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.ends_with("first"));
}

#[tokio::test]
async fn test_captured_group_passed_to_handler() {
    let mut router = Router::new();
    router
        .add_get(r"/items/(\d+)", |_req: Request, mut resp: Response, args: Vec<String>| async move {
            resp.write(args[0].clone(), 200, "text/plain").await;
        })
        .unwrap();
    let router = Arc::new(router);

    let response = roundtrip(
        Arc::clone(&router),
        b"GET /items/42 HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("42"));

    // Non-numeric id falls through to 404.
    let response = roundtrip(router, b"GET /items/abc HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn test_malformed_request_returns_400() {
    let router = Arc::new(Router::new());
    let response = roundtrip(router, b"NOT AN HTTP REQUEST\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.ends_with("Bad Request"));
}

#[tokio::test]
async fn test_unsupported_wire_method_returns_404() {
    let router = Arc::new(Router::new());
    let response = roundtrip(router, b"TRACE / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn test_form_body_arguments() {
    let mut router = Router::new();
    router
        .add_route(
            "/submit",
            |req: Request, mut resp: Response, _args: Vec<String>| async move {
                let name = req.get_body_argument("name", None, true).unwrap();
                resp.write(name, 200, "text/plain").await;
            },
            &[Method::POST],
        )
        .unwrap();

    let raw = b"POST /submit HTTP/1.1\r\nHost: x\r\n\
Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 17\r\n\r\n\
name=foo&name=bar";
    let response = roundtrip(Arc::new(router), raw).await;

    assert!(response.ends_with("bar"));
}

#[tokio::test]
async fn test_query_arguments_end_to_end() {
    let mut router = Router::new();
    router
        .add_get("/x", |req: Request, mut resp: Response, _args: Vec<String>| async move {
            let last = req.get_query_argument("a", None, true).unwrap();
            let all = req.get_query_arguments("a", true).join(",");
            resp.write(format!("{last};{all}"), 200, "text/plain").await;
        })
        .unwrap();

    let response =
        roundtrip(Arc::new(router), b"GET /x?a=1&a=2 HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.ends_with("2;1,2"));
}

#[tokio::test]
async fn test_json_response() {
    let mut router = Router::new();
    router
        .add_get("/api", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.json(serde_json::json!({"a": 1}), 200).await;
        })
        .unwrap();

    let response = roundtrip(Arc::new(router), b"GET /api HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: application/json\r\n"));
    assert!(response.ends_with("{\"a\":1}"));
}

#[tokio::test]
async fn test_request_split_across_chunks() {
    let mut router = Router::new();
    router
        .add_route(
            "/echo",
            |req: Request, mut resp: Response, _args: Vec<String>| async move {
                let body = String::from_utf8_lossy(req.body()).into_owned();
                resp.write(body, 200, "text/plain").await;
            },
            &[Method::POST],
        )
        .unwrap();

    let addr = serve_once(Arc::new(router)).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client
        .write_all(b"POST /echo HTTP/1.1\r\nHost: x\r\nContent-")
        .await
        .unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.write_all(b"Length: 6\r\n\r\nab").await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    client.write_all(b"cdef").await.unwrap();

    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();
    let response = String::from_utf8_lossy(&buf);

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("abcdef"));
}

#[tokio::test]
async fn test_second_write_is_ignored() {
    let mut router = Router::new();
    router
        .add_get("/once", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.write("first", 200, "text/plain").await;
            resp.write("second", 500, "text/plain").await;
        })
        .unwrap();

    let response =
        roundtrip(Arc::new(router), b"GET /once HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("first"));
    assert!(!response.contains("second"));
}

#[tokio::test]
async fn test_response_headers_set_by_handler() {
    let mut router = Router::new();
    router
        .add_get("/hdr", |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.set_header("X-Request-Id", "abc123");
            resp.write("ok", 200, "text/plain").await;
        })
        .unwrap();

    let response = roundtrip(Arc::new(router), b"GET /hdr HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.contains("X-Request-Id: abc123\r\n"));
}
