use std::sync::Arc;

use littleweb::config::Config;
use littleweb::http::request::Request;
use littleweb::http::response::Response;
use littleweb::router::Router;
use littleweb::server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load();

    let mut router = Router::new();
    router.add_get(
        "/",
        |_req: Request, mut resp: Response, _args: Vec<String>| async move {
            resp.write("Hello from littleweb\n", 200, "text/plain").await;
        },
    )?;
    router.add_get(
        r"/items/(\d+)",
        |_req: Request, mut resp: Response, args: Vec<String>| async move {
            resp.json(serde_json::json!({ "item": args[0] }), 200).await;
        },
    )?;
    router.add_post(
        "/echo",
        |req: Request, mut resp: Response, _args: Vec<String>| async move {
            let body = String::from_utf8_lossy(req.body()).into_owned();
            resp.write(body, 200, "text/plain").await;
        },
    )?;
    let router = Arc::new(router);

    tokio::select! {
        res = server::listener::run(&cfg, router) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
