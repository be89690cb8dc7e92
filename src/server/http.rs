//! HTTP inspection endpoint: `GET /peers` returns the registry snapshot as
//! JSON.

use std::net::SocketAddr;

use anyhow::Result;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::registry::PeerRegistry;

async fn handle(
    req: Request<Body>,
    registry: PeerRegistry,
) -> Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&hyper::Method::GET, "/peers") => {
            let peers = registry.snapshot().await;
            let body = serde_json::to_string(&peers).unwrap_or_else(|_| "[]".into());
            Ok(Response::new(Body::from(body)))
        }
        _ => Ok(Response::builder()
            .status(404)
            .body(Body::from("not found"))
            .unwrap()),
    }
}

pub(super) fn spawn(
    registry: PeerRegistry,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let make_svc = make_service_fn(move |_| {
        let registry = registry.clone();
        async move { Ok::<_, hyper::Error>(service_fn(move |req| handle(req, registry.clone()))) }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = Server::try_bind(&addr)?.serve(make_svc);
    let local_addr = server.local_addr();

    let task = tokio::spawn(async move {
        tracing::info!(addr = %local_addr, "inspection endpoint running");
        let graceful = server.with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        });
        if let Err(e) = graceful.await {
            tracing::error!(error = %e, "inspection endpoint error");
        }
    });

    Ok((local_addr, task))
}
