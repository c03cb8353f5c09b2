use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Start a server with a fresh queue manager on an ephemeral port.
pub(crate) async fn start_server() -> Result<SocketAddr> {
    let context = httpmq::Context {
        queue_manager: httpmq::queue::manager::start(),
    };

    let addr = httpmq::start_http(context, "127.0.0.1:0")
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(addr)
}

/// Send one request on a new connection and return the status and the body.
pub(crate) async fn request(addr: SocketAddr, method: Method, path_and_query: &str) -> Result<(StatusCode, String)> {
    let stream = TcpStream::connect(addr).await?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = Request::builder()
        .method(method)
        .uri(path_and_query)
        .header(hyper::header::HOST, addr.to_string())
        .body(Empty::<Bytes>::new())?;

    let response = sender.send_request(req).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();

    Ok((status, String::from_utf8(body.to_vec())?))
}

pub(crate) async fn push(addr: SocketAddr, queue: &str, message: &str) -> Result<StatusCode> {
    let (status, _) = request(addr, Method::PUT, &format!("{queue}?v={message}")).await?;

    Ok(status)
}

/// Pop a message, `None` if the server answered not found.
pub(crate) async fn pop(addr: SocketAddr, queue: &str) -> Result<Option<String>> {
    match request(addr, Method::GET, queue).await? {
        (StatusCode::OK, body) => Ok(Some(body)),
        (StatusCode::NOT_FOUND, _) => Ok(None),
        (status, _) => anyhow::bail!("Unexpected status {status}"),
    }
}

pub(crate) async fn pop_timeout(addr: SocketAddr, queue: &str, timeout_secs: u64) -> Result<Option<String>> {
    match request(addr, Method::GET, &format!("{queue}?timeout={timeout_secs}")).await? {
        (StatusCode::OK, body) => Ok(Some(body)),
        (StatusCode::NOT_FOUND, _) => Ok(None),
        (status, _) => anyhow::bail!("Unexpected status {status}"),
    }
}
