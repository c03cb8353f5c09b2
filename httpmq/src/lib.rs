//! Ephemeral, in-memory message queue addressable over HTTP.
//!
//! Clients `PUT` messages to a queue named by the request path and `GET` them back in FIFO
//! order. A `GET` with a `timeout` parameter waits (long-poll) until a message arrives or the
//! deadline elapses.
pub mod config;
pub mod error;
pub mod queue;
pub mod restapi;

pub use error::{Error, Result};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use log::{error, info, trace};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Handles to the running engine which are shared by the request handlers.
#[derive(Clone)]
pub struct Context {
    pub queue_manager: queue::manager::QueueManagerSink,
}

#[macro_export]
macro_rules! logerr {
    ($val:expr) => {
        if let Err(e) = $val {
            log::error!("Error {:?}", e);
        }
    };
}

/// Start the queue API listening on `url`. Returns the bound address, binding is the only step
/// which can fail.
pub async fn start_http(context: Context, url: &str) -> Result<SocketAddr> {
    let listener = TcpListener::bind(url).await?;
    let local_addr = listener.local_addr()?;

    info!("Start HTTP queue API on {}", local_addr);

    tokio::spawn(accept_loop(listener, move |req| restapi::route(req, context.clone())));

    Ok(local_addr)
}

/// Start the admin API listening on `url`.
pub async fn start_admin(context: Context, url: &str) -> Result<SocketAddr> {
    let listener = TcpListener::bind(url).await?;
    let local_addr = listener.local_addr()?;

    info!("Start HTTP admin API on {}", local_addr);

    tokio::spawn(accept_loop(listener, move |req| restapi::admin_route(req, context.clone())));

    Ok(local_addr)
}

async fn accept_loop<F, Fut>(listener: TcpListener, handler: F)
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = std::result::Result<Response<Full<Bytes>>, Infallible>> + Send + 'static,
{
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Error accepting connection {:?}", e);
                continue;
            }
        };

        trace!("Connection from {}", peer);

        let handler = handler.clone();

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(socket), service_fn(handler))
                .await
            {
                error!("Error serving {} {:?}", peer, e);
            }
        });
    }
}
