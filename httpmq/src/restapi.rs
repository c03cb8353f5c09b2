
use crate::error::{to_http_error, HttpError};
use crate::queue::manager as qm;
use crate::queue::Message;
use crate::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, Uri};
use log::{debug, error, warn};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::time::Duration;
use url::form_urlencoded;

/// Queue operation decoded from a request.
#[derive(Debug, PartialEq)]
pub enum Operation {
    Push { queue_name: String, message: Message },
    Pop { queue_name: String },
    PopWait { queue_name: String, timeout: Duration },
}

/// Map method, path and query to a queue operation. The queue name is the decoded path, a path
/// which doesn't decode to UTF-8 is a bad request.
///
/// * `PUT /name?v=message` pushes, missing or empty `v` is a bad request
/// * `GET /name` pops without waiting
/// * `GET /name?timeout=secs` pops waiting at most `secs` seconds, an unparsable timeout is
///   reported as not found
pub fn parse_request(method: &Method, uri: &Uri) -> Result<Operation, HttpError> {
    match *method {
        Method::PUT => match query_param(uri, "v") {
            Some(message) if !message.is_empty() => Ok(Operation::Push {
                queue_name: queue_name(uri)?,
                message,
            }),
            _ => Err(HttpError::BadRequest),
        },
        Method::GET => {
            let queue_name = queue_name(uri)?;

            match query_param(uri, "timeout") {
                Some(timeout) if !timeout.is_empty() => match timeout.parse::<u64>() {
                    Ok(0) => Ok(Operation::Pop { queue_name }),
                    Ok(secs) => Ok(Operation::PopWait {
                        queue_name,
                        timeout: Duration::from_secs(secs),
                    }),
                    Err(e) => {
                        warn!("Invalid timeout {:?} on {}: {}", timeout, queue_name, e);

                        Err(HttpError::NotFound)
                    }
                },
                _ => Ok(Operation::Pop { queue_name }),
            }
        }
        _ => Err(HttpError::MethodNotAllowed),
    }
}

/// Percent-decoded path. Lossy decoding would map different paths to the same queue.
fn queue_name(uri: &Uri) -> Result<String, HttpError> {
    match percent_decode_str(uri.path()).decode_utf8() {
        Ok(name) => Ok(name.into_owned()),
        Err(e) => {
            warn!("Path {} is not valid UTF-8: {}", uri.path(), e);

            Err(HttpError::BadRequest)
        }
    }
}

/// First value of the query parameter, url decoded.
fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;

    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Execute the operation. A body is returned for pops, pushes have no body.
pub async fn execute(operation: Operation, context: &Context) -> Result<Option<Message>, HttpError> {
    let result = match operation {
        Operation::Push { queue_name, message } => {
            debug!("Add {:?} to queue {}", message, queue_name);

            qm::push(&context.queue_manager, &queue_name, message).await.map(|_| None)
        }
        Operation::Pop { queue_name } => qm::pop(&context.queue_manager, &queue_name).await,
        Operation::PopWait { queue_name, timeout } => {
            debug!("Pop from {} waiting {:?}", queue_name, timeout);

            qm::pop_timeout(&context.queue_manager, &queue_name, timeout).await
        }
    };

    match result {
        Ok(body) => Ok(body),
        Err(e) => {
            error!("Error executing queue operation {:?}", e);

            Err(to_http_error(e))
        }
    }
}

/// Queue API. Every path is a queue.
pub async fn route<B>(req: Request<B>, context: Context) -> Result<Response<Full<Bytes>>, Infallible> {
    let operation = match parse_request(req.method(), req.uri()) {
        Ok(operation) => operation,
        Err(e) => return Ok(error_response(e)),
    };
    let is_pop = !matches!(operation, Operation::Push { .. });

    let response = match execute(operation, &context).await {
        Ok(Some(message)) => Response::new(Full::new(Bytes::from(message))),
        Ok(None) if is_pop => error_response(HttpError::NotFound),
        Ok(None) => Response::new(Full::new(Bytes::new())),
        Err(e) => error_response(e),
    };

    Ok(response)
}

/// Admin API, it lists the queues as JSON on `GET /queues`.
pub async fn admin_route<B>(req: Request<B>, context: Context) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != "/queues" {
        return Ok(error_response(HttpError::NotFound));
    }

    let queues = qm::get_queues(&context.queue_manager).await;

    match serde_json::to_string(&queues) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));

            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );

            Ok(response)
        }
        Err(e) => {
            error!("Error serializing queues {:?}", e);

            Ok(error_response(HttpError::InternalError))
        }
    }
}

fn error_response(err: HttpError) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));

    *response.status_mut() = err.status();

    response
}
