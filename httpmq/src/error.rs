use std::fmt;

use hyper::StatusCode;

/// The own result type where the error part is a async friendly error.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand of a boxed Send, Sync error.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to HTTP clients. The discriminant is the status code of the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpError {
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalError = 500,
}

impl HttpError {
    pub fn status(self) -> StatusCode {
        StatusCode::from_u16(self as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status();

        write!(f, "{} {}", status.as_u16(), status.canonical_reason().unwrap_or_default())
    }
}

impl std::error::Error for HttpError {}

/// Converts any error into an `HttpError`. Errors which are not `HttpError`s are internal
/// errors.
pub fn to_http_error(err: Error) -> HttpError {
    match err.downcast::<HttpError>() {
        Ok(e) => *e,
        Err(_) => HttpError::InternalError,
    }
}
