//! HTTP status codes as a typed enum.
//!
//! Only the codes this service actually sends. [`Status`] is accepted by
//! `Response::status()` and `Response::builder().status()`.
//!
//! ```rust
//! use summa::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::NotFound);
//!
//! Response::builder()
//!     .status(Status::ServiceUnavailable)
//!     .json(br#"{"detail":"storage unavailable"}"#.to_vec());
//! ```

/// The status codes summa produces.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                   // 200
    BadRequest,           // 400
    NotFound,             // 404
    MethodNotAllowed,     // 405
    ContentTooLarge,      // 413
    UnprocessableContent, // 422
    InternalServerError,  // 500
    ServiceUnavailable,   // 503
}

impl Status {
    pub fn code(self) -> u16 {
        http::StatusCode::from(self).as_u16()
    }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> Self {
        match s {
            Status::Ok                   => Self::OK,
            Status::BadRequest           => Self::BAD_REQUEST,
            Status::NotFound             => Self::NOT_FOUND,
            Status::MethodNotAllowed     => Self::METHOD_NOT_ALLOWED,
            Status::ContentTooLarge      => Self::PAYLOAD_TOO_LARGE,
            Status::UnprocessableContent => Self::UNPROCESSABLE_ENTITY,
            Status::InternalServerError  => Self::INTERNAL_SERVER_ERROR,
            Status::ServiceUnavailable   => Self::SERVICE_UNAVAILABLE,
        }
    }
}
