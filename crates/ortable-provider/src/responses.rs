use std::convert::Infallible;

use ortable::report::Report;
use ortable::response::{
    ErrorKind, ErrorResponse as OrTableErrorResponse, SERIALIZATION_ERROR,
    SerialResponse as OrTableSerialResponse,
};

use axum::{
    body::Body,
    extract::Json,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderName},
    },
    response::{IntoResponse, Response},
};

use serde::Serialize;

use tokio::sync::broadcast::Receiver;

use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use tokio_util::sync::CancellationToken;

use tracing::{error, warn};

// Content type of a newline-delimited JSON stream.
const NDJSON: &str = "application/x-ndjson";

/// A response carrying the data produced by an operation as JSON.
///
/// When the data cannot be serialized, the response carries the
/// [`SERIALIZATION_ERROR`] header and the error as plain text.
#[derive(Debug)]
pub struct SerialResponse<T: Serialize>(OrTableSerialResponse<T>);

impl<T: Serialize> SerialResponse<T> {
    /// Creates a [`SerialResponse`].
    #[must_use]
    #[inline]
    pub const fn new(data: T) -> Self {
        Self(OrTableSerialResponse::new(data))
    }
}

impl<T: Serialize> IntoResponse for SerialResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => {
                (StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response()
            }
            Err(e) => {
                error!("Unable to serialize the response body: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(HeaderName::from_static(SERIALIZATION_ERROR), "true")],
                    e.to_string(),
                )
                    .into_response()
            }
        }
    }
}

/// A response describing an error raised while handling a request.
#[derive(Debug)]
pub struct ErrorResponse(OrTableErrorResponse);

impl ErrorResponse {
    /// Creates an [`ErrorResponse`] for invalid request data.
    ///
    /// It is sent with the `400 Bad Request` status.
    #[must_use]
    #[inline]
    pub fn invalid_data(description: impl Into<String>) -> Self {
        Self(OrTableErrorResponse::new(ErrorKind::InvalidData, description))
    }

    const fn status(&self) -> StatusCode {
        match self.0.error {
            ErrorKind::InvalidData => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0)).into_response()
    }
}

/// A response streaming [`Report`]s as newline-delimited JSON.
///
/// The stream ends when the given token is cancelled or when no more reports
/// can be received.
pub struct StreamResponse(Response);

impl StreamResponse {
    /// Creates a [`StreamResponse`] from a report receiver.
    pub fn from_reports(receiver: Receiver<Report>, cancellation_token: CancellationToken) -> Self {
        let reports = BroadcastStream::new(receiver).filter_map(|report| match report {
            Ok(report) => match report.to_line() {
                Ok(line) => Some(Ok::<_, Infallible>(line)),
                Err(e) => {
                    error!("Unable to serialize a {} report: {e}", report.name());
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Report observer lagged behind, {skipped} reports skipped");
                None
            }
        });
        let lines =
            futures_util::StreamExt::take_until(reports, cancellation_token.cancelled_owned());

        Self(([(CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
    }
}

impl IntoResponse for StreamResponse {
    fn into_response(self) -> Response {
        self.0
    }
}
