use bytes::Bytes;

use futures_util::stream::{Stream, TryStreamExt};

use serde::de::DeserializeOwned;

use ortable::response::{ErrorResponse, SerialResponse};

use crate::error::{Error, ErrorKind, Result};

// Turns an unsuccessful provider reply into an error.
//
// Providers describe their failures with an `ErrorResponse` body. When the
// body is missing or malformed, only the status code is reported.
async fn failure(response: reqwest::Response) -> Error {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(error) => Error::new(ErrorKind::Request, format!("{status}: {error}")),
        Err(_) => Error::new(
            ErrorKind::Request,
            format!("The provider replied with status {status}"),
        ),
    }
}

async fn json_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(failure(response).await);
    }

    response
        .json::<T>()
        .await
        .map_err(|e| Error::new(ErrorKind::JsonResponse, e.to_string()))
}

/// A parser for a [`SerialResponse`] or for the [`ErrorResponse`] replacing
/// it when an operation fails.
#[derive(Debug)]
pub struct SerialResponseParser(reqwest::Response);

impl SerialResponseParser {
    /// Returns the status code of the response.
    #[must_use]
    pub fn status(&self) -> reqwest::StatusCode {
        self.0.status()
    }

    /// Parses the response body into a [`SerialResponse`].
    ///
    /// # Errors
    ///
    /// Returns an error when the provider replied with a failure or when the
    /// body cannot be parsed as `T`.
    pub async fn parse_body<T: DeserializeOwned>(self) -> Result<SerialResponse<T>> {
        json_body(self.0).await.map(SerialResponse::new)
    }

    /// Parses the response body into an [`ErrorResponse`].
    ///
    /// # Errors
    ///
    /// Returns an error when the response is successful or when the body is
    /// not an [`ErrorResponse`].
    pub async fn parse_error(self) -> Result<ErrorResponse> {
        if self.0.status().is_success() {
            return Err(Error::new(
                ErrorKind::JsonResponse,
                "The response does not describe an error",
            ));
        }

        self.0
            .json::<ErrorResponse>()
            .await
            .map_err(|e| Error::new(ErrorKind::JsonResponse, e.to_string()))
    }
}

/// A byte stream response.
#[derive(Debug)]
pub struct StreamResponse(reqwest::Response);

impl StreamResponse {
    /// Opens the byte stream.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider replied with a failure.
    pub async fn open_stream(self) -> Result<impl Stream<Item = Result<Bytes>> + Send> {
        if !self.0.status().is_success() {
            return Err(failure(self.0).await);
        }

        Ok(self
            .0
            .bytes_stream()
            .map_err(|e| Error::new(ErrorKind::StreamResponse, e.to_string())))
    }

    pub(crate) const fn new(response: reqwest::Response) -> Self {
        Self(response)
    }
}

/// All responses returned by a provider.
#[derive(Debug)]
pub enum Response {
    /// A [`SerialResponse`] body.
    SerialBody(SerialResponseParser),
    /// A byte stream body.
    StreamBody(StreamResponse),
}

impl Response {
    /// Returns the [`SerialResponseParser`] of a serial response.
    ///
    /// # Errors
    ///
    /// Returns an error when the response is not a serial response.
    pub fn serial(self) -> Result<SerialResponseParser> {
        match self {
            Self::SerialBody(parser) => Ok(parser),
            Self::StreamBody(_) => Err(Error::new(
                ErrorKind::JsonResponse,
                "Expected a serial response",
            )),
        }
    }

    /// Returns the [`StreamResponse`] of a stream response.
    ///
    /// # Errors
    ///
    /// Returns an error when the response is not a stream response.
    pub fn stream(self) -> Result<StreamResponse> {
        match self {
            Self::StreamBody(stream) => Ok(stream),
            Self::SerialBody(_) => Err(Error::new(
                ErrorKind::StreamResponse,
                "Expected a stream response",
            )),
        }
    }
}
