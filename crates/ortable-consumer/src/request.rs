use std::collections::HashMap;

use serde::Serialize;

use tracing::{error, warn};

use ortable::response::{ResponseKind, SERIALIZATION_ERROR};
use ortable::route::{ChoiceParameter, RestKind, RouteConfig, RouteConfigs};

use crate::error::{Error, ErrorKind, Result};
use crate::response::{Response, SerialResponseParser, StreamResponse};

fn slash_end(s: &str) -> &str {
    if s.len() > 1 && s.ends_with('/') {
        &s[..s.len() - 1]
    } else {
        s
    }
}

fn slash_start(s: &str) -> &str {
    if s.len() > 1 && s.starts_with('/') {
        &s[1..]
    } else {
        s
    }
}

fn slash_start_end(s: &str) -> &str {
    slash_start(slash_end(s))
}

fn parameter_error(message: String) -> Error {
    Error::new(ErrorKind::InvalidParameter, message)
}

// Requests are keyed by their route path without slashes, which is also the
// operation name of the command they run.
pub(crate) fn create_requests(
    route_configs: RouteConfigs,
    complete_address: &str,
    main_route: &str,
) -> HashMap<String, Request> {
    route_configs
        .into_iter()
        .map(|route| {
            (
                slash_start_end(&route.data.path).to_string(),
                Request::new(complete_address, main_route, route),
            )
        })
        .collect()
}

/// Request information.
pub struct RequestInfo<'device> {
    /// Route, relative to the device main route.
    pub route: &'device str,
    /// Route name.
    pub name: &'device str,
    /// Route description.
    pub description: Option<&'device str>,
    /// Rest kind.
    pub rest_kind: RestKind,
    /// Input parameter.
    pub parameter: Option<&'device ChoiceParameter>,
    /// Response kind.
    pub response_kind: ResponseKind,
}

impl<'device> RequestInfo<'device> {
    pub(crate) fn new(route: &'device str, request: &'device Request) -> Self {
        Self {
            route,
            name: &request.name,
            description: request.description.as_deref(),
            rest_kind: request.kind,
            parameter: request.parameter.as_ref(),
            response_kind: request.response_kind,
        }
    }
}

/// A provider request.
///
/// A request can be plain, or carry the single value of its
/// [`ChoiceParameter`] as a `json` body.
#[derive(Debug, PartialEq, Serialize)]
pub struct Request {
    pub(crate) kind: RestKind,
    pub(crate) name: String,
    pub(crate) route: String,
    pub(crate) description: Option<String>,
    pub(crate) parameter: Option<ChoiceParameter>,
    pub(crate) response_kind: ResponseKind,
}

impl Request {
    /// Returns the request [`RestKind`].
    #[must_use]
    pub const fn kind(&self) -> RestKind {
        self.kind
    }

    /// Returns the complete request `URL`.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.route
    }

    /// Returns the [`ChoiceParameter`] of the request.
    ///
    /// If [`None`], the request **does not** accept any input.
    #[must_use]
    pub const fn parameter(&self) -> Option<&ChoiceParameter> {
        self.parameter.as_ref()
    }

    /// Returns the [`ResponseKind`] sent back by the provider.
    #[must_use]
    pub const fn response_kind(&self) -> ResponseKind {
        self.response_kind
    }

    pub(crate) fn new(address: &str, main_route: &str, route_config: RouteConfig) -> Self {
        let route = format!(
            "{}/{}/{}",
            slash_end(address),
            slash_start_end(main_route),
            slash_start_end(&route_config.data.path)
        );

        Self {
            kind: route_config.rest_kind,
            name: route_config.data.name.into_owned(),
            route,
            description: route_config.data.description.map(|s| s.to_string()),
            parameter: route_config.data.parameter,
            response_kind: route_config.response_kind,
        }
    }

    pub(crate) async fn retrieve_response(
        &self,
        body: Option<HashMap<String, String>>,
    ) -> Result<Response> {
        let response = self.send(body).await?;

        Ok(match self.response_kind {
            ResponseKind::Serial => Response::SerialBody(SerialResponseParser::new(response)),
            ResponseKind::Stream => Response::StreamBody(StreamResponse::new(response)),
        })
    }

    // Builds the request body for the given argument.
    //
    // When the request has a parameter and no argument is given, the
    // parameter default value is sent.
    pub(crate) fn body(&self, argument: Option<&str>) -> Result<Option<HashMap<String, String>>> {
        let Some(ref parameter) = self.parameter else {
            if argument.is_some() {
                warn!("The request does not have input parameters.");
            }
            return Ok(None);
        };

        let value = match argument {
            Some(value) if parameter.allows(value) => value,
            Some(value) => {
                return Err(parameter_error(format!(
                    "`{value}` is not an allowed value for `{}`, expected one of {:?}",
                    parameter.name, parameter.choices
                )));
            }
            None => parameter.default.as_ref(),
        };

        let mut body = HashMap::with_capacity(1);
        body.insert(parameter.name.to_string(), value.to_string());
        Ok(Some(body))
    }

    pub(crate) async fn send(
        &self,
        body: Option<HashMap<String, String>>,
    ) -> Result<reqwest::Response> {
        let client = reqwest::Client::new();

        let request_builder = match self.kind {
            RestKind::Get => client.get(&self.route),
            RestKind::Post => client.post(&self.route),
            RestKind::Put => client.put(&self.route),
            RestKind::Delete => client.delete(&self.route),
        };

        let request_builder = match body {
            Some(body) if self.kind != RestKind::Get => request_builder.json(&body),
            _ => request_builder,
        };

        // Close the connection after issuing a request.
        let response = request_builder.header("Connection", "close").send().await?;

        // A provider which fails to serialize a response body sends the
        // failure cause as text, flagged by the serialization error header.
        if response.headers().contains_key(SERIALIZATION_ERROR) {
            match response.text().await {
                Ok(serial_error) => {
                    error!("Serialization error encountered on the provider side: {serial_error}");
                    return Err(Error::new(ErrorKind::Request, serial_error));
                }
                Err(err) => {
                    error!("Error occurred while converting the response into text: {err}");
                    return Err(Error::new(ErrorKind::Request, err.to_string()));
                }
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use ortable::response::ResponseKind;
    use ortable::route::{ChoiceParameter, RestKind, Route, RouteConfigs};

    use crate::error::ErrorKind;

    use super::{Request, create_requests};

    const ADDRESS: &str = "http://or-table.local/";
    const ADDRESS_WITHOUT_SLASH: &str = "http://or-table.local";
    const COMPLETE_ROUTE: &str = "http://or-table.local/or-table/height/increase";

    fn preset_request() -> Request {
        Request::new(
            ADDRESS,
            "/or-table",
            Route::put("Set preset position", "/preset")
                .with_parameter(ChoiceParameter::new(
                    "position",
                    &["NullLevel", "BeachChair"],
                ))
                .serialize_data()
                .change_response_kind(ResponseKind::Serial),
        )
    }

    #[test]
    fn request_builder() {
        let route = Route::put("Increase height", "/height/increase")
            .description("Move the height one step towards its maximum.")
            .serialize_data()
            .change_response_kind(ResponseKind::Serial);

        let expected = Request {
            kind: RestKind::Put,
            name: "Increase height".into(),
            route: COMPLETE_ROUTE.into(),
            description: Some("Move the height one step towards its maximum.".into()),
            parameter: None,
            response_kind: ResponseKind::Serial,
        };

        assert_eq!(Request::new(ADDRESS, "/or-table/", route.clone()), expected);
        assert_eq!(
            Request::new(ADDRESS_WITHOUT_SLASH, "or-table", route),
            expected
        );
        assert_eq!(expected.url(), COMPLETE_ROUTE);
    }

    #[test]
    fn requests_by_operation() {
        let route_configs = RouteConfigs::new()
            .insert(Route::put("Apply preset position", "/preset/apply").serialize_data())
            .insert(Route::get("Status", "/status").serialize_data());

        let requests = create_requests(route_configs, ADDRESS, "/or-table");

        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests.get("preset/apply").map(Request::url),
            Some("http://or-table.local/or-table/preset/apply")
        );
        assert_eq!(
            requests.get("status").map(Request::kind),
            Some(RestKind::Get)
        );
    }

    #[test]
    fn parameter_body() {
        let request = preset_request();

        let body = request.body(Some("BeachChair")).unwrap().unwrap();
        assert_eq!(body.get("position").map(String::as_str), Some("BeachChair"));

        // The default value is the first choice.
        let body = request.body(None).unwrap().unwrap();
        assert_eq!(body.get("position").map(String::as_str), Some("NullLevel"));

        let error = request.body(Some("Lounge")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn plain_body() {
        let request = Request::new(
            ADDRESS,
            "/or-table",
            Route::put("Apply preset position", "/preset/apply").serialize_data(),
        );

        assert_eq!(request.body(None), Ok(None));
        // Arguments for plain requests are ignored.
        assert_eq!(request.body(Some("BeachChair")), Ok(None));
    }
}
