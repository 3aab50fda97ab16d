use std::borrow::Cow;

use ortable::command::{APPLY_PRESET, Command, SET_PRESET};
use ortable::controller::TableSnapshot;
use ortable::device::{DeviceData, DeviceDescription, ModelDescription};
use ortable::response::{CommandResponse, ResponseKind};
use ortable::route::{ChoiceParameter, Route, RouteConfigs};
use ortable::table::PresetPosition;

use axum::{
    Router,
    extract::{Json, State},
    routing::{get, put},
};

use serde::Deserialize;

use tracing::{info, warn};

use crate::responses::{ErrorResponse, SerialResponse, StreamResponse};
use crate::table::TableHandle;

// Default main route.
const MAIN_ROUTE: &str = "/or-table";

// Default manufacturer.
const MANUFACTURER: &str = "ortable";

// Default model and friendly name.
const MODEL_NAME: &str = "OR Table Provider";

/// Route of the table status.
pub const STATUS_ROUTE: &str = "/status";

/// Route of the report stream.
pub const REPORTS_ROUTE: &str = "/reports";

/// Name of the preset position parameter.
pub const POSITION_PARAMETER: &str = "position";

#[derive(Deserialize)]
struct PresetInput {
    position: String,
}

/// A virtual operating table exposed on the network.
///
/// The default main route is **/or-table**.
#[derive(Debug)]
pub struct OrTable {
    // Endpoint reference.
    epr: Cow<'static, str>,
    // Main route.
    main_route: &'static str,
    // Model description.
    model: ModelDescription,
    // Device description.
    description: DeviceDescription,
    // Table state.
    table: TableHandle,
}

impl OrTable {
    /// Creates an [`OrTable`] identified by the given endpoint reference.
    #[must_use]
    #[inline]
    pub fn new(epr: impl Into<Cow<'static, str>>) -> Self {
        Self::with_table(epr, TableHandle::new())
    }

    /// Creates an [`OrTable`] from an existing [`TableHandle`].
    #[must_use]
    pub fn with_table(epr: impl Into<Cow<'static, str>>, table: TableHandle) -> Self {
        Self {
            epr: epr.into(),
            main_route: MAIN_ROUTE,
            model: ModelDescription::new(MANUFACTURER, MODEL_NAME),
            description: DeviceDescription::new(MODEL_NAME),
            table,
        }
    }

    /// Sets the main route.
    #[must_use]
    pub const fn main_route(mut self, main_route: &'static str) -> Self {
        self.main_route = main_route;
        self
    }

    /// Sets the [`ModelDescription`].
    #[must_use]
    #[inline]
    pub fn model(mut self, model: ModelDescription) -> Self {
        self.model = model;
        self
    }

    /// Sets the [`DeviceDescription`].
    #[must_use]
    #[inline]
    pub fn description(mut self, description: DeviceDescription) -> Self {
        self.description = description;
        self
    }

    /// Returns the endpoint reference.
    #[must_use]
    pub fn epr(&self) -> &str {
        &self.epr
    }

    /// Returns the [`TableHandle`] shared with the routes.
    #[must_use]
    pub const fn table(&self) -> &TableHandle {
        &self.table
    }

    pub(crate) fn finalize(self) -> (&'static str, DeviceData, Router, TableHandle) {
        let (route_configs, router) = routes(self.table.clone());

        for route in &route_configs {
            info!(
                "Device route: [{}, \"{}{}\"]",
                route.rest_kind, self.main_route, route.data.path,
            );
        }

        (
            self.main_route,
            DeviceData::new(
                self.epr,
                self.model,
                self.description,
                self.main_route,
                route_configs,
            ),
            router,
            self.table,
        )
    }
}

fn routes(table: TableHandle) -> (RouteConfigs, Router) {
    let mut route_configs = RouteConfigs::new();
    let mut router = Router::new();

    for command in Command::nudges() {
        let (axis, verb, bound) = match command {
            Command::IncreaseAxis(axis) => (axis, "Increase", "maximum"),
            Command::DecreaseAxis(axis) => (axis, "Decrease", "minimum"),
            _ => continue,
        };
        let path = format!("/{}", command.operation());

        route_configs.add(
            Route::put(format!("{verb} {axis}"), path.clone())
                .description(format!("Move the {axis} one step towards its {bound}."))
                .serialize_data()
                .change_response_kind(ResponseKind::Serial),
        );

        router = router.route(
            &path,
            put(move |State(table): State<TableHandle>| async move {
                SerialResponse::new(table.execute(command).await)
            }),
        );
    }

    route_configs.add(
        Route::put("Set preset position", format!("/{SET_PRESET}"))
            .description("Select the preset position applied by the next apply request.")
            .with_parameter(ChoiceParameter::new(
                POSITION_PARAMETER,
                &PresetPosition::ALL.map(PresetPosition::name),
            ))
            .serialize_data()
            .change_response_kind(ResponseKind::Serial),
    );
    router = router.route(&format!("/{SET_PRESET}"), put(set_preset));

    route_configs.add(
        Route::put("Apply preset position", format!("/{APPLY_PRESET}"))
            .description("Move the table to the selected preset position.")
            .serialize_data()
            .change_response_kind(ResponseKind::Serial),
    );
    router = router.route(
        &format!("/{APPLY_PRESET}"),
        put(|State(table): State<TableHandle>| async move {
            SerialResponse::new(table.execute(Command::ApplyPreset).await)
        }),
    );

    route_configs.add(
        Route::get("Status", STATUS_ROUTE)
            .description("Return axis values and alarm flags.")
            .serialize_data()
            .change_response_kind(ResponseKind::Serial),
    );
    router = router.route(STATUS_ROUTE, get(status));

    route_configs.add(
        Route::get("Reports", REPORTS_ROUTE)
            .description("Stream metric, alert and invocation reports.")
            .serialize_data()
            .change_response_kind(ResponseKind::Stream),
    );
    router = router.route(REPORTS_ROUTE, get(reports));

    (route_configs, router.with_state(table))
}

async fn set_preset(
    State(table): State<TableHandle>,
    Json(input): Json<PresetInput>,
) -> Result<SerialResponse<CommandResponse>, ErrorResponse> {
    match input.position.parse::<PresetPosition>() {
        Ok(position) => Ok(SerialResponse::new(
            table.execute(Command::SetPreset(position)).await,
        )),
        Err(e) => {
            warn!("Rejected preset position: {e}");
            table.reject(SET_PRESET, e.to_string()).await;
            Err(ErrorResponse::invalid_data(e.to_string()))
        }
    }
}

async fn status(State(table): State<TableHandle>) -> SerialResponse<TableSnapshot> {
    SerialResponse::new(table.snapshot().await)
}

async fn reports(State(table): State<TableHandle>) -> StreamResponse {
    StreamResponse::from_reports(table.subscribe(), table.cancellation_token())
}

#[cfg(test)]
mod tests {
    use ortable::response::ResponseKind;
    use ortable::route::RestKind;

    use super::{OrTable, POSITION_PARAMETER};

    #[test]
    fn device_data() {
        let (main_route, device_data, _, _) = OrTable::new("urn:uuid:or-table-test").finalize();

        assert_eq!(main_route, "/or-table");
        assert_eq!(device_data.epr, "urn:uuid:or-table-test");
        assert_eq!(device_data.main_route, "/or-table");
        assert_eq!(device_data.route_configs.len(), 12);

        let paths = device_data
            .route_configs
            .iter()
            .map(|route| route.data.path.as_ref())
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            [
                "/height/increase",
                "/height/decrease",
                "/trend/increase",
                "/trend/decrease",
                "/tilt/increase",
                "/tilt/decrease",
                "/backplate/increase",
                "/backplate/decrease",
                "/preset",
                "/preset/apply",
                "/status",
                "/reports",
            ]
        );

        let preset = device_data.route_configs.find("/preset").unwrap();
        assert_eq!(preset.rest_kind, RestKind::Put);
        let parameter = preset.data.parameter.as_ref().unwrap();
        assert_eq!(parameter.name, POSITION_PARAMETER);
        assert!(parameter.allows("NullLevel") && parameter.allows("BeachChair"));

        let reports = device_data.route_configs.find("/reports").unwrap();
        assert_eq!(reports.rest_kind, RestKind::Get);
        assert_eq!(reports.response_kind, ResponseKind::Stream);
    }

    #[test]
    fn custom_main_route() {
        let table = OrTable::new("urn:uuid:or-table-test").main_route("/table");
        assert_eq!(table.epr(), "urn:uuid:or-table-test");

        let (main_route, device_data, _, _) = table.finalize();
        assert_eq!(main_route, "/table");
        assert_eq!(device_data.main_route, "/table");
    }
}
