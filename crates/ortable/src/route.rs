use std::borrow::Cow;

use hashbrown::DefaultHashBuilder;

use indexmap::set::{IndexSet, IntoIter, Iter};

use serde::{Deserialize, Serialize};

use crate::response::ResponseKind;

/// The kind of `REST` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestKind {
    /// `GET` request.
    Get,
    /// `PUT` request.
    Put,
    /// `POST` request.
    Post,
    /// `DELETE` request.
    Delete,
}

impl core::fmt::Display for RestKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
        .fmt(f)
    }
}

/// A route input parameter accepting one value out of a fixed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceParameter {
    /// Parameter name, which is also its JSON body field.
    pub name: Cow<'static, str>,
    /// Allowed values.
    pub choices: Vec<Cow<'static, str>>,
    /// Value used when none is given.
    pub default: Cow<'static, str>,
}

impl ChoiceParameter {
    /// Creates a [`ChoiceParameter`].
    ///
    /// The first choice is the default value.
    #[must_use]
    pub fn new(name: &'static str, choices: &[&'static str]) -> Self {
        Self {
            name: name.into(),
            choices: choices.iter().map(|choice| Cow::Borrowed(*choice)).collect(),
            default: choices.first().copied().unwrap_or_default().into(),
        }
    }

    /// Checks whether a value is allowed.
    #[must_use]
    pub fn allows(&self, value: &str) -> bool {
        self.choices.iter().any(|choice| choice == value)
    }
}

/// Route data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteData {
    /// Name.
    pub name: Cow<'static, str>,
    /// Path.
    pub path: Cow<'static, str>,
    /// Description.
    pub description: Option<Cow<'static, str>>,
    /// Input parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub parameter: Option<ChoiceParameter>,
}

impl PartialEq for RouteData {
    fn eq(&self, other: &Self) -> bool {
        self.path.eq(&other.path)
    }
}

impl RouteData {
    fn new(route: Route) -> Self {
        Self {
            name: route.name,
            path: route.path,
            description: route.description,
            parameter: route.parameter,
        }
    }
}

/// A route configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route data.
    #[serde(flatten)]
    pub data: RouteData,
    /// The kind of `REST` request.
    #[serde(rename = "REST kind")]
    pub rest_kind: RestKind,
    /// Response kind.
    #[serde(rename = "response kind")]
    pub response_kind: ResponseKind,
}

impl PartialEq for RouteConfig {
    fn eq(&self, other: &Self) -> bool {
        self.data.eq(&other.data) && self.rest_kind == other.rest_kind
    }
}

impl Eq for RouteConfig {}

impl core::hash::Hash for RouteConfig {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.data.path.hash(state);
        self.rest_kind.hash(state);
    }
}

impl RouteConfig {
    /// Changes the response kind.
    #[must_use]
    pub const fn change_response_kind(mut self, response_kind: ResponseKind) -> Self {
        self.response_kind = response_kind;
        self
    }

    fn new(route: Route) -> Self {
        Self {
            rest_kind: route.rest_kind,
            response_kind: ResponseKind::default(),
            data: RouteData::new(route),
        }
    }
}

/// A collection of [`RouteConfig`]s, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfigs(IndexSet<RouteConfig, DefaultHashBuilder>);

impl Default for RouteConfigs {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteConfigs {
    /// Creates an empty [`RouteConfigs`].
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self(IndexSet::with_hasher(DefaultHashBuilder::default()))
    }

    /// Inserts a [`RouteConfig`], returning the updated collection.
    #[must_use]
    #[inline]
    pub fn insert(mut self, route_config: RouteConfig) -> Self {
        self.add(route_config);
        self
    }

    /// Adds a [`RouteConfig`].
    ///
    /// A configuration with the same path and `REST` kind is replaced.
    #[inline]
    pub fn add(&mut self, route_config: RouteConfig) {
        self.0.replace(route_config);
    }

    /// Merges the given [`RouteConfigs`] with the current one.
    #[must_use]
    #[inline]
    pub fn merge(mut self, other: Self) -> Self {
        self.0.extend(other);
        self
    }

    /// Returns the number of routes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether the collection is empty.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the [`RouteConfig`] with the given path, if any.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&RouteConfig> {
        self.0.iter().find(|route| route.data.path == path)
    }

    /// Returns an iterator over [`RouteConfig`]s.
    #[inline]
    pub fn iter(&self) -> Iter<'_, RouteConfig> {
        self.0.iter()
    }
}

impl IntoIterator for RouteConfigs {
    type Item = RouteConfig;
    type IntoIter = IntoIter<RouteConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RouteConfigs {
    type Item = &'a RouteConfig;
    type IntoIter = Iter<'a, RouteConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A route definition.
///
/// Identifies a `REST` route that runs an operation on the table when
/// invoked.
#[derive(Debug)]
pub struct Route {
    // Name.
    name: Cow<'static, str>,
    // Path.
    path: Cow<'static, str>,
    // REST kind.
    rest_kind: RestKind,
    // Description.
    description: Option<Cow<'static, str>>,
    // Input parameter.
    parameter: Option<ChoiceParameter>,
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.rest_kind == other.rest_kind
    }
}

impl Eq for Route {}

impl Route {
    /// Creates a [`Route`] through a `GET` API.
    #[must_use]
    #[inline]
    pub fn get(name: impl Into<Cow<'static, str>>, path: impl Into<Cow<'static, str>>) -> Self {
        Self::init(RestKind::Get, name.into(), path.into())
    }

    /// Creates a [`Route`] through a `PUT` API.
    #[must_use]
    #[inline]
    pub fn put(name: impl Into<Cow<'static, str>>, path: impl Into<Cow<'static, str>>) -> Self {
        Self::init(RestKind::Put, name.into(), path.into())
    }

    /// Creates a [`Route`] through a `POST` API.
    #[must_use]
    #[inline]
    pub fn post(name: impl Into<Cow<'static, str>>, path: impl Into<Cow<'static, str>>) -> Self {
        Self::init(RestKind::Post, name.into(), path.into())
    }

    /// Creates a [`Route`] through a `DELETE` API.
    #[must_use]
    #[inline]
    pub fn delete(name: impl Into<Cow<'static, str>>, path: impl Into<Cow<'static, str>>) -> Self {
        Self::init(RestKind::Delete, name.into(), path.into())
    }

    /// Sets the route description.
    #[must_use]
    pub fn description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a [`ChoiceParameter`] to a [`Route`].
    #[must_use]
    #[inline]
    pub fn with_parameter(mut self, parameter: ChoiceParameter) -> Self {
        self.parameter = Some(parameter);
        self
    }

    /// Returns the route path.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.path
    }

    /// Returns the [`RestKind`].
    #[must_use]
    pub const fn kind(&self) -> RestKind {
        self.rest_kind
    }

    /// Returns the route [`ChoiceParameter`], if any.
    #[must_use]
    pub const fn parameter(&self) -> Option<&ChoiceParameter> {
        self.parameter.as_ref()
    }

    /// Serializes [`Route`] data.
    ///
    /// **It consumes the route.**
    #[must_use]
    #[inline]
    pub fn serialize_data(self) -> RouteConfig {
        RouteConfig::new(self)
    }

    fn init(rest_kind: RestKind, name: Cow<'static, str>, path: Cow<'static, str>) -> Self {
        Self {
            name,
            path,
            rest_kind,
            description: None,
            parameter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::response::ResponseKind;
    use crate::{deserialize, serialize};

    use super::{ChoiceParameter, RestKind, Route, RouteConfig, RouteConfigs, RouteData};

    fn route_config(rest_kind: RestKind, parameter: Option<ChoiceParameter>) -> RouteConfig {
        RouteConfig {
            rest_kind,
            response_kind: ResponseKind::default(),
            data: RouteData {
                name: "Route".into(),
                path: "/route".into(),
                description: Some("A route".into()),
                parameter,
            },
        }
    }

    #[test]
    fn test_all_routes() {
        for (route, rest_kind) in [
            (Route::get("Route", "/route"), RestKind::Get),
            (Route::put("Route", "/route"), RestKind::Put),
            (Route::post("Route", "/route"), RestKind::Post),
            (Route::delete("Route", "/route"), RestKind::Delete),
        ] {
            assert_eq!(
                deserialize::<RouteConfig>(serialize(
                    route.description("A route").serialize_data()
                )),
                route_config(rest_kind, None)
            );
        }
    }

    #[test]
    fn test_choice_parameter() {
        let parameter = ChoiceParameter::new("position", &["NullLevel", "BeachChair"]);
        assert_eq!(parameter.default, "NullLevel");
        assert!(parameter.allows("BeachChair"));
        assert!(!parameter.allows("Lounge"));

        let route_config = deserialize::<RouteConfig>(serialize(
            Route::put("Route", "/route")
                .description("A route")
                .with_parameter(parameter.clone())
                .serialize_data(),
        ));
        assert_eq!(route_config.data.parameter, Some(parameter));
    }

    #[test]
    fn test_route_configs_order() {
        let routes = RouteConfigs::new()
            .insert(Route::put("B", "/b").serialize_data())
            .insert(Route::put("A", "/a").serialize_data())
            .insert(Route::get("A", "/a").serialize_data())
            // Same path and kind: replaced.
            .insert(Route::put("A again", "/a").serialize_data());

        assert_eq!(routes.len(), 3);
        let paths = routes
            .iter()
            .map(|route| (route.data.path.as_ref(), route.rest_kind))
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            [
                ("/b", RestKind::Put),
                ("/a", RestKind::Put),
                ("/a", RestKind::Get)
            ]
        );
        assert_eq!(routes.find("/a").map(|route| route.data.name.as_ref()), Some("A again"));
    }
}
