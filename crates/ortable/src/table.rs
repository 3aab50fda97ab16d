use serde::{Deserialize, Serialize};

use crate::axis::Axis;

/// Values of all four table axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    /// Height, 60 to 140 cm.
    pub height: f64,
    /// Trendelenburg, -45° to 45°.
    pub trend: f64,
    /// Tilt, -25° to 25°.
    pub tilt: f64,
    /// Backplate, -40° to 80°.
    pub backplate: f64,
}

impl Default for TableState {
    fn default() -> Self {
        PresetPosition::NullLevel.state()
    }
}

impl TableState {
    /// Creates a [`TableState`], saturating every value into its axis range.
    #[must_use]
    pub fn new(height: f64, trend: f64, tilt: f64, backplate: f64) -> Self {
        let mut state = Self {
            height,
            trend,
            tilt,
            backplate,
        };
        for axis in Axis::ALL {
            state.set(axis, state.get(axis));
        }
        state
    }

    /// Returns the value of an axis.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Height => self.height,
            Axis::Trend => self.trend,
            Axis::Tilt => self.tilt,
            Axis::Backplate => self.backplate,
        }
    }

    /// Sets the value of an axis, saturating it into the axis range.
    pub fn set(&mut self, axis: Axis, value: f64) {
        let value = axis.limits().clamp(value);
        match axis {
            Axis::Height => self.height = value,
            Axis::Trend => self.trend = value,
            Axis::Tilt => self.tilt = value,
            Axis::Backplate => self.backplate = value,
        }
    }

    /// Returns an iterator over `(axis, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL.into_iter().map(|axis| (axis, self.get(axis)))
    }
}

/// A named fixed combination of axis values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetPosition {
    /// All angles flat, table at working height.
    #[default]
    NullLevel,
    /// Backplate raised to a sitting position.
    BeachChair,
}

impl PresetPosition {
    /// All preset positions.
    pub const ALL: [Self; 2] = [Self::NullLevel, Self::BeachChair];

    /// Returns the preset name, which is also its wire value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NullLevel => "NullLevel",
            Self::BeachChair => "BeachChair",
        }
    }

    /// Returns the axis values of the preset.
    #[must_use]
    pub const fn state(self) -> TableState {
        match self {
            Self::NullLevel => TableState {
                height: 80.,
                trend: 0.,
                tilt: 0.,
                backplate: 0.,
            },
            Self::BeachChair => TableState {
                height: 80.,
                trend: 0.,
                tilt: 0.,
                backplate: 45.,
            },
        }
    }
}

impl core::fmt::Display for PresetPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

impl core::str::FromStr for PresetPosition {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| UnknownPreset(s.into()))
    }
}

/// A preset name which does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPreset(pub String);

impl core::fmt::Display for UnknownPreset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown preset position `{}`", self.0)
    }
}

impl std::error::Error for UnknownPreset {}

#[cfg(test)]
mod tests {
    use crate::axis::Axis;
    use crate::{deserialize, serialize};

    use super::{PresetPosition, TableState, UnknownPreset};

    #[test]
    fn new_state_is_clamped() {
        let state = TableState::new(200., -90., 30., 45.);
        assert_eq!(state, TableState::new(140., -45., 25., 45.));
    }

    #[test]
    fn set_is_clamped() {
        let mut state = TableState::default();
        state.set(Axis::Backplate, -41.);
        assert_eq!(state.get(Axis::Backplate), -40.);
        state.set(Axis::Tilt, 12.5);
        assert_eq!(state.tilt, 12.5);
    }

    #[test]
    fn preset_names() {
        assert_eq!("BeachChair".parse(), Ok(PresetPosition::BeachChair));
        assert_eq!("NullLevel".parse(), Ok(PresetPosition::NullLevel));
        assert_eq!(
            "Trendelenburg".parse::<PresetPosition>(),
            Err(UnknownPreset("Trendelenburg".into()))
        );
    }

    #[test]
    fn preset_wire_value() {
        assert_eq!(
            serialize(PresetPosition::BeachChair),
            serde_json::json!("BeachChair")
        );
        assert_eq!(
            deserialize::<TableState>(serialize(PresetPosition::BeachChair.state())),
            TableState::new(80., 0., 0., 45.)
        );
    }
}
