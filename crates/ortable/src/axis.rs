use serde::{Deserialize, Serialize};

/// Distance from an axis extreme within which an alarm is raised.
pub const ALARM_MARGIN: f64 = 5.0;

/// Range and step of an [`Axis`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    /// Minimum value allowed.
    pub min: f64,
    /// Maximum value allowed.
    pub max: f64,
    /// Magnitude of a single nudge.
    pub step: f64,
}

impl AxisLimits {
    const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Saturates a value into `[min, max]`.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Checks whether a value lies inside one of the two alarm sub-ranges.
    ///
    /// Both sub-ranges include their bounds.
    #[must_use]
    pub fn in_alarm_band(&self, value: f64) -> bool {
        value <= self.min + ALARM_MARGIN || value >= self.max - ALARM_MARGIN
    }

    // Moves a value by one step, saturating at the range extremes.
    pub(crate) fn nudge(&self, value: f64, direction: Direction) -> f64 {
        self.clamp(value + direction.sign() * self.step)
    }
}

/// One of the four independently controlled degrees of freedom of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Table height, in centimeters.
    Height,
    /// Trendelenburg angle, in degrees.
    Trend,
    /// Lateral tilt, in degrees.
    Tilt,
    /// Backplate angle, in degrees.
    Backplate,
}

impl Axis {
    /// All axes, in reporting order.
    pub const ALL: [Self; 4] = [Self::Height, Self::Trend, Self::Tilt, Self::Backplate];

    /// Returns the [`AxisLimits`] of this axis.
    #[must_use]
    pub const fn limits(self) -> AxisLimits {
        match self {
            Self::Height => AxisLimits::new(60., 140., 1.),
            Self::Trend => AxisLimits::new(-45., 45., 0.1),
            Self::Tilt => AxisLimits::new(-25., 25., 0.1),
            Self::Backplate => AxisLimits::new(-40., 80., 0.1),
        }
    }

    /// Returns the axis name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Trend => "trend",
            Self::Tilt => "tilt",
            Self::Backplate => "backplate",
        }
    }

    /// Returns the unit the axis is measured in.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Height => "cm",
            Self::Trend | Self::Tilt | Self::Backplate => "°",
        }
    }
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

impl core::str::FromStr for Axis {
    type Err = UnknownAxis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|axis| axis.name() == s)
            .ok_or_else(|| UnknownAxis(s.into()))
    }
}

/// An axis name which does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAxis(pub String);

impl core::fmt::Display for UnknownAxis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown axis `{}`", self.0)
    }
}

impl std::error::Error for UnknownAxis {}

/// Direction of an axis nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards the axis maximum.
    Increase,
    /// Towards the axis minimum.
    Decrease,
}

impl Direction {
    /// Returns the direction name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }

    const fn sign(self) -> f64 {
        match self {
            Self::Increase => 1.,
            Self::Decrease => -1.,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}
