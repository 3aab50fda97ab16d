use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::table::TableState;

/// Alarm flags, one per axis.
///
/// An axis alarm is active when its value lies within
/// [`ALARM_MARGIN`](crate::axis::ALARM_MARGIN) of either range extreme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmStatus {
    /// Height alarm.
    pub height: bool,
    /// Trendelenburg alarm.
    pub trend: bool,
    /// Tilt alarm.
    pub tilt: bool,
    /// Backplate alarm.
    pub backplate: bool,
}

impl AlarmStatus {
    /// Derives the [`AlarmStatus`] of a [`TableState`].
    #[must_use]
    pub fn evaluate(state: &TableState) -> Self {
        let active = |axis: Axis| axis.limits().in_alarm_band(state.get(axis));
        Self {
            height: active(Axis::Height),
            trend: active(Axis::Trend),
            tilt: active(Axis::Tilt),
            backplate: active(Axis::Backplate),
        }
    }

    /// Returns the alarm flag of an axis.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> bool {
        match axis {
            Axis::Height => self.height,
            Axis::Trend => self.trend,
            Axis::Tilt => self.tilt,
            Axis::Backplate => self.backplate,
        }
    }

    /// Checks whether at least one alarm is active.
    #[must_use]
    pub const fn any_active(&self) -> bool {
        self.height || self.trend || self.tilt || self.backplate
    }

    /// Returns the alarms whose presence differs from `previous`.
    #[must_use]
    pub fn changes_from(&self, previous: &Self) -> Vec<AlarmChange> {
        Axis::ALL
            .into_iter()
            .filter(|axis| self.get(*axis) != previous.get(*axis))
            .map(|axis| AlarmChange {
                axis,
                presence: self.get(axis),
            })
            .collect()
    }
}

/// A change of presence of a single axis alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmChange {
    /// Axis the alarm belongs to.
    pub axis: Axis,
    /// New presence of the alarm.
    pub presence: bool,
}
