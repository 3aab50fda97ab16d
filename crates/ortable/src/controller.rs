use log::debug;

use serde::{Deserialize, Serialize};

use crate::alarm::AlarmStatus;
use crate::axis::{Axis, Direction};
use crate::command::Command;
use crate::table::{PresetPosition, TableState};

/// Axis values and alarm flags taken at one consistent instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Axis values.
    pub state: TableState,
    /// Alarm flags matching `state`.
    pub alarms: AlarmStatus,
    /// Preset applied by the next [`Command::ApplyPreset`].
    pub selected_preset: PresetPosition,
}

/// Owner of the [`TableState`] and of its [`AlarmStatus`].
///
/// Every mutation saturates the touched axes into their ranges and
/// recomputes the alarm flags before returning, so the two are never out of
/// sync.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisController {
    state: TableState,
    alarms: AlarmStatus,
    selected_preset: PresetPosition,
}

impl Default for AxisController {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisController {
    /// Creates an [`AxisController`] with the table in
    /// [`PresetPosition::NullLevel`].
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::with_state(TableState::default())
    }

    /// Creates an [`AxisController`] from an initial [`TableState`].
    #[must_use]
    pub fn with_state(state: TableState) -> Self {
        let state = TableState::new(state.height, state.trend, state.tilt, state.backplate);
        Self {
            state,
            alarms: AlarmStatus::evaluate(&state),
            selected_preset: PresetPosition::default(),
        }
    }

    /// Moves an axis by one step in the given direction.
    ///
    /// Requests beyond the axis range saturate at the range bound.
    pub fn apply_delta(&mut self, axis: Axis, direction: Direction) -> &TableState {
        let limits = axis.limits();
        let current = self.state.get(axis);
        let next = limits.nudge(current, direction);

        if next == current {
            debug!("{axis} already at its {direction} bound: {current}");
        }

        self.state.set(axis, next);
        self.refresh_alarms();
        &self.state
    }

    /// Overwrites all axes with the values of a preset position.
    pub fn apply_preset(&mut self, position: PresetPosition) -> &TableState {
        self.state = position.state();
        self.refresh_alarms();
        &self.state
    }

    /// Selects the preset applied by [`Self::apply_selected_preset`].
    ///
    /// The table does not move.
    pub const fn select_preset(&mut self, position: PresetPosition) {
        self.selected_preset = position;
    }

    /// Moves the table to the selected preset position.
    pub fn apply_selected_preset(&mut self) -> &TableState {
        self.apply_preset(self.selected_preset)
    }

    /// Executes a [`Command`], returning the resulting snapshot.
    pub fn execute(&mut self, command: Command) -> TableSnapshot {
        match command {
            Command::IncreaseAxis(axis) => {
                self.apply_delta(axis, Direction::Increase);
            }
            Command::DecreaseAxis(axis) => {
                self.apply_delta(axis, Direction::Decrease);
            }
            Command::SetPreset(position) => self.select_preset(position),
            Command::ApplyPreset => {
                self.apply_selected_preset();
            }
        }
        self.snapshot()
    }

    /// Evaluates the alarm flags of the current state.
    #[must_use]
    #[inline]
    pub fn evaluate_alarms(&self) -> AlarmStatus {
        AlarmStatus::evaluate(&self.state)
    }

    /// Returns the current [`TableState`].
    #[must_use]
    pub const fn state(&self) -> &TableState {
        &self.state
    }

    /// Returns the alarm flags of the current state.
    #[must_use]
    pub const fn alarms(&self) -> &AlarmStatus {
        &self.alarms
    }

    /// Returns the selected preset position.
    #[must_use]
    pub const fn selected_preset(&self) -> PresetPosition {
        self.selected_preset
    }

    /// Returns a [`TableSnapshot`] of the current state.
    #[must_use]
    pub const fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            state: self.state,
            alarms: self.alarms,
            selected_preset: self.selected_preset,
        }
    }

    fn refresh_alarms(&mut self) {
        self.alarms = self.evaluate_alarms();
    }
}

#[cfg(test)]
mod tests {
    use crate::alarm::AlarmStatus;
    use crate::axis::{Axis, Direction};
    use crate::command::Command;
    use crate::table::{PresetPosition, TableState};

    use super::AxisController;

    fn table(height: f64, trend: f64, tilt: f64, backplate: f64) -> AxisController {
        AxisController::with_state(TableState::new(height, trend, tilt, backplate))
    }

    #[test]
    fn initial_state() {
        let controller = AxisController::new();
        assert_eq!(*controller.state(), PresetPosition::NullLevel.state());
        assert_eq!(controller.selected_preset(), PresetPosition::NullLevel);
        assert_eq!(*controller.alarms(), AlarmStatus::default());
    }

    #[test]
    fn height_saturates() {
        let mut controller = table(139., 0., 0., 0.);
        for _ in 0..9 {
            controller.apply_delta(Axis::Height, Direction::Increase);
        }
        assert_eq!(controller.state().height, 140.);
    }

    #[test]
    fn nudges_from_off_grid_values() {
        let mut controller = table(134.96, 0.05, 0., 0.);

        controller.apply_delta(Axis::Height, Direction::Increase);
        controller.apply_delta(Axis::Trend, Direction::Increase);

        assert!((controller.state().height - 135.96).abs() < 1e-9);
        assert!((controller.state().trend - 0.15).abs() < 1e-9);
        assert!(controller.alarms().height);
    }

    #[test]
    fn every_axis_stays_in_range() {
        let mut controller = AxisController::new();
        for axis in Axis::ALL {
            let limits = axis.limits();
            for direction in [Direction::Increase, Direction::Decrease] {
                let steps = ((limits.max - limits.min) / limits.step) as usize + 20;
                for _ in 0..steps {
                    let value = controller.apply_delta(axis, direction).get(axis);
                    assert!(value >= limits.min && value <= limits.max);
                }
                let bound = match direction {
                    Direction::Increase => limits.max,
                    Direction::Decrease => limits.min,
                };
                assert_eq!(controller.state().get(axis), bound);
            }
        }
    }

    #[test]
    fn presets_overwrite_state() {
        let mut controller = table(131., -12.3, 24.9, -39.);

        controller.apply_preset(PresetPosition::NullLevel);
        assert_eq!(*controller.state(), TableState::new(80., 0., 0., 0.));

        controller.apply_delta(Axis::Tilt, Direction::Decrease);
        controller.apply_preset(PresetPosition::BeachChair);
        assert_eq!(*controller.state(), TableState::new(80., 0., 0., 45.));
    }

    #[test]
    fn alarms_follow_mutations() {
        let mut controller = table(134., 0., 0., 0.);
        assert!(!controller.alarms().height);

        controller.apply_delta(Axis::Height, Direction::Increase);
        assert!(controller.alarms().height);
        assert_eq!(*controller.alarms(), controller.evaluate_alarms());

        controller.apply_preset(PresetPosition::NullLevel);
        assert!(!controller.alarms().any_active());
    }

    #[test]
    fn alarms_are_idempotent() {
        let controller = table(62., 44., 0., 77.);
        let first = controller.evaluate_alarms();
        assert_eq!(first, controller.evaluate_alarms());
        assert!(first.height && first.trend && !first.tilt && first.backplate);
    }

    #[test]
    fn set_then_apply_preset() {
        let mut controller = table(100., 10., 10., 10.);

        let snapshot = controller.execute(Command::SetPreset(PresetPosition::BeachChair));
        // Selecting a preset never moves the table.
        assert_eq!(snapshot.state, TableState::new(100., 10., 10., 10.));
        assert_eq!(snapshot.selected_preset, PresetPosition::BeachChair);

        let snapshot = controller.execute(Command::ApplyPreset);
        assert_eq!(snapshot.state, PresetPosition::BeachChair.state());
        assert_eq!(snapshot.alarms, AlarmStatus::evaluate(&snapshot.state));
    }

    #[test]
    fn execute_nudges() {
        let mut controller = AxisController::new();

        let snapshot = controller.execute(Command::IncreaseAxis(Axis::Backplate));
        assert_eq!(snapshot.state.backplate, 0.1);

        let snapshot = controller.execute(Command::DecreaseAxis(Axis::Height));
        assert_eq!(snapshot.state.height, 79.);
    }
}
