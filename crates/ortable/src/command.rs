use serde::{Deserialize, Serialize};

use crate::axis::{Axis, Direction};
use crate::table::{PresetPosition, UnknownPreset};

/// Operation name of [`Command::SetPreset`].
pub const SET_PRESET: &str = "preset";
/// Operation name of [`Command::ApplyPreset`].
pub const APPLY_PRESET: &str = "preset/apply";

/// A command executed against an
/// [`AxisController`](crate::controller::AxisController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", content = "argument")]
pub enum Command {
    /// Moves an axis one step towards its maximum.
    IncreaseAxis(Axis),
    /// Moves an axis one step towards its minimum.
    DecreaseAxis(Axis),
    /// Selects the preset position used by [`Command::ApplyPreset`].
    SetPreset(PresetPosition),
    /// Moves the table to the selected preset position.
    ApplyPreset,
}

impl Command {
    /// Builds the nudge command for an axis and a direction.
    #[must_use]
    pub const fn nudge(axis: Axis, direction: Direction) -> Self {
        match direction {
            Direction::Increase => Self::IncreaseAxis(axis),
            Direction::Decrease => Self::DecreaseAxis(axis),
        }
    }

    /// Returns all eight axis nudge commands.
    pub fn nudges() -> impl Iterator<Item = Self> {
        Axis::ALL.into_iter().flat_map(|axis| {
            [
                Self::nudge(axis, Direction::Increase),
                Self::nudge(axis, Direction::Decrease),
            ]
        })
    }

    /// Returns the operation name, e.g. `height/increase`.
    ///
    /// The operation name is also the route path of the command, relative to
    /// the device main route.
    #[must_use]
    pub fn operation(&self) -> String {
        match self {
            Self::IncreaseAxis(axis) => format!("{axis}/{}", Direction::Increase),
            Self::DecreaseAxis(axis) => format!("{axis}/{}", Direction::Decrease),
            Self::SetPreset(_) => SET_PRESET.into(),
            Self::ApplyPreset => APPLY_PRESET.into(),
        }
    }

    /// Parses an operation name along with its optional argument.
    ///
    /// # Errors
    ///
    /// Returns an error when the operation does not exist, or when the
    /// argument is missing, unexpected or not a valid preset position.
    pub fn from_operation(operation: &str, argument: Option<&str>) -> Result<Self, CommandError> {
        let operation = operation.trim_matches('/');

        let command = match operation {
            SET_PRESET => {
                let argument = argument.ok_or(CommandError::MissingArgument)?;
                return Ok(Self::SetPreset(argument.parse()?));
            }
            APPLY_PRESET => Self::ApplyPreset,
            _ => {
                let (axis, direction) = operation
                    .split_once('/')
                    .ok_or_else(|| CommandError::UnknownOperation(operation.into()))?;
                let axis = axis
                    .parse()
                    .map_err(|_| CommandError::UnknownOperation(operation.into()))?;
                match direction {
                    "increase" => Self::IncreaseAxis(axis),
                    "decrease" => Self::DecreaseAxis(axis),
                    _ => return Err(CommandError::UnknownOperation(operation.into())),
                }
            }
        };

        if argument.is_some() {
            return Err(CommandError::UnexpectedArgument);
        }
        Ok(command)
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SetPreset(preset) => write!(f, "{} {preset}", self.operation()),
            _ => self.operation().fmt(f),
        }
    }
}

/// Errors raised while parsing a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The operation name does not exist.
    UnknownOperation(String),
    /// The operation requires an argument.
    MissingArgument,
    /// The operation does not accept an argument.
    UnexpectedArgument,
    /// The argument is not a preset position.
    InvalidPreset(UnknownPreset),
}

impl From<UnknownPreset> for CommandError {
    fn from(e: UnknownPreset) -> Self {
        Self::InvalidPreset(e)
    }
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownOperation(operation) => write!(f, "unknown operation `{operation}`"),
            Self::MissingArgument => "missing operation argument".fmt(f),
            Self::UnexpectedArgument => "the operation does not accept an argument".fmt(f),
            Self::InvalidPreset(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CommandError {}

#[cfg(test)]
mod tests {
    use crate::axis::Axis;
    use crate::table::{PresetPosition, UnknownPreset};
    use crate::{deserialize, serialize};

    use super::{Command, CommandError};

    #[test]
    fn operations_round_trip() {
        for command in Command::nudges().chain([Command::ApplyPreset]) {
            assert_eq!(
                Command::from_operation(&command.operation(), None),
                Ok(command)
            );
        }

        assert_eq!(
            Command::from_operation("/preset", Some("BeachChair")),
            Ok(Command::SetPreset(PresetPosition::BeachChair))
        );
    }

    #[test]
    fn eight_nudges() {
        let nudges = Command::nudges().collect::<Vec<_>>();
        assert_eq!(nudges.len(), 8);
        assert_eq!(nudges[0], Command::IncreaseAxis(Axis::Height));
        assert_eq!(nudges[7], Command::DecreaseAxis(Axis::Backplate));
        assert_eq!(nudges[5].operation(), "tilt/decrease");
    }

    #[test]
    fn rejected_operations() {
        assert_eq!(
            Command::from_operation("seat/increase", None),
            Err(CommandError::UnknownOperation("seat/increase".into()))
        );
        assert_eq!(
            Command::from_operation("height/raise", None),
            Err(CommandError::UnknownOperation("height/raise".into()))
        );
        assert_eq!(
            Command::from_operation("preset", None),
            Err(CommandError::MissingArgument)
        );
        assert_eq!(
            Command::from_operation("preset", Some("Lounge")),
            Err(CommandError::InvalidPreset(UnknownPreset("Lounge".into())))
        );
        assert_eq!(
            Command::from_operation("preset/apply", Some("NullLevel")),
            Err(CommandError::UnexpectedArgument)
        );
    }

    #[test]
    fn command_wire_format() {
        assert_eq!(
            serialize(Command::SetPreset(PresetPosition::NullLevel)),
            serde_json::json!({ "command": "SetPreset", "argument": "NullLevel" })
        );
        assert_eq!(
            deserialize::<Command>(serde_json::json!({
                "command": "IncreaseAxis",
                "argument": "trend",
            })),
            Command::IncreaseAxis(Axis::Trend)
        );
    }
}
