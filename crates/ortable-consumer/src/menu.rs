use ortable::axis::Axis;
use ortable::command::Command;
use ortable::table::PresetPosition;

/// An action chosen from the consumer console menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Executes a command on the table.
    Execute(Command),
    /// Prints the table status.
    Status,
    /// Leaves the menu.
    Exit,
}

// Menu entries in display order.
const ENTRIES: [(char, MenuAction, &str); 13] = [
    (
        'a',
        MenuAction::Execute(Command::IncreaseAxis(Axis::Height)),
        "increase table height",
    ),
    (
        'b',
        MenuAction::Execute(Command::DecreaseAxis(Axis::Height)),
        "decrease table height",
    ),
    (
        'c',
        MenuAction::Execute(Command::IncreaseAxis(Axis::Trend)),
        "increase trend",
    ),
    (
        'd',
        MenuAction::Execute(Command::DecreaseAxis(Axis::Trend)),
        "decrease trend",
    ),
    (
        'e',
        MenuAction::Execute(Command::IncreaseAxis(Axis::Tilt)),
        "increase tilt",
    ),
    (
        'f',
        MenuAction::Execute(Command::DecreaseAxis(Axis::Tilt)),
        "decrease tilt",
    ),
    (
        'g',
        MenuAction::Execute(Command::IncreaseAxis(Axis::Backplate)),
        "increase backplate",
    ),
    (
        'h',
        MenuAction::Execute(Command::DecreaseAxis(Axis::Backplate)),
        "decrease backplate",
    ),
    (
        'i',
        MenuAction::Execute(Command::SetPreset(PresetPosition::NullLevel)),
        "set predefined position to null position",
    ),
    (
        'j',
        MenuAction::Execute(Command::SetPreset(PresetPosition::BeachChair)),
        "set predefined position to beach chair",
    ),
    (
        'k',
        MenuAction::Execute(Command::ApplyPreset),
        "apply predefined position",
    ),
    ('y', MenuAction::Status, "print status"),
    ('z', MenuAction::Exit, "exit"),
];

impl MenuAction {
    /// Returns the [`MenuAction`] bound to a key.
    ///
    /// If [`None`], the key is not bound and should be ignored.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        ENTRIES
            .iter()
            .find(|(entry_key, _, _)| *entry_key == key)
            .map(|(_, action, _)| *action)
    }

    /// Parses a line of user input.
    ///
    /// A single character is looked up as a menu key. Longer inputs are
    /// parsed as an operation name followed by its optional argument,
    /// i.e. `tilt/decrease` or `preset BeachChair`.
    #[must_use]
    pub fn from_input(input: &str) -> Option<Self> {
        let input = input.trim();
        let mut chars = input.chars();
        match (chars.next(), chars.next()) {
            (None, _) => None,
            (Some(key), None) => Self::from_key(key),
            _ => {
                let mut words = input.split_whitespace();
                let operation = words.next()?;
                let argument = words.next();
                if words.next().is_some() {
                    return None;
                }
                Command::from_operation(operation, argument)
                    .ok()
                    .map(Self::Execute)
            }
        }
    }

    /// Returns the menu text listing every key.
    #[must_use]
    pub fn menu() -> String {
        let mut menu = String::from("OR Table demo consumer\n");
        for (key, _, description) in ENTRIES {
            menu.push_str(&format!("{key}) {description}\n"));
        }
        menu.push_str("or type an operation, i.e. `height/increase`\n");
        menu.push_str("Enter: ");
        menu
    }
}

#[cfg(test)]
mod tests {
    use ortable::axis::Axis;
    use ortable::command::Command;
    use ortable::table::PresetPosition;

    use super::MenuAction;

    #[test]
    fn command_keys() {
        let commands = ('a'..='k')
            .filter_map(MenuAction::from_key)
            .collect::<Vec<_>>();
        assert_eq!(commands.len(), 11);

        assert_eq!(
            MenuAction::from_key('a'),
            Some(MenuAction::Execute(Command::IncreaseAxis(Axis::Height)))
        );
        assert_eq!(
            MenuAction::from_key('h'),
            Some(MenuAction::Execute(Command::DecreaseAxis(Axis::Backplate)))
        );
        assert_eq!(
            MenuAction::from_key('j'),
            Some(MenuAction::Execute(Command::SetPreset(
                PresetPosition::BeachChair
            )))
        );
        assert_eq!(
            MenuAction::from_key('k'),
            Some(MenuAction::Execute(Command::ApplyPreset))
        );
    }

    #[test]
    fn other_keys() {
        assert_eq!(MenuAction::from_key('y'), Some(MenuAction::Status));
        assert_eq!(MenuAction::from_input("  z\n"), Some(MenuAction::Exit));

        // Unknown keys are ignored.
        assert_eq!(MenuAction::from_key('l'), None);
        assert_eq!(MenuAction::from_key('A'), None);
        assert_eq!(MenuAction::from_input("\n"), None);
    }

    #[test]
    fn operation_input() {
        assert_eq!(
            MenuAction::from_input("tilt/decrease\n"),
            Some(MenuAction::Execute(Command::DecreaseAxis(Axis::Tilt)))
        );
        assert_eq!(
            MenuAction::from_input(" preset  BeachChair "),
            Some(MenuAction::Execute(Command::SetPreset(
                PresetPosition::BeachChair
            )))
        );
        assert_eq!(
            MenuAction::from_input("preset/apply"),
            Some(MenuAction::Execute(Command::ApplyPreset))
        );

        assert_eq!(MenuAction::from_input("preset Lounge"), None);
        assert_eq!(MenuAction::from_input("preset"), None);
        assert_eq!(MenuAction::from_input("height/increase now please"), None);
        assert_eq!(MenuAction::from_input("seat/increase"), None);
    }

    #[test]
    fn menu_text() {
        let menu = MenuAction::menu();

        assert!(menu.starts_with("OR Table demo consumer\n"));
        assert!(menu.contains("a) increase table height\n"));
        assert!(menu.contains("z) exit\n"));
        assert!(menu.contains("`height/increase`"));
        assert!(menu.ends_with("Enter: "));
    }
}
