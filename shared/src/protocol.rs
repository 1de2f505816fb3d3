//! Wire protocol: newline-delimited UTF-8 text in both directions.
//!
//! Client → server: the raw player name (handshake), then command batches of
//! the form `(<subset of FRLT>)\n`. Server → client: `<id>\n<size>\n`
//! (handshake), then one JSON entity per line every tick.

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 11000;

/// One client-requested action. Resolved in declaration order each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Fire,
    RotateRight,
    RotateLeft,
    Thrust,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Fire,
        Action::RotateRight,
        Action::RotateLeft,
        Action::Thrust,
    ];

    pub fn letter(self) -> char {
        match self {
            Action::Fire => 'F',
            Action::RotateRight => 'R',
            Action::RotateLeft => 'L',
            Action::Thrust => 'T',
        }
    }

    pub fn from_letter(letter: char) -> Option<Action> {
        match letter {
            'F' => Some(Action::Fire),
            'R' => Some(Action::RotateRight),
            'L' => Some(Action::RotateLeft),
            'T' => Some(Action::Thrust),
            _ => None,
        }
    }
}

/// The deduplicated set of actions one session requested within one tick.
///
/// However many copies of a letter arrived in the session's buffered batch,
/// each action is applied at most once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandSet {
    pub fire: bool,
    pub rotate_right: bool,
    pub rotate_left: bool,
    pub thrust: bool,
}

impl CommandSet {
    /// Builds the set from accumulated command letters. Unknown characters
    /// are ignored.
    pub fn from_letters(letters: &str) -> CommandSet {
        let mut set = CommandSet::default();
        for letter in letters.chars() {
            match Action::from_letter(letter) {
                Some(Action::Fire) => set.fire = true,
                Some(Action::RotateRight) => set.rotate_right = true,
                Some(Action::RotateLeft) => set.rotate_left = true,
                Some(Action::Thrust) => set.thrust = true,
                None => {}
            }
        }
        set
    }

    pub fn contains(&self, action: Action) -> bool {
        match action {
            Action::Fire => self.fire,
            Action::RotateRight => self.rotate_right,
            Action::RotateLeft => self.rotate_left,
            Action::Thrust => self.thrust,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.fire || self.rotate_right || self.rotate_left || self.thrust)
    }

    /// Formats the set as a command line ready to send: `(FR)\n`.
    pub fn to_wire(&self) -> String {
        let mut line = String::from("(");
        for action in Action::ALL {
            if self.contains(action) {
                line.push(action.letter());
            }
        }
        line.push_str(")\n");
        line
    }
}

/// Splits off every complete newline-terminated message from the buffer,
/// retaining any trailing partial fragment for the next receive.
///
/// The returned messages have their trailing newline stripped. A receive may
/// deliver partial, combined, or multiple messages; an incomplete fragment is
/// never an error.
pub fn extract_messages(buffer: &mut String) -> Vec<String> {
    let complete_len = match buffer.rfind('\n') {
        Some(idx) => idx + 1,
        None => return Vec::new(),
    };
    let rest = buffer.split_off(complete_len);
    let complete = std::mem::replace(buffer, rest);
    complete.lines().map(|line| line.to_string()).collect()
}

/// Returns the command letters of a well-formed `(<letters>)` message, or
/// `None` for anything else. Malformed lines are simply skipped by callers.
pub fn command_letters(message: &str) -> Option<&str> {
    let inner = message.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner)
}

/// Takes the player name out of the handshake buffer.
///
/// The first inbound data is the raw name; a delimiting newline is optional.
/// If one is present, anything after it is left in the buffer as the start
/// of command data.
pub fn take_player_name(buffer: &mut String) -> String {
    match buffer.find('\n') {
        Some(idx) => {
            let rest = buffer.split_off(idx + 1);
            let mut name = std::mem::replace(buffer, rest);
            name.truncate(idx);
            name
        }
        None => std::mem::take(buffer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_complete_messages() {
        let mut buffer = String::from("(F)\n(RT)\n");
        let messages = extract_messages(&mut buffer);
        assert_eq!(messages, vec!["(F)", "(RT)"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_fragment_retained() {
        let mut buffer = String::from("(F)\n(R");
        let messages = extract_messages(&mut buffer);
        assert_eq!(messages, vec!["(F)"]);
        assert_eq!(buffer, "(R");

        // completing the fragment later yields the message
        buffer.push_str("T)\n");
        let messages = extract_messages(&mut buffer);
        assert_eq!(messages, vec!["(RT)"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_no_newline_no_messages() {
        let mut buffer = String::from("(FR");
        assert!(extract_messages(&mut buffer).is_empty());
        assert_eq!(buffer, "(FR");
    }

    #[test]
    fn test_command_letters() {
        assert_eq!(command_letters("(FRLT)"), Some("FRLT"));
        assert_eq!(command_letters("()"), Some(""));
        assert_eq!(command_letters("F)"), None);
        assert_eq!(command_letters("(F"), None);
        assert_eq!(command_letters("hello"), None);
    }

    #[test]
    fn test_command_set_dedup() {
        let set = CommandSet::from_letters("FFFRF");
        assert!(set.fire);
        assert!(set.rotate_right);
        assert!(!set.rotate_left);
        assert!(!set.thrust);
    }

    #[test]
    fn test_command_set_ignores_unknown_letters() {
        let set = CommandSet::from_letters("XyzT");
        assert!(set.thrust);
        assert!(!set.fire);
    }

    #[test]
    fn test_command_set_wire_format() {
        let set = CommandSet {
            fire: true,
            thrust: true,
            ..CommandSet::default()
        };
        assert_eq!(set.to_wire(), "(FT)\n");
        assert_eq!(CommandSet::default().to_wire(), "()\n");
    }

    #[test]
    fn test_take_player_name_without_delimiter() {
        let mut buffer = String::from("Icarus");
        assert_eq!(take_player_name(&mut buffer), "Icarus");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_player_name_keeps_trailing_data() {
        let mut buffer = String::from("Icarus\n(F)\n");
        assert_eq!(take_player_name(&mut buffer), "Icarus");
        assert_eq!(buffer, "(F)\n");
    }
}
