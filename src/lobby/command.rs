//! Chat commands understood by the bot and their aliases

use serde::{Deserialize, Serialize};

/// Logical command behind one or more chat aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Create,
    Join,
    Leave,
    Close,
    Status,
    Help,
    Ping,
    CoinFlip,
}

/// Alias table, matched literally against the whole message
const ALIASES: &[(&str, Command)] = &[
    ("!createlobby", Command::Create),
    ("!openlobby", Command::Create),
    ("!open", Command::Create),
    ("!o", Command::Create),
    ("!joinlobby", Command::Join),
    ("!join", Command::Join),
    ("!ready", Command::Join),
    ("!j", Command::Join),
    ("!leavelobby", Command::Leave),
    ("!leave", Command::Leave),
    ("!out", Command::Leave),
    ("!gottago", Command::Leave),
    ("!l", Command::Leave),
    ("!closelobby", Command::Close),
    ("!close", Command::Close),
    ("!c", Command::Close),
    ("!status", Command::Status),
    ("!lobby", Command::Status),
    ("!+", Command::Status),
    ("!help", Command::Help),
    ("!?", Command::Help),
    ("!test", Command::Ping),
    ("!coinflip", Command::CoinFlip),
];

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Create,
        Command::Join,
        Command::Leave,
        Command::Close,
        Command::Status,
        Command::Help,
        Command::Ping,
        Command::CoinFlip,
    ];

    /// Look up the command for an exact alias; anything else is not a command
    pub fn parse(input: &str) -> Option<Command> {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == input)
            .map(|(_, command)| *command)
    }

    /// Every alias of this command, primary alias first
    pub fn aliases(self) -> Vec<&'static str> {
        let mut aliases: Vec<&'static str> = ALIASES
            .iter()
            .filter(|(_, command)| *command == self)
            .map(|(alias, _)| *alias)
            .collect();
        let primary = self.primary_alias();
        aliases.sort_by_key(|alias| *alias != primary);
        aliases
    }

    /// Alias shown in help text and hints
    pub fn primary_alias(self) -> &'static str {
        match self {
            Command::Create => "!open",
            Command::Join => "!join",
            Command::Leave => "!leave",
            Command::Close => "!close",
            Command::Status => "!status",
            Command::Help => "!help",
            Command::Ping => "!test",
            Command::CoinFlip => "!coinflip",
        }
    }

    /// Label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Join => "join",
            Command::Leave => "leave",
            Command::Close => "close",
            Command::Status => "status",
            Command::Help => "help",
            Command::Ping => "ping",
            Command::CoinFlip => "coinflip",
        }
    }

    /// Whether this command reads or changes lobby state
    pub fn touches_lobby(self) -> bool {
        !matches!(self, Command::Help | Command::Ping | Command::CoinFlip)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Command::parse("!o"), Some(Command::Create));
        assert_eq!(Command::parse("!ready"), Some(Command::Join));
        assert_eq!(Command::parse("!gottago"), Some(Command::Leave));
        assert_eq!(Command::parse("!c"), Some(Command::Close));
        assert_eq!(Command::parse("!+"), Some(Command::Status));
        assert_eq!(Command::parse("!?"), Some(Command::Help));
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Command::parse("!JOIN"), None);
        assert_eq!(Command::parse("!join now"), None);
        assert_eq!(Command::parse("join"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_every_command_has_aliases() {
        for command in Command::ALL {
            let aliases = command.aliases();
            assert!(!aliases.is_empty() && aliases.len() <= 5, "{command}");
            assert_eq!(aliases[0], command.primary_alias());
            for alias in aliases {
                assert_eq!(Command::parse(alias), Some(command));
            }
        }
    }

    #[test]
    fn test_close_aliases() {
        assert_eq!(Command::Close.aliases(), vec!["!close", "!closelobby", "!c"]);
    }
}
