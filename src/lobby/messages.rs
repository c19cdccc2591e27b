//! Chat text the bot posts

use crate::lobby::command::Command;

/// Reaction used to acknowledge a successful action
pub const ACK_EMOJI: &str = "\u{1F44D}";

pub const ALREADY_OWNER: &str = "You already have an open lobby.";
pub const LOBBY_EMPTY: &str = "The lobby is now empty. Closing.";
pub const PING_REPLY: &str = "Yes hello I am here";

pub fn no_lobby_open() -> String {
    format!(
        "There is no lobby open. Type {} to start one.",
        Command::Create.primary_alias()
    )
}

pub fn lobby_started(requester: &str) -> String {
    format!(
        "{} is starting a lobby. Type {} to ready up.",
        requester,
        Command::Join.primary_alias()
    )
}

pub fn lobby_already_open(owner: &str) -> String {
    format!(
        "{} has a lobby open. Type {} to ready up.",
        owner,
        Command::Join.primary_alias()
    )
}

pub fn member_left(name: &str) -> String {
    format!("{} left the lobby.", name)
}

pub fn status(roster: &str, member_count: usize, players_to_begin: usize) -> String {
    let verb = if member_count == 1 { "is" } else { "are" };
    let still_required = players_to_begin.saturating_sub(member_count);
    format!(
        "{} {} ready to go. Need {} more.",
        roster, verb, still_required
    )
}

pub fn ready_to_begin(players_to_begin: usize) -> String {
    format!(
        "{} players are ready to go! One person needs to start the game lobby and post the game name here. Closing this lobby.",
        players_to_begin
    )
}

pub fn coin_flip(heads: bool) -> &'static str {
    if heads {
        "Heads"
    } else {
        "Tails"
    }
}

fn command_line(command: Command, summary: &str) -> String {
    let others: Vec<&str> = command.aliases().into_iter().skip(1).collect();
    if others.is_empty() {
        format!("__**{}**__: {}", command.primary_alias(), summary)
    } else {
        format!(
            "__**{}**__: {} Aliases: **{}**",
            command.primary_alias(),
            summary,
            others.join(", ")
        )
    }
}

/// Help text sent to a user by direct message
pub fn help(players_to_begin: usize) -> String {
    let close_note = "Closes the lobby. Only executable by the owner of the current lobby or an authorized user.";
    [
        format!(
            "I keep a lobby for people who want to play together but would rather get on with their day until enough players are around. Create or join a lobby, and once {} players are ready I will ping all of them to let them know it's time.",
            players_to_begin
        ),
        "Commands:".to_string(),
        command_line(
            Command::Create,
            "If no lobby is currently open, starts a lobby where players can sign up to be notified once enough players are ready to go.",
        ),
        command_line(
            Command::Join,
            &format!(
                "Joins the lobby. You will be pinged once the lobby reaches {} players, and you are expected to show up within a reasonable amount of time.",
                players_to_begin
            ),
        ),
        command_line(
            Command::Leave,
            "Leaves the lobby. Your name will not show up in the list of players ready to go, and you will not be pinged.",
        ),
        command_line(Command::Close, close_note),
        command_line(Command::Status, "Outputs the current lobby situation."),
        command_line(Command::Help, "Receive this message."),
    ]
    .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_grammar() {
        assert_eq!(status("A", 1, 8), "A is ready to go. Need 7 more.");
        assert_eq!(status("A and B", 2, 8), "A and B are ready to go. Need 6 more.");
        assert_eq!(status("A and B", 2, 2), "A and B are ready to go. Need 0 more.");
    }

    #[test]
    fn test_help_lists_commands_and_quorum() {
        let text = help(6);
        assert!(text.contains("6 players"));
        assert!(text.contains("__**!open**__"));
        assert!(text.contains("Aliases: **!createlobby, !openlobby, !o**"));
        assert!(text.contains("__**!help**__: Receive this message. Aliases: **!?**"));
    }
}
