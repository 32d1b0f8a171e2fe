//! Slash-command parsing for the line-oriented input loop.
//!
//! Any non-slash input line is treated as an outgoing message for the active
//! session; the parser only classifies lines starting with `/`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Up,
    Down,
    Open,
    Close,
    Refresh,
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let command = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_string();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/up" => SlashCommand::Up,
        "/down" => SlashCommand::Down,
        "/open" => SlashCommand::Open,
        "/close" => SlashCommand::Close,
        "/refresh" => SlashCommand::Refresh,
        "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}
