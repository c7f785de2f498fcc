use std::path::PathBuf;
use tanjung_core::session::Chat;
use thiserror::Error;

/// A chat referenced by id or by its 1-based position in `/list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTarget(pub String);

impl ChatTarget {
    /// An exact id match wins over a list position, so numeric ids stay
    /// reachable.
    pub fn resolve(&self, chats: &[Chat]) -> Option<String> {
        if let Some(chat) = chats.iter().find(|chat| chat.id == self.0) {
            return Some(chat.id.clone());
        }
        match self.0.parse::<usize>() {
            Ok(n) if n >= 1 => chats.get(n - 1).map(|chat| chat.id.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    New,
    List,
    Show,
    Switch(ChatTarget),
    Delete(ChatTarget),
    Attach(PathBuf),
    Detach(usize),
    Copy(usize),
    Presets,
    Preset(usize),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Prompt(String),
    Command(SlashCommand),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("expected a number starting at 1, got '{0}'")]
    BadIndex(String),
}

fn index(arg: &str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CommandError::BadIndex(arg.to_string())),
    }
}

impl Input {
    pub fn parse(line: &str) -> Result<Input, CommandError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Input::Empty);
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Input::Prompt(line.trim_end().to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match (name, arg) {
            ("new" | "n", _) => SlashCommand::New,
            ("list" | "ls", _) => SlashCommand::List,
            ("show", _) => SlashCommand::Show,
            ("switch" | "s", "") => return Err(CommandError::MissingArgument("switch")),
            ("switch" | "s", arg) => SlashCommand::Switch(ChatTarget(arg.to_string())),
            ("delete" | "rm", "") => return Err(CommandError::MissingArgument("delete")),
            ("delete" | "rm", arg) => SlashCommand::Delete(ChatTarget(arg.to_string())),
            ("attach" | "a", "") => return Err(CommandError::MissingArgument("attach")),
            ("attach" | "a", arg) => SlashCommand::Attach(PathBuf::from(arg)),
            ("detach", arg) => SlashCommand::Detach(index(arg)?),
            ("copy" | "c", arg) => SlashCommand::Copy(index(arg)?),
            ("presets", _) => SlashCommand::Presets,
            ("preset" | "p", arg) => SlashCommand::Preset(index(arg)?),
            ("help" | "h", _) => SlashCommand::Help,
            ("quit" | "exit" | "q", _) => SlashCommand::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Input::Command(command))
    }
}

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) - Start a new chat.
- /list (/ls) - List chats; the active one is marked with *.
- /show - Print the active chat.
- /switch (/s) [ID|N] - Switch to a chat by id or list position.
- /delete (/rm) [ID|N] - Delete a chat.
- /attach (/a) [PATH] - Attach an image to the next message.
- /detach [N] - Remove a pending attachment.
- /copy (/c) [N] - Copy message N of the active chat to the clipboard.
- /presets - Show the preset questions.
- /preset (/p) [N] - Send preset question N.
- /quit /exit (/q) - Exit.
- /help (/h) - Show this help.

Anything else is sent as a prompt.
        "#;

    text.trim().to_string()
}
