use crate::common::UserId;

/// What a line typed at the console asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Send(String),
    /// Re-send the text of the last failed send.
    Retry,
    Open(UserId),
    Users,
    Hide,
    Show,
    Blur,
    Quit,
    Invalid(String),
}

pub fn parse(line: &str) -> Option<InputAction> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(InputAction::Send(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let action = match (parts.next(), parts.next()) {
        (Some("users"), None) => InputAction::Users,
        (Some("retry"), None) => InputAction::Retry,
        (Some("open"), Some(id)) => match id.parse::<u64>() {
            Ok(id) => InputAction::Open(UserId(id)),
            Err(_) => InputAction::Invalid(format!("not a user id: {id}")),
        },
        (Some("hide"), None) => InputAction::Hide,
        (Some("show"), None) => InputAction::Show,
        (Some("blur"), None) => InputAction::Blur,
        (Some("quit"), None) => InputAction::Quit,
        _ => InputAction::Invalid(format!("unknown command: /{command}")),
    };
    Some(action)
}
