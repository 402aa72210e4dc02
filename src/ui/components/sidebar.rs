use crate::common::User;

pub fn render(users: &[User]) -> String {
    if users.is_empty() {
        return "No users yet".to_string();
    }

    users
        .iter()
        .map(|user| {
            let dot = if user.is_online { "●" } else { "○" };
            let mut line = format!("{dot} [{}] {}", user.id, user.display_name);
            if user.unread_count > 0 {
                line.push_str(&format!(" ({} unread)", user.unread_count));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
