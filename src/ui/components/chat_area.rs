use crate::common::{DisplayStatus, Message};

pub fn render_message(message: &Message) -> String {
    let time = message.timestamp.format("%H:%M");
    let author = if message.is_sender {
        "You"
    } else {
        message.sender_name.as_str()
    };
    format!(
        "[{time}] #{} {author}: {} {}",
        message.id,
        message.content,
        message.status().icon()
    )
}

pub fn render_pending(content: &str) -> String {
    format!("[--:--] You: {content} {}", DisplayStatus::Sending.icon())
}

pub fn render_status(message: &Message) -> String {
    format!("#{} is now {}", message.id, message.status())
}
