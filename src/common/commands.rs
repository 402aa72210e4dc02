use super::types::{RenderedMessage, Span, UserId, Visibility};

/// Requests from the view layer to the sync engine.
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Open (or re-open) the conversation with a peer.
    SelectPeer(UserId),
    /// A keystroke changed the message input; `text` is the full current value.
    InputChanged { text: String },
    InputBlurred,
    SendMessage { content: String },
    /// Scrolling or a render settled; the view reports what it drew and where.
    ViewportSettled {
        viewport: Span,
        rendered: Vec<RenderedMessage>,
    },
    VisibilityChanged(Visibility),
    /// Fetch the user list now instead of waiting for the next roster tick.
    RefreshRoster,
    /// The page is going away. Sends the offline beacon and stops the engine.
    Teardown,
}
