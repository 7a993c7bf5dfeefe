use crate::types::{ChatMessage, ModelMessage};

/// System prompt used when the caller does not supply one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant inside a note-taking app. \
Answer clearly and concisely, and format your replies in Markdown when it helps readability.";

/// Build the message list for one completion request.
///
/// The result always starts with exactly one system message, followed by the
/// history in order, followed by `new_message` as a user turn.
pub fn assemble_messages(
    history: &[ChatMessage],
    new_message: &ChatMessage,
    system_prompt: Option<&str>,
) -> Vec<ModelMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ModelMessage::system(
        system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT),
    ));
    messages.extend(history.iter().map(ModelMessage::from));
    messages.push(ModelMessage::user(new_message.text.clone()));
    messages
}
