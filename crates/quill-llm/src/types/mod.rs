pub mod message;

pub use message::{ChatMessage, ModelMessage, Role, Sender};
