//! Text-completion capability and the chat-completions client that backs it.
mod chat_completions;
mod types;

pub use chat_completions::{ChatCompletionsClient, ChatCompletionsConfig};
pub use types::{CompletionError, TextCompletion};
