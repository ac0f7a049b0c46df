//! Markdown prompt templates rendered with minijinja.
//!
//! Templates are `*.md` files named after their file stem. Several directories
//! can be layered; later directories override templates of the same name.

mod prompt_library;

pub use prompt_library::{PromptLibrary, PromptRenderer};
