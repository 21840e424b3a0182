//! Concrete reasoning-engine backends.

pub mod openai;

pub use openai::OpenAiProvider;
