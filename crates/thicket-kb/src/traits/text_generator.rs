//! TextGenerator trait definition for generated attributes

use serde::{Deserialize, Serialize};

use crate::data::CoreError;

/// One completion returned by the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Represents the interface for the text-generation service.
pub trait TextGenerator: Send + Sync {
    /// Completes `prompt`.
    ///
    /// Contract: blocking request/response; callers wanting timeouts wrap the
    /// implementation.
    fn complete(&self, prompt: &str) -> Result<Completion, CoreError>;
}
