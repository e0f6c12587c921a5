//! Adapter interfaces for external systems.
//!
//! The text-generation capability is opaque, possibly slow, and not
//! guaranteed deterministic, so it sits behind a narrow prompt-in,
//! text-out trait. The orchestration logic is tested against a scripted
//! stand-in that never touches the network.

pub mod inference;

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

pub use inference::InferenceClient;

/// Trait for text-generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Deterministic stand-in that replays scripted responses in order.
///
/// Used by tests to drive the planner and orchestrator without a model.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.responses
            .lock()
            .expect("scripted responses lock")
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted response available"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_generator_replays_in_order() {
        let generator = ScriptedGenerator::new(vec!["first".to_string(), "second".to_string()]);

        assert_eq!(generator.generate("p1").await.unwrap(), "first");
        assert_eq!(generator.generate("p2").await.unwrap(), "second");
        assert!(generator.generate("p3").await.is_err());
    }
}
