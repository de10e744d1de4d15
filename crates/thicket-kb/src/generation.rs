//! Cost accounting for text generation

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GenerationConfig;
use crate::data::CoreError;
use crate::traits::{Completion, TextGenerator};

/// Cost per token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRates {
    pub prompt: f64,
    pub completion: f64,
}

impl TokenRates {
    pub fn new(prompt: f64, completion: f64) -> Self {
        Self { prompt, completion }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.prompt_rate, config.completion_rate)
    }

    pub fn cost(&self, completion: &Completion) -> f64 {
        completion.prompt_tokens as f64 * self.prompt + completion.completion_tokens as f64 * self.completion
    }
}

/// Counters accrued by a [`MeteredGenerator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationUsage {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: f64,
}

/// Wraps a generator and accrues token counts and cost of successful calls.
pub struct MeteredGenerator<G> {
    inner: G,
    rates: TokenRates,
    usage: Mutex<GenerationUsage>,
}

impl<G: TextGenerator> MeteredGenerator<G> {
    pub fn new(inner: G, rates: TokenRates) -> Self {
        Self {
            inner,
            rates,
            usage: Mutex::new(GenerationUsage::default()),
        }
    }

    pub fn usage(&self) -> GenerationUsage {
        *self.usage.lock()
    }

    /// Returns the usage accrued so far and starts over from zero.
    pub fn reset(&self) -> GenerationUsage {
        std::mem::take(&mut *self.usage.lock())
    }

    pub fn rates(&self) -> TokenRates {
        self.rates
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G: TextGenerator> TextGenerator for MeteredGenerator<G> {
    fn complete(&self, prompt: &str) -> Result<Completion, CoreError> {
        let completion = self.inner.complete(prompt)?;
        let cost = self.rates.cost(&completion);

        let mut usage = self.usage.lock();
        usage.calls += 1;
        usage.prompt_tokens += completion.prompt_tokens;
        usage.completion_tokens += completion.completion_tokens;
        usage.cost += cost;
        debug!(
            prompt_tokens = completion.prompt_tokens,
            completion_tokens = completion.completion_tokens,
            cost,
            total_cost = usage.cost,
            "metered completion"
        );
        Ok(completion)
    }
}
