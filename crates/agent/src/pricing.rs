use mentor_core::config::{PricingConfig, TokenPrice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    High,
    Low,
}

/// Two-tier per-token price table.
#[derive(Debug, Clone)]
pub struct PricingTable {
    high: TokenPrice,
    low: TokenPrice,
    high_tier_markers: Vec<String>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl PricingTable {
    pub fn from_config(cfg: &PricingConfig) -> Self {
        Self {
            high: cfg.high,
            low: cfg.low,
            high_tier_markers: cfg.high_tier_markers.clone(),
        }
    }

    pub fn tier(&self, model: &str) -> PriceTier {
        if self.high_tier_markers.iter().any(|m| !m.is_empty() && model.contains(m.as_str())) {
            PriceTier::High
        } else {
            PriceTier::Low
        }
    }

    pub fn cost(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let price = match self.tier(model) {
            PriceTier::High => self.high,
            PriceTier::Low => self.low,
        };
        prompt_tokens as f64 * price.input + completion_tokens as f64 * price.output
    }
}
