// ============================================================
// Layer 3: Fine-Tuning Strategies
// ============================================================
// Which parameters of the pretrained classifier get updated:
//
//   FullyTrainable   → every weight in the model
//   ClassifierOnly   → only the final classification head
//   AdapterAugmented → low-rank adapters injected next to the chosen
//                      projections, plus the classification head
//
// The strategy is decided before a run starts and is recorded in a
// VariantPlan, so "what was trained" can be read back from the
// exported model directory afterwards.
//
// Reference: Hu et al. (2021) LoRA: Low-Rank Adaptation of LLMs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::PeftError;

// ─── TargetModule ─────────────────────────────────────────────────────────────
/// A linear projection inside each encoder block that can carry an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetModule {
    Query,
    Key,
    Value,
    Output,
    FfnIn,
    FfnOut,
}

impl TargetModule {
    pub const ALL: [TargetModule; 6] = [
        TargetModule::Query,
        TargetModule::Key,
        TargetModule::Value,
        TargetModule::Output,
        TargetModule::FfnIn,
        TargetModule::FfnOut,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TargetModule::Query  => "query",
            TargetModule::Key    => "key",
            TargetModule::Value  => "value",
            TargetModule::Output => "output",
            TargetModule::FfnIn  => "ffn_in",
            TargetModule::FfnOut => "ffn_out",
        }
    }
}

impl fmt::Display for TargetModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetModule {
    type Err = PeftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TargetModule::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                PeftError::InvalidStrategy(format!(
                    "unknown target module '{s}' (expected one of: query, key, value, output, ffn_in, ffn_out)"
                ))
            })
    }
}

// ─── AdapterConfig ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Projections that receive an adapter, in every encoder block
    pub target_modules: Vec<TargetModule>,

    /// Inner dimension of the low-rank update
    pub rank: usize,

    /// Scale numerator: the update is multiplied by alpha / rank
    pub alpha: f64,
}

impl AdapterConfig {
    pub fn new(target_modules: Vec<TargetModule>, rank: usize, alpha: f64) -> Self {
        Self { target_modules, rank, alpha }
    }

    pub fn scaling(&self) -> f64 {
        self.alpha / self.rank as f64
    }

    pub fn targets(&self, module: TargetModule) -> bool {
        self.target_modules.contains(&module)
    }

    /// Reject configurations that cannot produce an adapter.
    pub fn validate(&self) -> Result<(), PeftError> {
        if self.rank == 0 {
            return Err(PeftError::InvalidStrategy("adapter rank must be at least 1".into()));
        }
        if self.target_modules.is_empty() {
            return Err(PeftError::InvalidStrategy(
                "adapter needs at least one target module".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            target_modules: vec![TargetModule::Query, TargetModule::Value],
            rank:           8,
            alpha:          16.0,
        }
    }
}

// ─── FineTuneStrategy ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FineTuneStrategy {
    FullyTrainable,
    ClassifierOnly,
    AdapterAugmented(AdapterConfig),
}

impl FineTuneStrategy {
    /// Short name used for directories and report rows.
    pub fn name(&self) -> &'static str {
        match self {
            FineTuneStrategy::FullyTrainable      => "full",
            FineTuneStrategy::ClassifierOnly      => "classifier_only",
            FineTuneStrategy::AdapterAugmented(_) => "lora",
        }
    }

    /// The three strategies compared by an experiment, in run order.
    pub fn comparison_set(adapter: AdapterConfig) -> Vec<FineTuneStrategy> {
        vec![
            FineTuneStrategy::FullyTrainable,
            FineTuneStrategy::ClassifierOnly,
            FineTuneStrategy::AdapterAugmented(adapter),
        ]
    }
}

impl fmt::Display for FineTuneStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FineTuneStrategy::AdapterAugmented(cfg) => {
                let targets: Vec<&str> = cfg.target_modules.iter().map(|m| m.name()).collect();
                write!(f, "lora(rank={}, alpha={}, targets={})", cfg.rank, cfg.alpha, targets.join("+"))
            }
            other => f.write_str(other.name()),
        }
    }
}

// ─── VariantPlan ──────────────────────────────────────────────────────────────
/// What a prepared model variant trains, recorded for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPlan {
    pub strategy:         FineTuneStrategy,
    pub trainable_params: usize,
    pub total_params:     usize,
}

impl VariantPlan {
    /// Share of parameters updated by training, in [0, 1].
    pub fn trainable_fraction(&self) -> f64 {
        if self.total_params == 0 {
            0.0
        } else {
            self.trainable_params as f64 / self.total_params as f64
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_modules() {
        assert_eq!("query".parse::<TargetModule>().unwrap(), TargetModule::Query);
        assert_eq!(" FFN_OUT ".parse::<TargetModule>().unwrap(), TargetModule::FfnOut);
        assert!(matches!(
            "attention".parse::<TargetModule>(),
            Err(PeftError::InvalidStrategy(_))
        ));
    }

    #[test]
    fn test_adapter_validation() {
        assert!(AdapterConfig::default().validate().is_ok());
        assert!(AdapterConfig::new(vec![TargetModule::Query], 0, 8.0).validate().is_err());
        assert!(AdapterConfig::new(Vec::new(), 4, 8.0).validate().is_err());
    }

    #[test]
    fn test_scaling() {
        let cfg = AdapterConfig::new(vec![TargetModule::Value], 4, 8.0);
        assert_eq!(cfg.scaling(), 2.0);
    }

    #[test]
    fn test_comparison_set_order() {
        let names: Vec<_> = FineTuneStrategy::comparison_set(AdapterConfig::default())
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["full", "classifier_only", "lora"]);
    }

    #[test]
    fn test_strategy_json_round_trip_keeps_adapter() {
        let s    = FineTuneStrategy::AdapterAugmented(AdapterConfig::default());
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"kind\":\"adapter_augmented\""));
        let back: FineTuneStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_trainable_fraction() {
        let plan = VariantPlan {
            strategy:         FineTuneStrategy::ClassifierOnly,
            trainable_params: 25,
            total_params:     100,
        };
        assert_eq!(plan.trainable_fraction(), 0.25);
    }
}
