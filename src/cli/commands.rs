// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `compare` and `verify`,
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// List flags take comma-separated values:
//   --fractions 0.01,0.1   --target-modules query,value
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{experiment::ExperimentConfig, verify_use_case::VerifyRequest};
use crate::domain::{
    error::PeftError,
    strategy::{AdapterConfig, TargetModule},
};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare full, classifier-only and LoRA fine-tuning
    Compare(CompareArgs),

    /// Reload an exported variant and evaluate it again
    Verify(VerifyArgs),
}

/// All arguments for the `compare` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Directory holding train.jsonl (and optionally test.jsonl)
    #[arg(long, default_value = "data/reviews")]
    pub data_dir: String,

    /// Directory for the tokenizer, exported models and reports
    #[arg(long, default_value = "storage")]
    pub storage_dir: String,

    /// Shares of the training split to run the comparison at
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.01, 0.1])]
    pub fractions: Vec<f64>,

    /// Share of the evaluation split to score on
    #[arg(long, default_value_t = 1.0)]
    pub eval_fraction: f64,

    /// Tokens per review, including [CLS]; longer reviews are truncated
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Number of reviews processed together in one forward pass
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// AdamW learning rate
    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    /// AdamW weight decay
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Hidden dimension of the transformer
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Number of attention heads; d_model must be divisible by it
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    /// Number of stacked encoder layers
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    /// Dropout probability during training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Size of the token embedding table
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Inner dimension of each LoRA update
    #[arg(long, default_value_t = 8)]
    pub lora_rank: usize,

    /// LoRA scale numerator (update is scaled by alpha / rank)
    #[arg(long, default_value_t = 16.0)]
    pub lora_alpha: f64,

    /// Projections that get LoRA adapters:
    /// query, key, value, output, ffn_in, ffn_out
    #[arg(long, value_delimiter = ',', default_value = "query,value")]
    pub target_modules: Vec<String>,

    /// Exported model directory to start from instead of a fresh model
    #[arg(long)]
    pub base_model: Option<String>,

    /// Seed for shuffling and the holdout split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI CompareArgs into the application-layer ExperimentConfig.
/// Fails on unknown target module names.
impl TryFrom<CompareArgs> for ExperimentConfig {
    type Error = PeftError;

    fn try_from(a: CompareArgs) -> Result<Self, Self::Error> {
        let target_modules = a
            .target_modules
            .iter()
            .map(|name| name.parse::<TargetModule>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExperimentConfig {
            data_dir:      a.data_dir,
            storage_dir:   a.storage_dir,
            fractions:     a.fractions,
            eval_fraction: a.eval_fraction,
            max_seq_len:   a.max_seq_len,
            batch_size:    a.batch_size,
            lr:            a.lr,
            weight_decay:  a.weight_decay,
            d_model:       a.d_model,
            num_heads:     a.num_heads,
            num_layers:    a.num_layers,
            d_ff:          a.d_ff,
            dropout:       a.dropout,
            vocab_size:    a.vocab_size,
            adapter:       AdapterConfig::new(target_modules, a.lora_rank, a.lora_alpha),
            base_model:    a.base_model,
            seed:          a.seed,
        })
    }
}

/// All arguments for the `verify` command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Exported variant directory; defaults to the best variant of the last comparison
    #[arg(long)]
    pub model_dir: Option<String>,

    /// Storage directory used by `compare`
    #[arg(long, default_value = "storage")]
    pub storage_dir: String,

    /// Override the dataset directory recorded by `compare`
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override the evaluation share recorded by `compare`
    #[arg(long)]
    pub eval_fraction: Option<f64>,
}

impl From<VerifyArgs> for VerifyRequest {
    fn from(a: VerifyArgs) -> Self {
        VerifyRequest {
            storage_dir:   a.storage_dir,
            model_dir:     a.model_dir,
            data_dir:      a.data_dir,
            eval_fraction: a.eval_fraction,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn compare_args(argv: &[&str]) -> CompareArgs {
        let mut full = vec!["peft-compare", "compare"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Compare(args) => args,
            other => panic!("expected compare, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_match_experiment_defaults() {
        let cfg = ExperimentConfig::try_from(compare_args(&[])).unwrap();
        assert_eq!(cfg, ExperimentConfig::default());
    }

    #[test]
    fn test_lists_and_adapter_flags() {
        let cfg = ExperimentConfig::try_from(compare_args(&[
            "--fractions", "0.05,0.5",
            "--target-modules", "query,ffn_out",
            "--lora-rank", "4",
            "--lora-alpha", "8",
        ]))
        .unwrap();

        assert_eq!(cfg.fractions, vec![0.05, 0.5]);
        assert_eq!(cfg.adapter.target_modules, vec![TargetModule::Query, TargetModule::FfnOut]);
        assert_eq!(cfg.adapter.scaling(), 2.0);
    }

    #[test]
    fn test_unknown_target_module_rejected() {
        let result = ExperimentConfig::try_from(compare_args(&["--target-modules", "query,gate"]));
        assert!(matches!(result, Err(PeftError::InvalidStrategy(_))));
    }

    #[test]
    fn test_verify_args() {
        let cli = Cli::parse_from(["peft-compare", "verify", "--model-dir", "out/lora/exported_model"]);
        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        let req = VerifyRequest::from(args);
        assert_eq!(req.model_dir.as_deref(), Some("out/lora/exported_model"));
        assert_eq!(req.storage_dir, "storage");
    }
}
