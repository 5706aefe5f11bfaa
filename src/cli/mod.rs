// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `compare` : baseline + full / classifier-only / LoRA runs
//                  at each dataset fraction, then a report
//   2. `verify`  : reload an exported variant and score it again
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, CompareArgs, VerifyArgs};

use crate::application::{
    compare_use_case::{CompareUseCase, ComparisonReport},
    experiment::ExperimentConfig,
    verify_use_case::VerifyUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "peft-compare",
    version,
    about = "Compare full, classifier-only and LoRA fine-tuning of a 1-5 star review classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Only this layer prints.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Compare(args) => run_compare(args),
            Commands::Verify(args)  => run_verify(args),
        }
    }
}

fn run_compare(args: CompareArgs) -> Result<()> {
    tracing::info!("Starting comparison on reviews in: {}", args.data_dir);

    let config = ExperimentConfig::try_from(args)?;
    let report = CompareUseCase::new(config).execute()?;
    print_report(&report);
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let report = VerifyUseCase::new(args.into()).execute()?;

    println!("\nVariant:   {}", report.plan.strategy);
    println!("Directory: {}", report.model_dir.display());
    println!(
        "Trainable: {} / {} parameters",
        report.plan.trainable_params, report.plan.total_params
    );
    println!(
        "Metrics on {} reviews: accuracy={:.4} precision={:.4} cross_entropy={:.4}",
        report.eval_examples,
        report.metrics.accuracy,
        report.metrics.precision,
        report.metrics.cross_entropy,
    );
    Ok(())
}

fn print_report(report: &ComparisonReport) {
    println!(
        "\n{:>9}  {:<16} {:>9} {:>9} {:>9} {:>12}",
        "fraction", "variant", "pre_acc", "post_acc", "post_ce", "trainable"
    );
    for row in &report.rows {
        let post_acc = row.post.map_or("-".to_string(), |m| format!("{:.4}", m.accuracy));
        let post_ce  = row.post.map_or("-".to_string(), |m| format!("{:.4}", m.cross_entropy));
        let params   = row.trainable_params.map_or("-".to_string(), |n| n.to_string());
        println!(
            "{:>8.2}%  {:<16} {:>9.4} {:>9} {:>9} {:>12}",
            row.fraction * 100.0,
            row.variant,
            row.pre.accuracy,
            post_acc,
            post_ce,
            params,
        );
    }

    match (&report.best, &report.reloaded) {
        (Some(best), Some(reloaded)) => {
            println!(
                "\nBest: {} at {:.2}% (accuracy={:.4}), exported to '{}'",
                best.variant,
                best.fraction * 100.0,
                best.accuracy,
                best.model_dir.display()
            );
            println!("Reloaded from disk: accuracy={:.4} (matches)", reloaded.accuracy);
        }
        _ => println!("\nNo trained variant to select."),
    }
}
