// ============================================================
// Layer 5: Variant Preparation
// ============================================================
// Turns the stock classifier into one of the compared variants:
//
//   full            → unchanged, every parameter trainable
//   classifier_only → backbone frozen, head trainable
//   lora            → backbone frozen, adapters attached to the
//                     target projections, adapters + head trainable
//
// The same function rebuilds the structure when an exported variant
// is reloaded, so the saved record always fits the module tree.

use burn::prelude::*;

use crate::domain::{
    error::PeftError,
    strategy::{FineTuneStrategy, VariantPlan},
};
use crate::ml::model::ReviewClassifier;

pub fn prepare<B: Backend>(
    model:    ReviewClassifier<B>,
    strategy: &FineTuneStrategy,
    device:   &B::Device,
) -> Result<(ReviewClassifier<B>, VariantPlan), PeftError> {
    let (model, trainable_params) = match strategy {
        FineTuneStrategy::FullyTrainable => {
            let trainable = model.num_params();
            (model, trainable)
        }
        FineTuneStrategy::ClassifierOnly => {
            let model = model.freeze_backbone();
            let trainable = model.head_params();
            (model, trainable)
        }
        FineTuneStrategy::AdapterAugmented(adapter) => {
            adapter.validate()?;
            let model = model.freeze_backbone().with_adapters(adapter, device);
            let trainable = model.head_params() + model.adapter_params();
            (model, trainable)
        }
    };

    let plan = VariantPlan {
        strategy: strategy.clone(),
        trainable_params,
        total_params: model.num_params(),
    };
    tracing::info!(
        "Prepared variant {}: {}/{} trainable parameters ({:.2}%)",
        strategy,
        plan.trainable_params,
        plan.total_params,
        plan.trainable_fraction() * 100.0,
    );

    Ok((model, plan))
}
