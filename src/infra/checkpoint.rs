// ============================================================
// Layer 6: Model Store
// ============================================================
// Saves and restores model variants using Burn's file recorders.
//
// What gets saved per exported variant:
//   1. model.mpk.gz  : all parameters (MessagePack + gzip)
//   2. variant.json  : model architecture + VariantPlan
//
// variant.json is what makes a reload self-contained: the
// architecture rebuilds the module tree, the plan says whether
// LoRA branches (and which) must be attached before the record
// is loaded. Loading fails if the record does not fit the tree.
//
// Parameters are stored at full precision so a reloaded model
// reproduces the in-memory model's metrics exactly.
//
// Layout:
//   <dir>/
//     model.mpk.gz
//     variant.json
//
// Nothing is created on disk until `export` is called.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{
    error::PeftError,
    strategy::{FineTuneStrategy, VariantPlan},
    traits::ModelExporter,
};
use crate::ml::{
    model::{ReviewClassifier, ReviewClassifierConfig},
    variant,
};

const MODEL_STEM: &str = "model";
const MODEL_FILE: &str = "model.mpk.gz";
const VARIANT_FILE: &str = "variant.json";

type StoreRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Everything needed to rebuild an exported variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantManifest {
    pub model: ReviewClassifierConfig,
    pub plan:  VariantPlan,
}

/// Exports one prepared variant. Holds the manifest that is
/// written next to the parameters.
pub struct ModelStore {
    manifest: VariantManifest,
}

impl ModelStore {
    pub fn new(model: ReviewClassifierConfig, plan: VariantPlan) -> Self {
        Self { manifest: VariantManifest { model, plan } }
    }

    /// Write the parameters and the manifest of `model` into `dir`.
    pub fn save<B: Backend>(&self, model: &ReviewClassifier<B>, dir: &Path) -> Result<(), PeftError> {
        fs::create_dir_all(dir).map_err(|e| PeftError::storage(dir, e))?;

        let stem = dir.join(MODEL_STEM);
        StoreRecorder::new()
            .record(model.clone().into_record(), stem.clone())
            .map_err(|e| PeftError::storage(&stem, e))?;

        let manifest_path = dir.join(VARIANT_FILE);
        let json = serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| PeftError::storage(&manifest_path, e))?;
        fs::write(&manifest_path, json).map_err(|e| PeftError::storage(&manifest_path, e))?;

        tracing::debug!("Saved {} variant to '{}'", self.manifest.plan.strategy.name(), dir.display());
        Ok(())
    }

    /// Rebuild an exported variant from `dir` alone.
    pub fn load<B: Backend>(
        dir:    &Path,
        device: &B::Device,
    ) -> Result<(ReviewClassifier<B>, VariantManifest), PeftError> {
        let manifest = Self::read_manifest(dir)?;
        let model    = Self::load_as(dir, &manifest, &manifest.plan.strategy, device)?;
        tracing::info!("Loaded {} variant from '{}'", manifest.plan.strategy.name(), dir.display());
        Ok((model, manifest))
    }

    /// Load the parameters in `dir` into the structure `strategy` builds.
    fn load_as<B: Backend>(
        dir:      &Path,
        manifest: &VariantManifest,
        strategy: &FineTuneStrategy,
        device:   &B::Device,
    ) -> Result<ReviewClassifier<B>, PeftError> {
        let stock = manifest.model.init::<B>(device);
        let (model, plan) = variant::prepare(stock, strategy, device)?;
        if plan.total_params != manifest.plan.total_params {
            return Err(PeftError::storage(
                dir,
                format!(
                    "rebuilt model has {} parameters, manifest says {}",
                    plan.total_params, manifest.plan.total_params
                ),
            ));
        }

        let file = Self::model_path(dir);
        if !file.is_file() {
            return Err(PeftError::storage(&file, "no exported parameters"));
        }

        let stem   = dir.join(MODEL_STEM);
        let record = StoreRecorder::new()
            .load(stem.clone(), device)
            .map_err(|e| PeftError::storage(&stem, e))?;

        Ok(model.load_record(record))
    }

    pub fn read_manifest(dir: &Path) -> Result<VariantManifest, PeftError> {
        let path = dir.join(VARIANT_FILE);
        let json = fs::read_to_string(&path).map_err(|e| PeftError::storage(&path, e))?;
        serde_json::from_str(&json).map_err(|e| PeftError::storage(&path, e))
    }

    /// Load a plain (adapter-free) model to start an experiment from.
    /// Every parameter comes back trainable, whatever variant saved it.
    pub fn load_base<B: Backend>(
        dir:    &Path,
        device: &B::Device,
    ) -> Result<(ReviewClassifier<B>, ReviewClassifierConfig), PeftError> {
        let manifest = Self::read_manifest(dir)?;
        if let FineTuneStrategy::AdapterAugmented(_) = manifest.plan.strategy {
            return Err(PeftError::InvalidStrategy(format!(
                "'{}' holds a LoRA variant; a base model must be a plain classifier",
                dir.display()
            )));
        }
        let model = Self::load_as(dir, &manifest, &FineTuneStrategy::FullyTrainable, device)?;
        tracing::info!("Loaded base model from '{}'", dir.display());
        Ok((model, manifest.model))
    }

    /// File the recorder writes the parameters of `dir` to.
    pub fn model_path(dir: &Path) -> PathBuf {
        dir.join(MODEL_FILE)
    }
}

impl<B: Backend> ModelExporter<ReviewClassifier<B>> for ModelStore {
    fn export(&self, model: &ReviewClassifier<B>, dir: &Path) -> Result<(), PeftError> {
        self.save(model, dir)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::{AdapterConfig, TargetModule};
    use crate::ml::engine::evaluate_model;
    use crate::domain::review::TokenizedExample;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn config() -> ReviewClassifierConfig {
        ReviewClassifierConfig::new(120, 4, 16, 2, 1, 32).with_dropout(0.0)
    }

    fn eval_set() -> Vec<TokenizedExample> {
        (0..6u32)
            .map(|i| TokenizedExample {
                text:           String::new(),
                label:          (i % 5) as i64,
                input_ids:      vec![101, 104 + i, 110 + i, 0],
                attention_mask: vec![1, 1, 1, 0],
            })
            .collect()
    }

    fn round_trip(strategy: FineTuneStrategy) {
        let tmp    = tempfile::tempdir().unwrap();
        let dir    = tmp.path().join("exported_model");
        let device = Default::default();

        let (model, plan) = variant::prepare(config().init::<TB>(&device), &strategy, &device).unwrap();
        let store = ModelStore::new(config(), plan.clone());
        store.export(&model, &dir).unwrap();

        assert!(ModelStore::model_path(&dir).exists());

        let (loaded, manifest) = ModelStore::load::<TB>(&dir, &device).unwrap();
        assert_eq!(manifest.plan, plan);
        assert_eq!(manifest.model, config());

        let a = evaluate_model(&model, &eval_set(), 4, &device).unwrap();
        let b = evaluate_model(&loaded, &eval_set(), 4, &device).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_classifier_only() {
        round_trip(FineTuneStrategy::ClassifierOnly);
    }

    #[test]
    fn test_round_trip_lora() {
        let adapter = AdapterConfig::new(vec![TargetModule::Query, TargetModule::FfnOut], 2, 4.0);
        round_trip(FineTuneStrategy::AdapterAugmented(adapter));
    }

    #[test]
    fn test_missing_directory_is_storage_failure() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let result = ModelStore::load::<TB>(&tmp.path().join("nowhere"), &device);
        assert!(matches!(result, Err(PeftError::StorageFailure { .. })));
    }

    #[test]
    fn test_missing_parameters_is_storage_failure() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let (model, plan) = variant::prepare(
            config().init::<TB>(&device),
            &FineTuneStrategy::ClassifierOnly,
            &device,
        )
        .unwrap();
        ModelStore::new(config(), plan).save(&model, tmp.path()).unwrap();
        fs::remove_file(ModelStore::model_path(tmp.path())).unwrap();

        let result = ModelStore::load::<TB>(tmp.path(), &device);
        assert!(matches!(result, Err(PeftError::StorageFailure { .. })));
    }

    #[test]
    fn test_unwritable_target_is_storage_failure() {
        let tmp = tempfile::tempdir().unwrap();
        // a regular file where the export directory should go
        let blocker = tmp.path().join("exported_model");
        fs::write(&blocker, b"x").unwrap();

        let device = Default::default();
        let (model, plan) = variant::prepare(
            config().init::<TB>(&device),
            &FineTuneStrategy::FullyTrainable,
            &device,
        )
        .unwrap();
        let result = ModelStore::new(config(), plan).export(&model, &blocker);
        assert!(matches!(result, Err(PeftError::StorageFailure { .. })));
    }

    #[test]
    fn test_base_model_rejects_lora_variant() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let strategy = FineTuneStrategy::AdapterAugmented(AdapterConfig::default());
        let (model, plan) = variant::prepare(config().init::<TB>(&device), &strategy, &device).unwrap();
        ModelStore::new(config(), plan).save(&model, tmp.path()).unwrap();

        assert!(matches!(
            ModelStore::load_base::<TB>(tmp.path(), &device),
            Err(PeftError::InvalidStrategy(_))
        ));
    }
}
