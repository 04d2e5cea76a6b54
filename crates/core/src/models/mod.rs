pub mod onnx;

use std::path::Path;
use std::sync::Arc;

use crate::domain::features::FeatureSet;

pub const MODEL_XGBOOST_PEAK: &str = "xgboost_peak";
pub const MODEL_PROPHET_PEAK: &str = "prophet_peak";
pub const MODEL_FALLBACK: &str = "fallback";

/// Opaque prediction capability: one numeric output for one feature row.
///
/// The forecast generator does not care what technology sits behind an
/// implementation; anything that can score the four-column feature row
/// satisfies this seam.
pub trait DemandModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, features: &FeatureSet) -> anyhow::Result<f64>;
}

/// Read-only model lookup, built once at startup and shared across requests.
/// An empty slot selects the fallback heuristic; it is never an error.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    peak: Option<Arc<dyn DemandModel>>,
    timeseries: Option<Arc<dyn DemandModel>>,
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_peak(mut self, model: Arc<dyn DemandModel>) -> Self {
        self.peak = Some(model);
        self
    }

    pub fn with_timeseries(mut self, model: Arc<dyn DemandModel>) -> Self {
        self.timeseries = Some(model);
        self
    }

    pub fn peak(&self) -> Option<&dyn DemandModel> {
        self.peak.as_deref()
    }

    pub fn timeseries(&self) -> Option<&dyn DemandModel> {
        self.timeseries.as_deref()
    }

    pub fn loaded_count(&self) -> usize {
        usize::from(self.peak.is_some()) + usize::from(self.timeseries.is_some())
    }

    /// Loads the known ONNX artifacts from `dir`. A missing or unloadable
    /// file is logged and skipped so the service starts with whatever loads.
    pub fn load_from_dir(dir: &Path) -> Self {
        let mut registry = Self::empty();

        match onnx::OnnxDemandModel::load(dir.join("xgboost_peak.onnx"), MODEL_XGBOOST_PEAK) {
            Ok(Some(model)) => registry.peak = Some(Arc::new(model)),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "failed to load xgboost_peak model"),
        }
        match onnx::OnnxDemandModel::load(dir.join("prophet_peak.onnx"), MODEL_PROPHET_PEAK) {
            Ok(Some(model)) => registry.timeseries = Some(Arc::new(model)),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "failed to load prophet_peak model"),
        }

        tracing::info!(
            models_loaded = registry.loaded_count(),
            "model registry initialized"
        );

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstModel(f64);

    impl DemandModel for ConstModel {
        fn name(&self) -> &'static str {
            MODEL_XGBOOST_PEAK
        }

        fn predict(&self, _features: &FeatureSet) -> anyhow::Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn empty_registry_has_no_models() {
        let registry = ModelRegistry::empty();
        assert!(registry.peak().is_none());
        assert!(registry.timeseries().is_none());
        assert_eq!(registry.loaded_count(), 0);
    }

    #[test]
    fn builder_fills_slots() {
        let registry = ModelRegistry::empty().with_peak(Arc::new(ConstModel(42.0)));
        assert!(registry.peak().is_some());
        assert!(registry.timeseries().is_none());
        assert_eq!(registry.loaded_count(), 1);
    }

    #[test]
    fn load_from_missing_dir_yields_empty_registry() {
        let registry = ModelRegistry::load_from_dir(Path::new("does_not_exist"));
        assert_eq!(registry.loaded_count(), 0);
    }
}
