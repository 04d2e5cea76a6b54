use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use ort::session::Session;

use crate::domain::features::FeatureSet;
use crate::models::DemandModel;

/// ONNX-backed demand model scoring a single `[1, 4]` feature row.
///
/// Session runs need `&mut`, so the session sits behind a mutex; inference is
/// CPU-bound and each call holds the lock only for one `run`.
pub struct OnnxDemandModel {
    name: &'static str,
    session: Mutex<Session>,
    path: PathBuf,
}

impl OnnxDemandModel {
    /// Returns `Ok(None)` when the file does not exist, so a missing artifact
    /// selects the fallback path instead of failing startup.
    pub fn load(path: PathBuf, name: &'static str) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                name,
                "model file not found; fallback predictions in use"
            );
            return Ok(None);
        }

        let session = Session::builder()
            .context("failed to create ONNX session builder")?
            .commit_from_file(&path)
            .with_context(|| format!("failed to load ONNX model from {}", path.display()))?;

        tracing::info!(path = %path.display(), name, "loaded ONNX model");

        Ok(Some(Self {
            name,
            session: Mutex::new(session),
            path,
        }))
    }
}

impl DemandModel for OnnxDemandModel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn predict(&self, features: &FeatureSet) -> anyhow::Result<f64> {
        let row = features.to_model_row();
        let shape = vec![1usize, row.len()];
        let input = ort::value::Value::from_array((shape.as_slice(), row.to_vec()))
            .context("failed to build model input tensor")?;
        let inputs = ort::inputs![input];

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("model session lock poisoned"))?;

        let outputs = session
            .run(inputs)
            .with_context(|| format!("inference failed for {}", self.path.display()))?;

        let output = outputs
            .iter()
            .next()
            .map(|(_, value)| value)
            .context("model produced no outputs")?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .context("model output is not an f32 tensor")?;
        let value = data.first().copied().context("model output is empty")?;

        Ok(value as f64)
    }
}
