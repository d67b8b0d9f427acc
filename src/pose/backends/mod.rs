pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

use anyhow::{anyhow, Result};

use crate::config::BackendSettings;
use crate::pose::backend::PoseBackend;
use crate::pose::shared::BackendFactory;

pub use stub::{standing_pose, StubBackend};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

/// Build a deferred constructor for the configured backend.
///
/// Nothing heavy happens here; the model is loaded when the factory runs
/// inside [`crate::pose::SharedDetector`].
pub fn factory_for(settings: &BackendSettings) -> Result<BackendFactory> {
    match settings.name.as_str() {
        "stub" => Ok(Box::new(|| -> Result<Box<dyn PoseBackend>> {
            Ok(Box::new(StubBackend::new()))
        })),
        "tract" => tract_factory(settings),
        other => Err(anyhow!("backend '{}' not available", other)),
    }
}

#[cfg(feature = "backend-tract")]
fn tract_factory(settings: &BackendSettings) -> Result<BackendFactory> {
    let model_path = settings
        .model_path
        .clone()
        .ok_or_else(|| anyhow!("the tract backend requires a model path"))?;
    let input_size = settings.input_size;
    Ok(Box::new(move || -> Result<Box<dyn PoseBackend>> {
        let backend = TractBackend::new(&model_path, input_size)?;
        Ok(Box::new(backend))
    }))
}

#[cfg(not(feature = "backend-tract"))]
fn tract_factory(_settings: &BackendSettings) -> Result<BackendFactory> {
    Err(anyhow!("the tract backend requires the backend-tract feature"))
}
