use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::pose::backend::PoseBackend;
use crate::pose::Subject;

/// Deferred backend constructor. Runs at most once.
pub type BackendFactory = Box<dyn FnOnce() -> Result<Box<dyn PoseBackend>> + Send>;

type SharedBackend = Arc<Mutex<Box<dyn PoseBackend>>>;

/// Lazily-initialised pose detector shared by every analysis.
///
/// The first caller of [`SharedDetector::handle`] runs the factory (and the
/// backend's warm-up). Callers arriving while that is in flight block on the
/// same initialisation, and every later caller receives the memoised outcome,
/// including a memoised failure. Pass it around as `Arc<SharedDetector>`.
pub struct SharedDetector {
    factory: Mutex<Option<BackendFactory>>,
    slot: OnceLock<std::result::Result<SharedBackend, String>>,
}

impl SharedDetector {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            factory: Mutex::new(Some(factory)),
            slot: OnceLock::new(),
        }
    }

    /// Wrap an already constructed backend. No deferred work remains.
    pub fn ready<B: PoseBackend + 'static>(backend: B) -> Self {
        let detector = Self {
            factory: Mutex::new(None),
            slot: OnceLock::new(),
        };
        let boxed: Box<dyn PoseBackend> = Box::new(backend);
        let _ = detector.slot.set(Ok(Arc::new(Mutex::new(boxed))));
        detector
    }

    /// Get a handle to the detector, initialising it on first use.
    pub fn handle(&self) -> Result<DetectorHandle> {
        let slot = self.slot.get_or_init(|| self.initialise());
        match slot {
            Ok(backend) => Ok(DetectorHandle {
                backend: backend.clone(),
            }),
            Err(reason) => Err(anyhow!("pose detector unavailable: {}", reason)),
        }
    }

    /// Trigger initialisation now so the first analysis does not pay for it.
    pub fn warm_up(&self) -> Result<()> {
        self.handle().map(|_| ())
    }

    pub fn is_initialised(&self) -> bool {
        self.slot.get().is_some()
    }

    fn initialise(&self) -> std::result::Result<SharedBackend, String> {
        let factory = self
            .factory
            .lock()
            .map_err(|_| "factory lock poisoned".to_string())?
            .take()
            .ok_or_else(|| "backend factory already consumed".to_string())?;

        let mut backend = factory().map_err(|e| format!("{:#}", e))?;
        backend.warm_up().map_err(|e| format!("{:#}", e))?;
        log::info!("pose detector '{}' initialised", backend.name());
        Ok(Arc::new(Mutex::new(backend)))
    }
}

/// Cheap clonable handle to an initialised backend.
#[derive(Clone)]
pub struct DetectorHandle {
    backend: SharedBackend,
}

impl DetectorHandle {
    pub fn detect(&self, frame: &Frame, max_subjects: usize) -> Result<Vec<Subject>> {
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| anyhow!("pose backend lock poisoned"))?;
        let mut subjects = guard.detect(frame, max_subjects)?;
        subjects.truncate(max_subjects);
        Ok(subjects)
    }

    pub fn backend_name(&self) -> Result<&'static str> {
        let guard = self
            .backend
            .lock()
            .map_err(|_| anyhow!("pose backend lock poisoned"))?;
        Ok(guard.name())
    }
}
