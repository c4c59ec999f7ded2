use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use image::RgbImage;
use tracing::debug;

use crate::error::LoadError;

/// Background image decoding with at most one load in flight. A request made
/// while another is running fails with [`LoadError::Busy`]; nothing is queued.
#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    busy: Arc<AtomicBool>,
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn load(&self, path: impl Into<PathBuf>) -> Result<RgbImage, LoadError> {
        let path = path.into();
        self.load_with(move || {
            debug!(?path, "decoding image");
            image::open(&path)
                .map(|img| img.to_rgb8())
                .map_err(|source| LoadError::Image { path, source })
        })
        .await
    }

    /// Run `job` on the blocking pool under the single-flight rule. The loader
    /// stays busy until `job` returns, even if the returned future is dropped.
    pub async fn load_with<T, F>(&self, job: F) -> Result<T, LoadError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, LoadError> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoadError::Busy);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            job()
        })
        .await?
    }
}
