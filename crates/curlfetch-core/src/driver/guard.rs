//! RAII guard for the Running state of a downloader.

use std::sync::Mutex;

use crate::error::DownloaderError;

use super::{lock, BatchState};

/// Holds the downloader in `Running` for the lifetime of one fetch and moves
/// it to `Done` when dropped, including on error or panic.
pub(super) struct RunningGuard<'a> {
    state: &'a Mutex<BatchState>,
}

impl<'a> RunningGuard<'a> {
    pub(super) fn enter(state: &'a Mutex<BatchState>) -> Result<Self, DownloaderError> {
        let mut current = lock(state);
        if *current == BatchState::Running {
            return Err(DownloaderError::BatchAlreadyRunning);
        }
        *current = BatchState::Running;
        Ok(Self { state })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = BatchState::Done;
    }
}
