//! Port abstraction for the host-wide "synchronisation paused" switch.

use std::sync::atomic::{AtomicBool, Ordering};

/// Port reporting whether event-driven synchronisation is suspended.
pub trait PauseFlag: Send + Sync {
    /// `true` while saves and deletes must not touch the file tree.
    fn is_paused(&self) -> bool;
}

/// Process-wide pause switch.
///
/// Hold a [`PauseGuard`] around bulk imports so the saves they perform do not
/// echo back into the file tree.
#[derive(Debug, Default)]
pub struct SyncPause {
    paused: AtomicBool,
}

impl SyncPause {
    /// Suspend event-driven synchronisation.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume event-driven synchronisation.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Pause until the returned guard is dropped.
    pub fn pause_scope(&self) -> PauseGuard<'_> {
        self.pause();
        PauseGuard { pause: self }
    }
}

/// Resumes synchronisation when dropped.
#[derive(Debug)]
#[must_use = "synchronisation resumes as soon as the guard is dropped"]
pub struct PauseGuard<'a> {
    pause: &'a SyncPause,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.pause.resume();
    }
}

impl PauseFlag for SyncPause {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
