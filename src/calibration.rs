use crate::types::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// The operator-set offset of one stream against the master clock.
///
/// The offset is added to a master query time before the stream is
/// searched. It can be changed through a shared reference while other
/// threads are resolving. Every read is independent, so a resolution
/// racing an update may see the old value for one stream and the new
/// value for another.
#[derive(Debug, Default)]
pub struct StreamCalibration {
    offset: AtomicI64,
}

impl StreamCalibration {
    pub fn new(offset: Timestamp) -> Self {
        Self {
            offset: AtomicI64::new(offset),
        }
    }

    pub fn offset(&self) -> Timestamp {
        self.offset.load(Ordering::Relaxed)
    }

    pub fn set_offset(&self, offset: Timestamp) {
        self.offset.store(offset, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.set_offset(0);
    }

    /// Maps a master clock time onto the stream clock.
    pub fn apply(&self, master_time: Timestamp) -> Timestamp {
        master_time.saturating_add(self.offset())
    }
}

impl Clone for StreamCalibration {
    fn clone(&self) -> Self {
        Self::new(self.offset())
    }
}
