use std::{fmt::Debug, hash::Hash};
use tokio::sync::watch;

/// A point on a device clock or on the master clock. The unit is
/// milliseconds for the recorded devices, but any monotonic integer
/// unit works as long as all streams share it.
pub type Timestamp = i64;

/// Exposes the timestamp of an item stored in a
/// [FrameStream](crate::FrameStream).
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

impl Timestamped for Timestamp {
    fn timestamp(&self) -> Timestamp {
        *self
    }
}

/// The key that identifies a stream in the
/// [MultiStreamAligner](crate::MultiStreamAligner).
pub trait Key: Clone + PartialEq + Eq + Hash + Debug + Sync + Send {}

impl<K> Key for K where K: Clone + PartialEq + Eq + Hash + Debug + Sync + Send {}

/// The progress snapshot published by the batch procedures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Number of frames the batch is going to visit.
    pub total: usize,
    /// Number of frames processed successfully so far.
    pub completed: usize,
    /// Number of frames that failed and were skipped so far.
    pub failed: usize,
}

impl Progress {
    /// Frames visited so far, whether they succeeded or not.
    pub fn visited(&self) -> usize {
        self.completed + self.failed
    }

    pub fn is_finished(&self) -> bool {
        self.visited() >= self.total
    }
}

/// The receiver returned alongside a
/// [ProgressReporter](crate::ProgressReporter) to watch the pace of a
/// batch.
pub type ProgressReceiver = watch::Receiver<Progress>;
