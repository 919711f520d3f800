use crate::{
    error::Error,
    types::{Progress, ProgressReceiver},
};
use std::path::PathBuf;
use tokio::sync::watch;

/// Publishes the progress of a batch procedure.
#[derive(Debug)]
pub struct ProgressReporter {
    progress: Progress,
    progress_tx: Option<watch::Sender<Progress>>,
}

impl ProgressReporter {
    /// Creates a reporter and the receiver watching it.
    pub fn channel() -> (Self, ProgressReceiver) {
        let (progress_tx, progress_rx) = watch::channel(Progress::default());
        let me = Self {
            progress: Progress::default(),
            progress_tx: Some(progress_tx),
        };
        (me, progress_rx)
    }

    /// Creates a reporter nobody listens to.
    pub fn detached() -> Self {
        Self {
            progress: Progress::default(),
            progress_tx: None,
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub(crate) fn start(&mut self, total: usize) {
        self.progress = Progress {
            total,
            completed: 0,
            failed: 0,
        };
        self.publish();
    }

    pub(crate) fn complete(&mut self) {
        self.progress.completed += 1;
        self.publish();
    }

    pub(crate) fn fail(&mut self) {
        self.progress.failed += 1;
        self.publish();
    }

    fn publish(&mut self) {
        let Some(progress_tx) = &self.progress_tx else {
            return;
        };

        if progress_tx.send(self.progress).is_err() {
            self.progress_tx = None;
        }
    }
}

/// The final tally of a batch procedure.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    /// Frames that were skipped, with the reason.
    pub failures: Vec<(PathBuf, Error)>,
}

impl BatchSummary {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True if every frame succeeded and nothing else was reported.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.completed == self.total
    }

    pub(crate) fn record(
        &mut self,
        reporter: &mut ProgressReporter,
        path: PathBuf,
        result: Result<(), Error>,
    ) {
        match result {
            Ok(()) => {
                self.completed += 1;
                reporter.complete();
            }
            Err(err) => {
                tracing::warn!("skip {}: {}", path.display(), err);
                self.failures.push((path, err));
                reporter.fail();
            }
        }
    }
}
