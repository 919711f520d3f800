//! Rewrites timestamp-named frames onto a zero-based epoch.
//!
//! Renaming is not transactional. A sentinel file is written into the
//! directory only after every frame has been renamed, so a directory
//! without it after a pass was interrupted or had failures and has to
//! be inspected by hand.

use crate::{
    error::{Error, Result},
    progress::{BatchSummary, ProgressReporter},
    stream::FramePattern,
    types::Timestamp,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub const DEFAULT_NAME_WIDTH: usize = 8;
pub const DEFAULT_SENTINEL: &str = ".synced";

/// Asks the operator whether a plan may be applied.
pub trait Confirm {
    fn confirm(&mut self, plan: &RenamePlan, offset: Timestamp) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&RenamePlan, Timestamp) -> bool,
{
    fn confirm(&mut self, plan: &RenamePlan, offset: Timestamp) -> bool {
        self(plan, offset)
    }
}

/// What happened to a plan handed to
/// [apply](EpochRenormalizer::apply).
#[derive(Debug)]
pub enum RenameOutcome {
    /// The operator declined. Nothing was renamed.
    Cancelled,
    Applied(BatchSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub timestamp: Timestamp,
}

/// The frames found in a directory, ordered by timestamp.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    dir: PathBuf,
    extension: String,
    name_width: usize,
    min_timestamp: Timestamp,
    entries: Vec<PlanEntry>,
}

impl RenamePlan {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn min_timestamp(&self) -> Timestamp {
        self.min_timestamp
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The new timestamp of a frame once `offset` is applied, or `None`
    /// when it does not fit in a [Timestamp].
    pub fn renormalized(&self, timestamp: Timestamp, offset: Timestamp) -> Option<Timestamp> {
        let shifted = timestamp as i128 - self.min_timestamp as i128 + offset as i128;
        Timestamp::try_from(shifted).ok()
    }

    /// The new file name of a frame, zero padded to the plan width.
    pub fn target_name(&self, timestamp: Timestamp, offset: Timestamp) -> Option<String> {
        let renormalized = self.renormalized(timestamp, offset)?;
        Some(format!(
            "{:0width$}.{}",
            renormalized,
            self.extension,
            width = self.name_width
        ))
    }

    /// The `(source, target)` renames in the order they are applied.
    ///
    /// Frames moving to later timestamps are renamed from the latest
    /// one down, and frames moving to earlier timestamps from the
    /// earliest one up, so a frame never lands on a name that another
    /// frame of the same plan still holds.
    ///
    /// Fails with [Error::TimestampOverflow] if any frame would leave
    /// the timestamp range.
    pub fn mapping(&self, offset: Timestamp) -> Result<Vec<(PathBuf, PathBuf)>> {
        let shift = offset as i128 - self.min_timestamp as i128;
        let rename = |entry: &PlanEntry| {
            let name = self
                .target_name(entry.timestamp, offset)
                .ok_or(Error::TimestampOverflow {
                    timestamp: entry.timestamp,
                    offset,
                })?;
            Ok((entry.source.clone(), self.dir.join(name)))
        };

        if shift > 0 {
            self.entries.iter().rev().map(rename).collect()
        } else {
            self.entries.iter().map(rename).collect()
        }
    }
}

/// Plans and applies epoch renormalization of frame directories.
#[derive(Debug, Clone)]
pub struct EpochRenormalizer {
    pattern: FramePattern,
    name_width: usize,
    sentinel: String,
}

impl EpochRenormalizer {
    pub fn new(pattern: FramePattern) -> Self {
        Self {
            pattern,
            name_width: DEFAULT_NAME_WIDTH,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }

    pub fn with_name_width(mut self, name_width: usize) -> Self {
        self.name_width = name_width;
        self
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn sentinel_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.sentinel)
    }

    /// Scans `dir` and finds the minimum timestamp.
    ///
    /// Fails with [Error::AlreadySynced] if the directory carries the
    /// sentinel of a completed pass, and with [Error::EmptyDirectory]
    /// if no frame name matches.
    pub fn plan(&self, dir: &Path) -> Result<RenamePlan> {
        let sentinel = self.sentinel_path(dir);
        if sentinel.exists() {
            return Err(Error::AlreadySynced {
                dir: dir.to_path_buf(),
                sentinel,
            });
        }

        let mut entries: Vec<PlanEntry> = self
            .pattern
            .scan(dir)?
            .into_iter()
            .map(|(timestamp, source)| PlanEntry { source, timestamp })
            .collect();
        entries.sort_by(|lhs, rhs| {
            (lhs.timestamp, &lhs.source).cmp(&(rhs.timestamp, &rhs.source))
        });

        let min_timestamp = entries[0].timestamp;
        info!(
            "found {} frames in {}, minimal timestamp {}",
            entries.len(),
            dir.display(),
            min_timestamp
        );

        Ok(RenamePlan {
            dir: dir.to_path_buf(),
            extension: self.pattern.extension().to_string(),
            name_width: self.name_width,
            min_timestamp,
            entries,
        })
    }

    /// Renames every frame of the plan to `timestamp - min + offset`
    /// once `confirm` agrees.
    ///
    /// An offset that pushes any frame out of the timestamp range fails
    /// before the operator is asked. A frame whose target name is taken
    /// is reported and left alone. The sentinel is written only if every
    /// frame was renamed, and a sentinel that cannot be written is
    /// reported in the summary.
    pub fn apply<C>(
        &self,
        plan: &RenamePlan,
        offset: Timestamp,
        confirm: &mut C,
        mut progress: ProgressReporter,
    ) -> Result<RenameOutcome>
    where
        C: Confirm + ?Sized,
    {
        let mapping = plan.mapping(offset)?;
        if !confirm.confirm(plan, offset) {
            info!("renaming cancelled");
            return Ok(RenameOutcome::Cancelled);
        }

        let mut summary = BatchSummary::new(mapping.len());
        progress.start(mapping.len());

        for (source, target) in mapping {
            let result = rename_frame(&source, &target);
            summary.record(&mut progress, source, result);
        }

        if !summary.is_clean() {
            info!(
                "renamed {} of {} frames in {}, {} failed, sentinel not written",
                summary.completed,
                summary.total,
                plan.dir.display(),
                summary.failed()
            );
            return Ok(RenameOutcome::Applied(summary));
        }

        let sentinel = self.sentinel_path(&plan.dir);
        match fs::File::create(&sentinel) {
            Ok(_) => info!("renamed {} frames in {}", summary.completed, plan.dir.display()),
            Err(err) => {
                warn!(
                    "renamed {} frames in {} but could not write {}: {err}",
                    summary.completed,
                    plan.dir.display(),
                    sentinel.display()
                );
                summary.failures.push((sentinel, err.into()));
            }
        }

        Ok(RenameOutcome::Applied(summary))
    }
}

impl Default for EpochRenormalizer {
    fn default() -> Self {
        Self::new(FramePattern::default())
    }
}

fn rename_frame(source: &Path, target: &Path) -> Result<()> {
    if source == target {
        debug!("{} keeps its name", source.display());
        return Ok(());
    }

    if target.exists() {
        return Err(Error::RenameCollision {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
        });
    }

    fs::rename(source, target)?;
    Ok(())
}
