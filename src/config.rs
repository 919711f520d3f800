use crate::{
    aligner::DEFAULT_ROW_SCALE,
    channel_swap::{ChannelSwapper, DEFAULT_JOBS},
    error::Result,
    renormalize::{EpochRenormalizer, DEFAULT_NAME_WIDTH, DEFAULT_SENTINEL},
    stream::FramePattern,
    types::Timestamp,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frames: FrameParams,
    pub alignment: AlignmentParams,
    pub batch: BatchParams,
    /// Frame directories to browse, by stream name.
    pub streams: IndexMap<String, StreamParams>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn frame_pattern(&self) -> FramePattern {
        FramePattern::new(&self.frames.extension)
    }

    pub fn renormalizer(&self) -> EpochRenormalizer {
        EpochRenormalizer::new(self.frame_pattern())
            .with_name_width(self.frames.name_width)
            .with_sentinel(self.frames.sentinel.clone())
    }

    pub fn channel_swapper(&self) -> ChannelSwapper {
        ChannelSwapper::new(self.frame_pattern()).with_jobs(self.batch.jobs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameParams {
    /// Frame file extension, without the dot.
    pub extension: String,
    /// Digits of a renormalized frame name.
    pub name_width: usize,
    /// Marker written after a completed renormalization.
    pub sentinel: String,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            extension: "jpg".to_string(),
            name_width: DEFAULT_NAME_WIDTH,
            sentinel: DEFAULT_SENTINEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// Master clock units per motion-capture row.
    pub row_scale: Timestamp,
    #[serde(with = "humantime_serde")]
    pub resolve_budget: Duration,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            row_scale: DEFAULT_ROW_SCALE,
            resolve_budget: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchParams {
    pub jobs: usize,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self { jobs: DEFAULT_JOBS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamParams {
    pub dir: PathBuf,
    #[serde(default)]
    pub offset: Timestamp,
}
