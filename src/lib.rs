mod aligner;
mod auxiliary;
mod calibration;
mod channel_swap;
mod config;
mod error;
mod index;
mod progress;
mod renormalize;
mod session;
mod stream;
mod types;

pub use aligner::{MultiStreamAligner, Resolution, DEFAULT_ROW_SCALE};
pub use auxiliary::{AuxiliaryTable, Point3, TrajectorySet, TrajectorySource};
pub use calibration::StreamCalibration;
pub use channel_swap::{swap_frame, swap_red_blue, ChannelSwapper};
pub use config::{AlignmentParams, BatchParams, Config, FrameParams, StreamParams};
pub use error::{Error, Result};
pub use index::TimestampIndex;
pub use progress::{BatchSummary, ProgressReporter};
pub use renormalize::{Confirm, EpochRenormalizer, PlanEntry, RenameOutcome, RenamePlan};
pub use session::Session;
pub use stream::{Frame, FramePattern, FrameStream};
pub use types::*;
