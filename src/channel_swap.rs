use crate::{
    error::{Error, Result},
    progress::{BatchSummary, ProgressReporter},
    stream::FramePattern,
};
use futures::stream::{self, StreamExt as _};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_JOBS: usize = 4;

/// Swaps the first and third color channels of every frame in a
/// directory, in place.
#[derive(Debug, Clone)]
pub struct ChannelSwapper {
    pattern: FramePattern,
    jobs: usize,
}

impl ChannelSwapper {
    pub fn new(pattern: FramePattern) -> Self {
        Self {
            pattern,
            jobs: DEFAULT_JOBS,
        }
    }

    /// Sets how many frames are processed at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Processes every frame in `dir`. A frame that fails to load or
    /// save is reported in the summary and the batch goes on.
    pub async fn apply(&self, dir: &Path, mut progress: ProgressReporter) -> Result<BatchSummary> {
        let mut paths: Vec<PathBuf> = self
            .pattern
            .scan(dir)?
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        paths.sort();

        info!("swapping color channels of {} frames in {}", paths.len(), dir.display());

        let mut summary = BatchSummary::new(paths.len());
        progress.start(paths.len());

        let mut results = stream::iter(paths)
            .map(|path| async move {
                let task_path = path.clone();
                let result = tokio::task::spawn_blocking(move || swap_frame(&task_path))
                    .await
                    .map_err(Error::from)
                    .and_then(|result| result);
                (path, result)
            })
            .buffer_unordered(self.jobs);

        while let Some((path, result)) = results.next().await {
            summary.record(&mut progress, path, result);
        }

        info!(
            "swapped {} of {} frames in {}",
            summary.completed,
            summary.total,
            dir.display()
        );

        Ok(summary)
    }
}

impl Default for ChannelSwapper {
    fn default() -> Self {
        Self::new(FramePattern::default())
    }
}

/// Loads, swaps and rewrites one frame.
pub fn swap_frame(path: &Path) -> Result<()> {
    let decode_failure = |source| Error::DecodeFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut frame = image::open(path).map_err(decode_failure)?;

    if !swap_red_blue(&mut frame) {
        return Err(Error::UnsupportedColor {
            path: path.to_path_buf(),
            color: format!("{:?}", frame.color()),
        });
    }

    frame.save(path).map_err(decode_failure)?;
    Ok(())
}

/// Swaps channel 0 and channel 2 of every pixel. Channel 1 and alpha
/// are left untouched. Returns false for images without three color
/// channels.
pub fn swap_red_blue(frame: &mut DynamicImage) -> bool {
    match frame {
        DynamicImage::ImageRgb8(buf) => buf.pixels_mut().for_each(|px| px.0.swap(0, 2)),
        DynamicImage::ImageRgba8(buf) => buf.pixels_mut().for_each(|px| px.0.swap(0, 2)),
        DynamicImage::ImageRgb16(buf) => buf.pixels_mut().for_each(|px| px.0.swap(0, 2)),
        DynamicImage::ImageRgba16(buf) => buf.pixels_mut().for_each(|px| px.0.swap(0, 2)),
        DynamicImage::ImageRgb32F(buf) => buf.pixels_mut().for_each(|px| px.0.swap(0, 2)),
        DynamicImage::ImageRgba32F(buf) => buf.pixels_mut().for_each(|px| px.0.swap(0, 2)),
        _ => return false,
    }
    true
}
