use crate::{
    aligner::{MultiStreamAligner, Resolution},
    config::Config,
    error::Result,
    index::TimestampIndex,
    stream::{Frame, FrameStream},
    types::Timestamp,
};
use indexmap::IndexMap;
use std::path::Path;
use tracing::info;

/// The frame streams of one recording and the aligner over them.
#[derive(Debug)]
pub struct Session {
    aligner: MultiStreamAligner<String>,
    frames: IndexMap<String, FrameStream<Frame>>,
}

impl Session {
    /// Scans every configured stream directory. Fails if any stream is
    /// unusable, no partial session is returned.
    pub fn load(config: &Config) -> Result<Self> {
        let pattern = config.frame_pattern();
        let mut aligner = MultiStreamAligner::with_row_scale(config.alignment.row_scale);
        aligner.set_resolve_budget(Some(config.alignment.resolve_budget));
        let mut frames = IndexMap::new();

        for (name, params) in &config.streams {
            let stream = FrameStream::scan_dir(&params.dir, &pattern)?;
            info!(
                "read {} frames of stream {} from {}",
                stream.len(),
                name,
                params.dir.display()
            );

            aligner.register_stream(name.clone(), TimestampIndex::from_stream(&stream)?);
            aligner.set_offset(name, params.offset)?;
            frames.insert(name.clone(), stream);
        }

        Ok(Self { aligner, frames })
    }

    pub fn aligner(&self) -> &MultiStreamAligner<String> {
        &self.aligner
    }

    pub fn stream(&self, name: &str) -> Option<&FrameStream<Frame>> {
        self.frames.get(name)
    }

    pub fn resolve(&self, master_time: Timestamp) -> Resolution<String> {
        self.aligner.resolve(master_time)
    }

    /// The frame to show for each stream at `master_time`.
    pub fn frames_at(&self, master_time: Timestamp) -> IndexMap<&str, (usize, &Path)> {
        self.resolve(master_time)
            .frames
            .into_iter()
            .filter_map(|(name, index)| {
                let (name, stream) = self.frames.get_key_value(&name)?;
                let frame = stream.get(index)?;
                Some((name.as_str(), (index, frame.handle.as_path())))
            })
            .collect()
    }
}
