//! Nearest-timestamp frame lookup over an irregularly sampled stream.
//!
//! The lookup guesses a frame index from the mean inter-frame interval
//! and then walks outwards from the guess in both directions while the
//! timestamp error keeps shrinking. On close-to-uniform streams the
//! walk stops after a step or two.
//!
//! Timestamps are expected on a zero-based epoch (see
//! [EpochRenormalizer](crate::EpochRenormalizer)): the guess is
//! `floor(query / interval)` with no start offset subtracted.

use crate::{
    error::{ensure_stream, Error, Result},
    stream::FrameStream,
    types::{Timestamp, Timestamped},
};
use itertools::Itertools as _;

/// A read-only sorted view over the timestamps of one stream.
#[derive(Debug, Clone)]
pub struct TimestampIndex {
    timestamps: Vec<Timestamp>,
    mean_interval: f64,
}

impl TimestampIndex {
    /// Builds an index from strictly increasing timestamps.
    pub fn build(timestamps: Vec<Timestamp>) -> Result<Self> {
        let len = timestamps.len();
        ensure_stream!(len >= 2, "a stream needs at least two timestamps, got {len}");

        if let Some((prev, next)) = timestamps
            .iter()
            .tuple_windows()
            .find(|(prev, next)| prev >= next)
        {
            return Err(Error::InvalidStream(format!(
                "timestamp {next} does not follow {prev}"
            )));
        }

        // The mean interval is taken from the second timestamp on, as
        // the first frame of a recording may be a leading sentinel. A
        // two-frame stream has no such span and uses its only interval.
        let span = if len > 2 {
            timestamps[len - 1].abs_diff(timestamps[1])
        } else {
            timestamps[1].abs_diff(timestamps[0])
        };
        let mean_interval = span as f64 / (len - 1) as f64;

        Ok(Self {
            timestamps,
            mean_interval,
        })
    }

    pub fn from_stream<T>(stream: &FrameStream<T>) -> Result<Self>
    where
        T: Timestamped,
    {
        Self::build(stream.timestamps().collect())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Always false, an index holds at least two timestamps.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn timestamp(&self, index: usize) -> Option<Timestamp> {
        self.timestamps.get(index).copied()
    }

    pub fn first(&self) -> Timestamp {
        self.timestamps[0]
    }

    pub fn last(&self) -> Timestamp {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// The mean inter-frame interval used to guess an index.
    pub fn mean_interval(&self) -> f64 {
        self.mean_interval
    }

    /// The smallest query that is clamped straight to the last frame.
    pub fn clamp_threshold(&self) -> Timestamp {
        ((self.len() - 1) as f64 * self.mean_interval).ceil() as Timestamp
    }

    /// Returns the index of the frame whose timestamp is closest to
    /// `query`.
    ///
    /// Queries whose guess lands on or past the last frame return the
    /// last index without looking at its neighbors. Queries whose guess
    /// is negative fail with [Error::InvalidQuery]. While walking
    /// backwards the search never goes below index 0. On an exact tie
    /// the frame after the guess wins over the frame before it.
    pub fn nearest_index(&self, query: Timestamp) -> Result<usize> {
        let last = self.timestamps.len() - 1;
        let guess = (query as f64 / self.mean_interval).floor();

        if guess < 0.0 {
            return Err(Error::InvalidQuery {
                query,
                estimate: guess as i64,
            });
        }
        if guess >= last as f64 {
            return Ok(last);
        }

        let guess = guess as usize;
        let mut best = guess;
        let mut best_err = self.timestamps[guess].abs_diff(query);
        let mut forward = true;
        let mut backward = true;
        let mut offset = 1;

        loop {
            if forward {
                match self.timestamps.get(guess + offset) {
                    Some(&ts) if ts.abs_diff(query) < best_err => {
                        best = guess + offset;
                        best_err = ts.abs_diff(query);
                    }
                    _ => forward = false,
                }
            }

            if backward {
                match guess.checked_sub(offset) {
                    Some(index) if self.timestamps[index].abs_diff(query) < best_err => {
                        best = index;
                        best_err = self.timestamps[index].abs_diff(query);
                    }
                    _ => backward = false,
                }
            }

            if !(forward || backward) {
                break;
            }
            offset += 1;
        }

        Ok(best)
    }

    /// Like [nearest_index](Self::nearest_index), but a query with a
    /// negative guess resolves to the first frame.
    pub fn nearest_index_clamped(&self, query: Timestamp) -> usize {
        self.nearest_index(query).unwrap_or(0)
    }
}
