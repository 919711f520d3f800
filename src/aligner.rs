use crate::{
    auxiliary::AuxiliaryTable,
    calibration::StreamCalibration,
    error::{Error, Result},
    index::TimestampIndex,
    types::{Key, Timestamp},
};
use indexmap::IndexMap;
use std::{
    ops::Range,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// The default width of an auxiliary table row in master clock units.
pub const DEFAULT_ROW_SCALE: Timestamp = 10;

/// Resolves a master clock time to one frame per registered stream.
///
/// Offsets are changed through `&self`, so an aligner behind an `Arc`
/// can be re-calibrated while other threads resolve.
#[derive(Debug)]
pub struct MultiStreamAligner<K>
where
    K: Key,
{
    /// The registered streams in registration order.
    streams: IndexMap<K, AlignedStream>,

    /// The optional motion-capture trajectory.
    auxiliary: Option<AlignedTable>,

    /// The number of master clock units covered by one auxiliary row.
    row_scale: Timestamp,

    /// Resolutions slower than this are reported.
    resolve_budget: Option<Duration>,
}

#[derive(Debug)]
struct AlignedStream {
    index: TimestampIndex,
    calibration: StreamCalibration,
}

#[derive(Debug)]
struct AlignedTable {
    table: AuxiliaryTable,
    calibration: StreamCalibration,
}

/// The frames selected for one master clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<K>
where
    K: Key,
{
    pub master_time: Timestamp,
    /// One frame index per stream, in registration order.
    pub frames: IndexMap<K, usize>,
    /// The auxiliary row, if a table is registered.
    pub auxiliary_row: Option<usize>,
}

impl<K> MultiStreamAligner<K>
where
    K: Key,
{
    pub fn new() -> Self {
        Self::with_row_scale(DEFAULT_ROW_SCALE)
    }

    /// Creates an aligner whose auxiliary rows span `row_scale` master
    /// clock units each. Non-positive scales are raised to 1.
    pub fn with_row_scale(row_scale: Timestamp) -> Self {
        Self {
            streams: IndexMap::new(),
            auxiliary: None,
            row_scale: row_scale.max(1),
            resolve_budget: None,
        }
    }

    pub fn set_resolve_budget(&mut self, budget: Option<Duration>) {
        self.resolve_budget = budget;
    }

    pub fn row_scale(&self) -> Timestamp {
        self.row_scale
    }

    /// Registers a stream with a zero offset. A stream registered under
    /// an existing key replaces it and its offset.
    pub fn register_stream(&mut self, key: K, index: TimestampIndex) {
        let stream = AlignedStream {
            index,
            calibration: StreamCalibration::default(),
        };
        if self.streams.insert(key.clone(), stream).is_some() {
            debug!("replace stream {:?}", key);
        }
    }

    /// Registers the auxiliary table with a zero offset, replacing any
    /// previous table.
    pub fn register_auxiliary(&mut self, table: AuxiliaryTable) {
        self.auxiliary = Some(AlignedTable {
            table,
            calibration: StreamCalibration::default(),
        });
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.streams.keys()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn index(&self, key: &K) -> Option<&TimestampIndex> {
        self.streams.get(key).map(|stream| &stream.index)
    }

    pub fn auxiliary(&self) -> Option<&AuxiliaryTable> {
        self.auxiliary.as_ref().map(|aux| &aux.table)
    }

    fn stream(&self, key: &K) -> Result<&AlignedStream> {
        self.streams
            .get(key)
            .ok_or_else(|| Error::UnknownStream(format!("{key:?}")))
    }

    pub fn offset(&self, key: &K) -> Result<Timestamp> {
        Ok(self.stream(key)?.calibration.offset())
    }

    pub fn set_offset(&self, key: &K, offset: Timestamp) -> Result<()> {
        self.stream(key)?.calibration.set_offset(offset);
        Ok(())
    }

    pub fn reset_offset(&self, key: &K) -> Result<()> {
        self.stream(key)?.calibration.reset();
        Ok(())
    }

    /// Marks `frame_index` as the reference event of the stream seen at
    /// `master_time`, so that `master_time` resolves to that frame.
    /// Returns the new offset, leaving the old one in place if the
    /// difference does not fit in a [Timestamp].
    pub fn calibrate_at(
        &self,
        key: &K,
        master_time: Timestamp,
        frame_index: usize,
    ) -> Result<Timestamp> {
        let stream = self.stream(key)?;
        let Some(timestamp) = stream.index.timestamp(frame_index) else {
            return Err(Error::InvalidQuery {
                query: master_time,
                estimate: frame_index as i64,
            });
        };

        let offset = timestamp
            .checked_sub(master_time)
            .ok_or(Error::TimestampOverflow {
                timestamp,
                offset: master_time,
            })?;
        stream.calibration.set_offset(offset);
        Ok(offset)
    }

    /// The auxiliary offset, or `None` if no table is registered.
    pub fn auxiliary_offset(&self) -> Option<Timestamp> {
        self.auxiliary.as_ref().map(|aux| aux.calibration.offset())
    }

    /// Sets the auxiliary offset. Returns false if no table is
    /// registered.
    pub fn set_auxiliary_offset(&self, offset: Timestamp) -> bool {
        match &self.auxiliary {
            Some(aux) => {
                aux.calibration.set_offset(offset);
                true
            }
            None => false,
        }
    }

    pub fn reset_auxiliary(&self) {
        if let Some(aux) = &self.auxiliary {
            aux.calibration.reset();
        }
    }

    /// Resets every offset to zero.
    pub fn reset_all(&self) {
        self.streams
            .values()
            .for_each(|stream| stream.calibration.reset());
        self.reset_auxiliary();
    }

    /// Gets the maximum of the last timestamps among all streams.
    pub fn master_extent(&self) -> Option<Timestamp> {
        self.streams.values().map(|stream| stream.index.last()).max()
    }

    /// Resolves one stream. A query before the start of the stream
    /// resolves to its first frame.
    pub fn resolve_stream(&self, key: &K, master_time: Timestamp) -> Result<usize> {
        Ok(resolve_one(key, self.stream(key)?, master_time))
    }

    /// Resolves the auxiliary row by bucket arithmetic, or `None` if no
    /// table is registered.
    pub fn resolve_auxiliary(&self, master_time: Timestamp) -> Option<usize> {
        let aux = self.auxiliary.as_ref()?;
        let time = aux.calibration.apply(master_time);
        Some(aux.table.bucket(time, self.row_scale))
    }

    /// Rows from the auxiliary reference event up to and including the
    /// row at `master_time`.
    pub fn auxiliary_window(&self, master_time: Timestamp) -> Option<Range<usize>> {
        let aux = self.auxiliary.as_ref()?;
        let start = aux.table.bucket(aux.calibration.offset(), self.row_scale);
        let end = self.resolve_auxiliary(master_time)? + 1;
        Some(start.min(end)..end)
    }

    /// Resolves a master clock time to one frame index per stream and
    /// the auxiliary row.
    ///
    /// Every index is within range of its stream. A stream whose
    /// calibrated time falls before its first frame resolves to 0
    /// without affecting the others.
    pub fn resolve(&self, master_time: Timestamp) -> Resolution<K> {
        let since = Instant::now();

        let frames: IndexMap<K, usize> = self
            .streams
            .iter()
            .map(|(key, stream)| (key.clone(), resolve_one(key, stream, master_time)))
            .collect();
        let auxiliary_row = self.resolve_auxiliary(master_time);

        if let Some(budget) = self.resolve_budget {
            let elapsed = since.elapsed();
            if elapsed > budget {
                warn!(
                    "resolving time {} took {:?}, above the budget of {:?}",
                    master_time, elapsed, budget
                );
            }
        }

        Resolution {
            master_time,
            frames,
            auxiliary_row,
        }
    }
}

impl<K> Default for MultiStreamAligner<K>
where
    K: Key,
{
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_one<K: Key>(key: &K, stream: &AlignedStream, master_time: Timestamp) -> usize {
    let time = stream.calibration.apply(master_time);

    match stream.index.nearest_index(time) {
        Ok(index) => index,
        Err(err) => {
            debug!("clamp stream {:?} to its first frame: {}", key, err);
            0
        }
    }
}
