//! Motion-capture trajectories sampled into fixed-width time buckets.
//!
//! A trajectory is looked up by integer division of the calibrated
//! master time by the bucket width, not by a timestamp search.

use crate::{
    error::{ensure_stream, Result},
    types::Timestamp,
};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<[f64; 3]> for Point3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

/// The trajectory of one tracked marker, one row per time bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryTable {
    label: String,
    rows: Vec<Point3>,
}

impl AuxiliaryTable {
    pub fn new<I>(label: impl Into<String>, rows: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Point3>,
    {
        let label = label.into();
        let rows: Vec<Point3> = rows.into_iter().map(Into::into).collect();
        ensure_stream!(!rows.is_empty(), "trajectory {label:?} has no rows");
        Ok(Self { label, rows })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false, a table holds at least one row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Point3> {
        self.rows.get(index)
    }

    /// Slices rows, truncating the range to the table.
    pub fn rows(&self, range: Range<usize>) -> &[Point3] {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        &self.rows[start..end]
    }

    /// The row holding `time` when every row spans `row_scale` time
    /// units, clamped to the table.
    pub fn bucket(&self, time: Timestamp, row_scale: Timestamp) -> usize {
        let row = time.div_euclid(row_scale.max(1));
        row.clamp(0, self.rows.len() as Timestamp - 1) as usize
    }
}

/// A motion-capture container that holds one trajectory per label.
pub trait TrajectorySource {
    fn labels(&self) -> &[String];

    /// Extracts the trajectory of the label at `label_index`.
    fn trajectory(&self, label_index: usize) -> Option<AuxiliaryTable>;
}

/// A [TrajectorySource] whose trajectories are already in memory.
#[derive(Debug, Clone, Default)]
pub struct TrajectorySet {
    labels: Vec<String>,
    trajectories: Vec<Vec<Point3>>,
}

impl TrajectorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<I>(&mut self, label: impl Into<String>, rows: I)
    where
        I: IntoIterator,
        I::Item: Into<Point3>,
    {
        self.labels.push(label.into());
        self.trajectories
            .push(rows.into_iter().map(Into::into).collect());
    }
}

impl TrajectorySource for TrajectorySet {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn trajectory(&self, label_index: usize) -> Option<AuxiliaryTable> {
        let label = self.labels.get(label_index)?;
        let rows = self.trajectories.get(label_index)?;
        AuxiliaryTable::new(label.clone(), rows.iter().copied()).ok()
    }
}
