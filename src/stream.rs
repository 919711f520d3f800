use crate::{
    error::{ensure_stream, Error, Result},
    types::{Timestamp, Timestamped},
};
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// A frame on a device clock. The handle is owned by whoever decodes
/// the image. Scanned directories use the file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<H = PathBuf> {
    pub timestamp: Timestamp,
    pub handle: H,
}

impl<H> Timestamped for Frame<H> {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Matches frame filenames of the form `<timestamp>.<extension>`,
/// where the timestamp is an optional minus sign followed by digits.
#[derive(Debug, Clone)]
pub struct FramePattern {
    extension: String,
    regex: Regex,
}

impl FramePattern {
    pub fn new(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_string();
        let regex = Regex::new(&format!(r"^(-?[0-9]+)\.{}$", regex::escape(&extension)))
            .expect("escaped frame pattern is always a valid regex");
        Self { extension, regex }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Extracts the timestamp token from a filename. Returns `None` if
    /// the name does not match or the token overflows.
    pub fn parse(&self, file_name: &str) -> Option<Timestamp> {
        let token = self.regex.captures(file_name)?.get(1)?.as_str();
        token.parse().ok()
    }

    /// Lists `(timestamp, path)` for every matching file in `dir`, in
    /// directory order.
    pub fn scan(&self, dir: &Path) -> Result<Vec<(Timestamp, PathBuf)>> {
        let mut matches = vec![];

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(timestamp) = file_name.to_str().and_then(|name| self.parse(name)) else {
                debug!("skip non-frame file {:?}", file_name);
                continue;
            };
            matches.push((timestamp, entry.path()));
        }

        if matches.is_empty() {
            return Err(Error::EmptyDirectory {
                dir: dir.to_path_buf(),
                pattern: self.as_str().to_string(),
            });
        }

        Ok(matches)
    }
}

impl Default for FramePattern {
    fn default() -> Self {
        Self::new("jpg")
    }
}

/// A sequence of items with strictly increasing timestamps.
#[derive(Debug, Clone)]
pub struct FrameStream<T = Frame>
where
    T: Timestamped,
{
    items: Vec<T>,
}

impl<T> FrameStream<T>
where
    T: Timestamped,
{
    /// Builds a stream from items already in timestamp order. Fails if
    /// fewer than two items are given or an item does not move the clock
    /// forward.
    pub fn new<I>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut stream = Self { items: vec![] };

        for item in items {
            let timestamp = item.timestamp();
            if stream.try_push(item).is_err() {
                return Err(Error::InvalidStream(format!(
                    "timestamp {} does not follow {}",
                    timestamp,
                    stream.items.last().map(|last| last.timestamp()).unwrap_or_default()
                )));
            }
        }

        ensure_stream!(
            stream.items.len() >= 2,
            "a stream needs at least two frames, got {}",
            stream.items.len()
        );

        Ok(stream)
    }

    /// Try to append an item.
    ///
    /// If the timestamp on the item is not above that of the previously
    /// inserted item, the item is handed back.
    fn try_push(&mut self, item: T) -> Result<(), T> {
        let timestamp = item.timestamp();

        match self.items.last() {
            Some(last) if last.timestamp() >= timestamp => return Err(item),
            _ => {}
        }

        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.items.iter().map(|item| item.timestamp())
    }
}

impl FrameStream<Frame> {
    /// Scans `dir` for frames named after their timestamp and orders
    /// them by time.
    pub fn scan_dir(dir: &Path, pattern: &FramePattern) -> Result<Self> {
        let mut frames = pattern.scan(dir)?;
        frames.sort_by_key(|(timestamp, _)| *timestamp);

        Self::new(
            frames
                .into_iter()
                .map(|(timestamp, handle)| Frame { timestamp, handle }),
        )
    }
}

impl<'a, T> IntoIterator for &'a FrameStream<T>
where
    T: Timestamped,
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
