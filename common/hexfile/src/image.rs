//! An addressable memory image assembled from Intel HEX records


use crate::record::Record;
use crate::{FILL_BYTE, HexFileError, HexFileResult};
use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;

/// A sparse memory image: sorted, non-overlapping, non-adjacent segments of
/// contiguous bytes, keyed by start address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    segments: BTreeMap<u32, Vec<u8>>,
    start_address: Option<u32>,
}

impl MemoryImage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse an Intel HEX file.
    pub fn load<P: AsRef<Path>>(path: P) -> HexFileResult<Self> {
        let path = path.as_ref();

        let text = fs::read_to_string(path)
            .map_err(|source| HexFileError::Open { path: path.display().to_string(), source })?;
        Self::from_ihex(&text)
    }

    /// Assemble an image from Intel HEX text, applying extended segment/linear
    /// address bases and recording the execution start address if one is given.
    pub fn from_ihex(text: &str) -> HexFileResult<Self> {
        let mut image = Self::new();
        let mut base = 0_u32;
        let mut eof = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if eof {
                return Err(HexFileError::RecordAfterEof(line.into()));
            }

            match line.parse::<Record>()? {
                Record::Data { address, data } => {
                    image.insert(base + u32::from(address), &data)?;
                }
                Record::EndOfFile => {
                    eof = true;
                }
                Record::ExtendedSegmentAddress(segment) => {
                    base = u32::from(segment) << 4;
                }
                Record::ExtendedLinearAddress(upper) => {
                    base = u32::from(upper) << 16;
                }
                Record::StartSegmentAddress { cs, ip } => {
                    image.start_address = Some((u32::from(cs) << 4) + u32::from(ip));
                }
                Record::StartLinearAddress(address) => {
                    image.start_address = Some(address);
                }
            }
        }

        log::debug!(
            "Parsed HEX image spanning [{:#07X}, {:#07X})",
            image.minimum_address().unwrap_or(0),
            image.maximum_address().unwrap_or(0)
        );

        Ok(image)
    }

    /// Add a contiguous run of bytes at the given address.
    ///
    /// Overlapping an existing segment is an error; a run that touches an
    /// existing segment is merged into it so that segments stay maximal.
    pub fn insert(&mut self, address: u32, data: &[u8]) -> HexFileResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = address + data.len() as u32;

        // Only the nearest segment on each side can overlap
        if let Some((&prev_start, prev_data)) = self.segments.range(..=address).next_back() {
            if prev_start + prev_data.len() as u32 > address {
                return Err(HexFileError::OverlappingData { address });
            }
        }
        if let Some((&next_start, _)) = self.segments.range(address..).next() {
            if next_start < end {
                return Err(HexFileError::OverlappingData { address: next_start });
            }
        }

        let mut start = address;
        if let Some((&prev_start, prev_data)) = self.segments.range(..address).next_back() {
            if prev_start + prev_data.len() as u32 == address {
                start = prev_start;
            }
        }

        let mut bytes = match self.segments.remove(&start) {
            Some(mut merged) => {
                merged.extend_from_slice(data);
                merged
            }
            None => data.to_vec(),
        };
        if let Some(next_data) = self.segments.remove(&end) {
            bytes.extend_from_slice(&next_data);
        }

        self.segments.insert(start, bytes);

        Ok(())
    }

    /// Lowest occupied address, or `None` for an empty image.
    #[must_use]
    pub fn minimum_address(&self) -> Option<u32> {
        self.segments.keys().next().copied()
    }

    /// One past the highest occupied address, or `None` for an empty image.
    #[must_use]
    pub fn maximum_address(&self) -> Option<u32> {
        self.segments.iter().next_back().map(|(&start, data)| start + data.len() as u32)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Execution start address from a type 03/05 record, if the file had one.
    #[must_use]
    pub fn start_address(&self) -> Option<u32> {
        self.start_address
    }

    /// Copy out an address range. Unoccupied addresses read as [`FILL_BYTE`].
    #[must_use]
    pub fn read(&self, range: Range<u32>) -> Vec<u8> {
        if range.is_empty() {
            return Vec::new();
        }

        let mut out = vec![FILL_BYTE; (range.end - range.start) as usize];
        for (&start, data) in self.segments.range(..range.end) {
            let end = start + data.len() as u32;
            if end <= range.start {
                continue;
            }

            let copy_start = start.max(range.start);
            let copy_end = end.min(range.end);
            out[(copy_start - range.start) as usize..(copy_end - range.start) as usize]
                .copy_from_slice(&data[(copy_start - start) as usize..(copy_end - start) as usize]);
        }

        out
    }

    /// Fill every gap between the minimum and maximum address with `value`,
    /// leaving a single contiguous segment.
    pub fn fill(&mut self, value: u8) {
        let (Some(min), Some(max)) = (self.minimum_address(), self.maximum_address()) else {
            return;
        };

        let mut merged = vec![value; (max - min) as usize];
        for (&start, data) in &self.segments {
            let offset = (start - min) as usize;
            merged[offset..offset + data.len()].copy_from_slice(data);
        }

        log::trace!("Filled image to single segment [{min:#07X}, {max:#07X})");

        self.segments = BTreeMap::from([(min, merged)]);
    }

    /// Discard all bytes whose address falls within `range`, splitting
    /// segments that straddle a boundary.
    pub fn exclude(&mut self, range: Range<u32>) {
        if range.is_empty() {
            return;
        }

        let mut remaining = BTreeMap::new();
        for (start, data) in std::mem::take(&mut self.segments) {
            let end = start + data.len() as u32;
            if end <= range.start || start >= range.end {
                remaining.insert(start, data);
                continue;
            }

            if start < range.start {
                remaining.insert(start, data[..(range.start - start) as usize].to_vec());
            }
            if end > range.end {
                remaining.insert(range.end, data[(range.end - start) as usize..].to_vec());
            }
        }

        self.segments = remaining;
    }

    /// Flatten to a byte vector starting at the minimum address, with any gaps
    /// filled by [`FILL_BYTE`].
    #[must_use]
    pub fn to_binary(&self) -> Vec<u8> {
        match (self.minimum_address(), self.maximum_address()) {
            (Some(min), Some(max)) => self.read(min..max),
            _ => Vec::new(),
        }
    }
}
