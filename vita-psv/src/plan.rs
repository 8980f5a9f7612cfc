//! Copy plan for stripping a PSV file.
//!
//! The payload following the PSV header is copied to the output in a fixed
//! sequence of segments. Some segments are copied verbatim, others are read
//! and replaced with zeros so input and output stay in step.
//!
//! ```text
//! input:  | header | unknown-pre | UNK | ... | KEY | gap | SIGNATURE | rest |
//! output:          | copy        | 0   | copy| 0   | copy| 0         | copy |
//! ```

use std::fmt;
use std::ops::Range;

use log::debug;
use snafu::{OptionExt, Snafu, ensure};

use crate::license::LicensePosition;

/// Distance from the start of the payload to the unknown region.
pub const UNKNOWN_OFFSET: u64 = 0x1C00;
/// Length of the unknown region.
pub const UNKNOWN_LEN: u64 = 0x260;
/// Distance from the license data to the license key.
pub const LICENSE_KEY_OFFSET: u64 = 0x40;
/// Length of the license key.
pub const LICENSE_KEY_LEN: u64 = 0x10;
/// Bytes kept between the license key and the license signature.
pub const LICENSE_SIGNATURE_GAP: u64 = 0x50;
/// Length of the license signature.
pub const LICENSE_SIGNATURE_LEN: u64 = 0x160;

/// Number of segments in every plan.
pub const SEGMENT_COUNT: usize = 7;

/// Errors when a plan does not fit inside the file.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum PlanError {
    #[snafu(display("header length {header_len:#X} exceeds file size {file_size:#X}"))]
    HeaderPastEnd { header_len: u64, file_size: u64 },

    #[snafu(display(
        "license key at {key_offset:#X} lies before the read position {cursor:#X}"
    ))]
    LicenseBeforeCursor { key_offset: u64, cursor: u64 },

    #[snafu(display("segment {segment} ends at {end:#X}, past file size {file_size:#X}"))]
    SegmentPastEnd {
        segment: usize,
        end: u64,
        file_size: u64,
    },

    #[snafu(display("offset arithmetic overflowed"))]
    Overflow,
}

type Result<T, E = PlanError> = std::result::Result<T, E>;

/// What happens to the bytes of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Bytes are written to the output unchanged.
    Copy,
    /// Bytes are consumed from the input and zeros are written instead.
    Zero,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => f.write_str("copy"),
            Self::Zero => f.write_str("zero"),
        }
    }
}

/// A contiguous run of input bytes and what to do with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    kind: SegmentKind,
    input_offset: u64,
    len: u64,
}

impl Segment {
    /// Creates a segment of `len` bytes starting at `input_offset`.
    #[must_use]
    pub const fn new(kind: SegmentKind, input_offset: u64, len: u64) -> Self {
        Self {
            kind,
            input_offset,
            len,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Offset of the first byte in the input file.
    #[must_use]
    pub const fn input_offset(&self) -> u64 {
        self.input_offset
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn input_range(&self) -> Range<u64> {
        self.input_offset..self.input_offset + self.len
    }
}

/// The ordered segments that turn a PSV file into its stripped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CopyPlan {
    file_size: u64,
    header_len: u64,
    segments: [Segment; SEGMENT_COUNT],
}

impl CopyPlan {
    /// Builds the plan for a file of `file_size` bytes.
    ///
    /// Every segment length is derived from the read position left by the
    /// previous segments, so the segments only make sense in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the header, the license or any segment falls
    /// outside the file.
    pub fn new(file_size: u64, header_len: u64, license: LicensePosition) -> Result<Self> {
        ensure!(
            header_len <= file_size,
            HeaderPastEndSnafu {
                header_len,
                file_size
            }
        );

        let mut builder = PlanBuilder {
            file_size,
            cursor: header_len,
            segments: Vec::with_capacity(SEGMENT_COUNT),
        };

        // Unknown region.
        builder.push(SegmentKind::Copy, UNKNOWN_OFFSET)?;
        builder.push(SegmentKind::Zero, UNKNOWN_LEN)?;

        // License key.
        let key_offset = license
            .data_offset()
            .checked_add(LICENSE_KEY_OFFSET)
            .context(OverflowSnafu)?;
        builder.push_until(SegmentKind::Copy, key_offset)?;
        builder.push(SegmentKind::Zero, LICENSE_KEY_LEN)?;

        // License signature.
        builder.push(SegmentKind::Copy, LICENSE_SIGNATURE_GAP)?;
        builder.push(SegmentKind::Zero, LICENSE_SIGNATURE_LEN)?;

        // Everything else.
        builder.push_until(SegmentKind::Copy, file_size)?;

        let segments: [Segment; SEGMENT_COUNT] = builder
            .segments
            .try_into()
            .map_err(|_| OverflowSnafu.build())?;

        let plan = Self {
            file_size,
            header_len,
            segments,
        };

        for (i, segment) in plan.segments.iter().enumerate() {
            debug!(
                "segment {}: {} {:#X} bytes at {:#X}",
                i + 1,
                segment.kind,
                segment.len,
                segment.input_offset
            );
        }

        Ok(plan)
    }

    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of leading input bytes that are not written to the output.
    #[must_use]
    pub const fn header_len(&self) -> u64 {
        self.header_len
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total number of bytes the plan writes.
    #[must_use]
    pub fn output_len(&self) -> u64 {
        self.segments.iter().map(Segment::len).sum()
    }

    /// Maps a segment to its byte range in the output file.
    #[must_use]
    pub fn output_range(&self, segment: &Segment) -> Range<u64> {
        let start = segment.input_offset - self.header_len;
        start..start + segment.len
    }

    /// Output ranges that are filled with zeros.
    pub fn zeroed_ranges(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Zero)
            .map(|s| self.output_range(s))
    }
}

struct PlanBuilder {
    file_size: u64,
    cursor: u64,
    segments: Vec<Segment>,
}

impl PlanBuilder {
    fn push(&mut self, kind: SegmentKind, len: u64) -> Result<()> {
        let end = self.cursor.checked_add(len).context(OverflowSnafu)?;

        ensure!(
            end <= self.file_size,
            SegmentPastEndSnafu {
                segment: self.segments.len() + 1,
                end,
                file_size: self.file_size,
            }
        );

        self.segments.push(Segment::new(kind, self.cursor, len));
        self.cursor = end;

        Ok(())
    }

    fn push_until(&mut self, kind: SegmentKind, end: u64) -> Result<()> {
        ensure!(
            end >= self.cursor,
            LicenseBeforeCursorSnafu {
                key_offset: end,
                cursor: self.cursor,
            }
        );

        self.push(kind, end - self.cursor)
    }
}
