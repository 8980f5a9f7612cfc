use std::fmt;

use log::debug;

/// The 16 bytes that precede the license data of a game card dump.
pub const LICENSE_MARKER: [u8; 16] = [
    0xFF, 0xFF, 0x00, 0x01, 0x00, 0x01, 0x04, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Location of the license marker inside a PSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LicensePosition {
    marker_offset: u64,
}

impl LicensePosition {
    /// Creates a position from the raw offset of the marker.
    #[must_use]
    pub const fn from_marker_offset(marker_offset: u64) -> Self {
        Self { marker_offset }
    }

    /// Returns the offset of the first marker byte.
    #[must_use]
    pub const fn marker_offset(&self) -> u64 {
        self.marker_offset
    }

    /// Returns the offset of the data immediately following the marker.
    #[must_use]
    pub const fn data_offset(&self) -> u64 {
        self.marker_offset + LICENSE_MARKER.len() as u64
    }
}

impl fmt::Display for LicensePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.data_offset())
    }
}

/// Searches `data` for the first occurrence of [`LICENSE_MARKER`].
///
/// A marker at offset 0 is a match like any other.
#[must_use]
pub fn find_license(data: &[u8]) -> Option<LicensePosition> {
    let found = memchr::memmem::find(data, &LICENSE_MARKER)
        .map(|offset| LicensePosition::from_marker_offset(offset as u64));

    debug!("license marker scan over {} bytes: {:?}", data.len(), found);

    found
}
