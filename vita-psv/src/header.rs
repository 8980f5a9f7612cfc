use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Errors when reading a PSV header.
#[derive(Debug, snafu::Snafu)]
#[non_exhaustive]
pub enum ReadError {
    #[snafu(display("invalid PSV magic"))]
    InvalidMagic,

    #[snafu(display("PSV header is truncated ({len} bytes)"))]
    TooSmall { len: usize },
}

type Result<T, E = ReadError> = std::result::Result<T, E>;

pub const PSV_MAGIC: [u8; 3] = *b"PSV";

/// Size of a sector, the unit of the image offset field.
pub const SECTOR_SIZE: u64 = 512;

/// Number of leading bytes needed to read every field of [`PsvHeaderRaw`].
pub const HEADER_VIEW_SIZE: usize = size_of::<PsvHeaderRaw>();

/// The part of the PSV header this crate understands.
///
/// Everything between the magic and the image offset (version, flags, keys,
/// signature, digest and image size) is kept opaque.
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct PsvHeaderRaw {
    pub magic: [u8; 3],          // 0x00 - "PSV"
    pub opaque: [u8; 0x65],      // 0x03
    pub image_offset_sector: u8, // 0x68 - header length in sectors
}

/// Parsed PSV header information.
#[derive(Debug, Clone)]
#[must_use]
pub struct PsvHeader {
    raw_header: PsvHeaderRaw,
}

impl PsvHeader {
    /// Parses a PSV header from the leading bytes of a file.
    ///
    /// The magic is checked before the length so that a short file without
    /// the magic reports [`ReadError::InvalidMagic`].
    ///
    /// # Errors
    ///
    /// Returns an error if the magic does not match or the data ends before
    /// the image offset field.
    pub fn read(data: &[u8]) -> Result<Self> {
        snafu::ensure!(data.starts_with(&PSV_MAGIC), InvalidMagicSnafu);

        let (raw_header, _) = PsvHeaderRaw::read_from_prefix(data)
            .map_err(|_| TooSmallSnafu { len: data.len() }.build())?;

        Ok(Self { raw_header })
    }

    /// Returns the image offset in sectors, as stored at `0x68`.
    #[must_use]
    pub const fn image_offset_sector(&self) -> u8 {
        self.raw_header.image_offset_sector
    }

    /// Returns the header length in bytes.
    ///
    /// No range check is made here; a value past the end of the file is
    /// caught when the copy plan is built.
    #[must_use]
    pub const fn header_len(&self) -> u64 {
        self.raw_header.image_offset_sector as u64 * SECTOR_SIZE
    }

    /// Returns the raw header.
    #[must_use]
    pub const fn raw_header(&self) -> &PsvHeaderRaw {
        &self.raw_header
    }
}

impl fmt::Display for PsvHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sector(s), {} bytes",
            self.image_offset_sector(),
            self.header_len()
        )
    }
}
