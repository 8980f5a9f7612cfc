mod error;

pub use self::error::{PatchError, StripError, ValidateError};

use self::error::*;
use crate::progress::PatchProgress;
use log::{debug, trace};
use snafu::{OptionExt, ResultExt, ensure};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use vita_psv::header::{HEADER_VIEW_SIZE, ReadError};
use vita_psv::{CopyPlan, LicensePosition, PsvHeader, Segment, SegmentKind};

/// Default size of the buffer used to stream segments.
pub const CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Facts about an input file gathered by [`PatchEngine::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedPsv {
    path: PathBuf,
    header: PsvHeader,
    license: LicensePosition,
    plan: CopyPlan,
}

impl ValidatedPsv {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the input file at validation time.
    pub fn file_size(&self) -> u64 {
        self.plan.file_size()
    }

    pub fn header(&self) -> &PsvHeader {
        &self.header
    }

    pub fn header_len(&self) -> u64 {
        self.header.header_len()
    }

    pub fn license(&self) -> LicensePosition {
        self.license
    }

    pub fn plan(&self) -> &CopyPlan {
        &self.plan
    }
}

/// Strips license data from PSV files.
///
/// An engine runs one operation at a time: [`validate`](Self::validate)
/// records what it learns about the input, and [`patch`](Self::patch) uses
/// that record to write the output.
pub struct PatchEngine<P: PatchProgress> {
    progress: P,
    overwrite: bool,
    chunk_size: usize,
    validated: Option<ValidatedPsv>,
}

impl<P: PatchProgress> PatchEngine<P> {
    /// Creates a new engine reporting to `progress`.
    ///
    /// If `overwrite` is `true`, an existing output file is replaced.
    /// Otherwise, patching fails if the output file already exists.
    pub fn new(progress: P, overwrite: bool) -> Self {
        Self {
            progress,
            overwrite,
            chunk_size: CHUNK_SIZE,
            validated: None,
        }
    }

    /// Sets the size of the copy buffer. Values below 1 are raised to 1.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    /// Returns the result of the last successful validation, if any.
    pub fn validated(&self) -> Option<&ValidatedPsv> {
        self.validated.as_ref()
    }

    /// Checks that `input` is a PSV file with a license and records its
    /// header length, license position and copy plan.
    ///
    /// On failure the reason is also reported to the progress sink and any
    /// earlier validation is forgotten.
    pub fn validate(
        &mut self,
        input: impl AsRef<Path>,
    ) -> Result<&ValidatedPsv, ValidateError> {
        self.validated = None;
        self.progress.clear();

        match self.read_properties(input.as_ref()) {
            Ok(validated) => Ok(&*self.validated.insert(validated)),
            Err(e) => {
                debug!("validation failed: {e:?}");
                self.progress.clear();
                self.report(&e.to_string());
                Err(e)
            }
        }
    }

    /// Writes the stripped copy of `input` to `output`.
    ///
    /// `input` must have been validated by this engine. Returns the number
    /// of bytes written.
    pub fn patch(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<u64, PatchError> {
        let input = input.as_ref();
        let output = output.as_ref();

        let validated = self
            .validated
            .as_ref()
            .filter(|v| v.path == input)
            .context(NotValidatedSnafu { path: input })?;

        // Identity, not path: a hard link to the input must not be truncated.
        ensure!(
            !same_file::is_same_file(input, output).unwrap_or(false),
            SameFileSnafu { path: output }
        );

        self.report("Writing output file. Please wait...");

        let written = self.write_output(&validated.plan, input, output)?;

        self.report("File written!");

        Ok(written)
    }

    /// Validates `input` and writes the stripped copy to `output`.
    pub fn strip(
        &mut self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<u64, StripError> {
        let input = input.as_ref();
        self.validate(input).context(ValidateSnafu)?;
        self.patch(input, output).context(PatchSnafu)
    }

    fn report(&self, line: &str) {
        self.progress.message(line);
        self.progress.yield_now();
    }

    fn read_properties(&self, path: &Path) -> Result<ValidatedPsv, ValidateError> {
        ensure!(!path.as_os_str().is_empty(), InvalidInputSnafu);
        ensure!(path.is_file(), NotAFileSnafu { path });

        let file = File::open(path).context(OpenFailedSnafu { path })?;
        let file_size = file.metadata().context(MetadataFailedSnafu { path })?.len();

        let mut prefix = Vec::with_capacity(HEADER_VIEW_SIZE);
        (&file)
            .take(HEADER_VIEW_SIZE as u64)
            .read_to_end(&mut prefix)
            .context(ReadHeaderFailedSnafu { path })?;

        let header = match PsvHeader::read(&prefix) {
            Ok(header) => header,
            Err(ReadError::InvalidMagic) => return NotAPsvFileSnafu { path }.fail(),
            Err(e) => return Err(e).context(TruncatedHeaderSnafu { path }),
        };

        self.report("PSV header found in input file...");
        self.report(&format!(
            "PSV header length found to be: {} bytes",
            header.header_len()
        ));

        self.report("Scanning input for license file. Please wait...");

        let license = scan_license(&file, path)?;

        self.report(&format!(
            "License found at position: {:#x}",
            license.data_offset()
        ));

        let plan = CopyPlan::new(file_size, header.header_len(), license)
            .context(OutOfRangeSnafu { path })?;

        Ok(ValidatedPsv {
            path: path.to_path_buf(),
            header,
            license,
            plan,
        })
    }

    fn write_output(
        &self,
        plan: &CopyPlan,
        input: &Path,
        output: &Path,
    ) -> Result<u64, PatchError> {
        let mut src = File::open(input).context(OpenInputFailedSnafu { path: input })?;

        let mut opts = OpenOptions::new();
        opts.write(true);

        if self.overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }

        let dest = match opts.open(output) {
            Ok(dest) => dest,
            Err(e) if e.kind() == ErrorKind::AlreadyExists && !self.overwrite => {
                return OutputExistsSnafu { path: output }.fail();
            }
            Err(e) => return Err(e).context(CreateOutputFailedSnafu { path: output }),
        };

        src.seek(SeekFrom::Start(plan.header_len()))
            .context(SeekFailedSnafu { path: input })?;

        let buffer_len = usize::try_from(plan.output_len())
            .map_or(self.chunk_size, |len| len.min(self.chunk_size));

        let mut writer = SegmentWriter {
            src,
            dest,
            input,
            output,
            buffer: vec![0u8; buffer_len],
            progress: &self.progress,
        };

        self.progress.write_started(plan.output_len());

        let mut written = 0u64;

        for segment in plan.segments() {
            written += writer.write_segment(segment)?;
        }

        writer
            .dest
            .flush()
            .context(WriteFailedSnafu { path: output })?;

        self.progress.write_completed();

        Ok(written)
    }
}

/// Finds the license in the whole of `file` through a memory map.
fn scan_license(file: &File, path: &Path) -> Result<LicensePosition, ValidateError> {
    // SAFETY: the map is dropped before this function returns and is only
    // read. A concurrent truncation of the file is outside our control.
    let map = unsafe { memmap2::Mmap::map(file).context(MmapFailedSnafu { path })? };

    vita_psv::find_license(&map).context(LicenseNotFoundSnafu { path })
}

/// Streams segments from the input to the output in bounded chunks.
struct SegmentWriter<'a, P: PatchProgress> {
    src: File,
    dest: File,
    input: &'a Path,
    output: &'a Path,
    buffer: Vec<u8>,
    progress: &'a P,
}

impl<P: PatchProgress> SegmentWriter<'_, P> {
    fn write_segment(&mut self, segment: &Segment) -> Result<u64, PatchError> {
        let mut remaining = segment.len();
        let mut offset = segment.input_offset();

        while remaining > 0 {
            let chunk = usize::try_from(remaining)
                .map_or(self.buffer.len(), |r| r.min(self.buffer.len()));
            let data = &mut self.buffer[..chunk];

            // Zeroed bytes are still read so both files advance together.
            self.src.read_exact(data).context(ReadFailedSnafu {
                path: self.input,
                offset,
            })?;

            if segment.kind() == SegmentKind::Zero {
                data.fill(0);
            }

            self.dest
                .write_all(data)
                .context(WriteFailedSnafu { path: self.output })?;

            trace!("{} {:#X} bytes at {:#X}", segment.kind(), chunk, offset);

            self.progress.bytes_written(chunk as u64);
            remaining -= chunk as u64;
            offset += chunk as u64;
        }

        Ok(segment.len())
    }
}
