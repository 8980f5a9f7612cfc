use snafu::Snafu;
use std::path::PathBuf;

/// Errors that can occur while validating an input PSV file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum ValidateError {
    #[snafu(display("input path is empty"))]
    InvalidInput,

    #[snafu(display("{} is not an existing file", path.display()))]
    NotAFile { path: PathBuf },

    #[snafu(display("cannot open {}: {source}", path.display()))]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot read metadata of {}: {source}", path.display()))]
    MetadataFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot read header of {}: {source}", path.display()))]
    ReadHeaderFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{} is not a valid PSV file", path.display()))]
    NotAPsvFile { path: PathBuf },

    #[snafu(display("{} is not a valid PSV file: {source}", path.display()))]
    TruncatedHeader {
        path: PathBuf,
        source: vita_psv::header::ReadError,
    },

    #[snafu(display("cannot memory map {}: {source}", path.display()))]
    MmapFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("no license found in {}", path.display()))]
    LicenseNotFound { path: PathBuf },

    #[snafu(display("{} does not match the license layout: {source}", path.display()))]
    OutOfRange {
        path: PathBuf,
        source: vita_psv::PlanError,
    },
}

/// Errors that can occur while writing a stripped PSV file.
///
/// Any error after the output file was created may leave a partial file
/// behind; it is not removed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum PatchError {
    #[snafu(display("{} has not been validated", path.display()))]
    NotValidated { path: PathBuf },

    #[snafu(display("output {} is the input file", path.display()))]
    SameFile { path: PathBuf },

    #[snafu(display("output {} already exists", path.display()))]
    OutputExists { path: PathBuf },

    #[snafu(display("cannot open {}: {source}", path.display()))]
    OpenInputFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot create file {}: {source}", path.display()))]
    CreateOutputFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot seek past header of {}: {source}", path.display()))]
    SeekFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot read {} at {offset:#X}: {source}", path.display()))]
    ReadFailed {
        path: PathBuf,
        offset: u64,
        source: std::io::Error,
    },

    #[snafu(display("cannot write to {}: {source}", path.display()))]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from [`PatchEngine::strip`](super::PatchEngine::strip).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum StripError {
    #[snafu(display("validation failed: {source}"))]
    Validate { source: ValidateError },

    #[snafu(display("patching failed: {source}"))]
    Patch { source: PatchError },
}
