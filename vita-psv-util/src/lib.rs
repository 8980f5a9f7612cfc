//! Library for stripping license data from PlayStation Vita PSV files.
//!
//! This crate drives the layout knowledge of [`vita_psv`] against files on
//! disk: it validates an input dump, scans it for the license and writes a
//! copy with the header removed and the license regions zeroed.
//!
//! # Overview
//!
//! The main entry point is [`PatchEngine`], which takes a [`PatchProgress`]
//! implementation receiving human-readable status lines.
//!
//! # Example
//!
//! ```no_run
//! use vita_psv_util::{PatchEngine, SilentProgress};
//!
//! let mut engine = PatchEngine::new(SilentProgress, false);
//! engine.validate("game.psv").expect("not a strippable PSV file");
//! engine.patch("game.psv", "game_stripped.psv").expect("patching failed");
//! ```
//!
//! # Custom progress reporting
//!
//! Implement the [`PatchProgress`] trait to show status lines in a host UI.
//! [`PatchProgress::yield_now`] is called after every line so the host can
//! process pending events.

pub mod patch;
pub mod progress;

pub use self::patch::{
    CHUNK_SIZE, PatchEngine, PatchError, StripError, ValidateError, ValidatedPsv,
};
pub use self::progress::{MessageLog, PatchProgress, SilentProgress};

#[cfg(feature = "cli")]
pub use self::progress::ConsoleProgress;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const PSV_EXTENSION: &str = "psv";

/// Returns the default output path for `input`: `<stem>_stripped.psv` in the
/// same directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push("_stripped.");
    name.push(PSV_EXTENSION);
    input.with_file_name(name)
}

/// Appends `.psv` to `output` unless it already ends with it.
pub fn with_psv_extension(output: &Path) -> PathBuf {
    match output.extension() {
        Some(ext) if ext == PSV_EXTENSION => output.to_path_buf(),
        _ => {
            let mut name = output.as_os_str().to_owned();
            name.push(".");
            name.push(PSV_EXTENSION);
            PathBuf::from(name)
        }
    }
}
