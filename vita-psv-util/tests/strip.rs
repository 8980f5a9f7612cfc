//! End-to-end tests stripping synthetic PSV files on disk.

use std::cell::RefCell;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vita_psv::LICENSE_MARKER;
use vita_psv_util::{
    MessageLog, PatchEngine, PatchError, PatchProgress, SilentProgress, ValidateError,
};

const FILE_SIZE: usize = 0x3000;
const HEADER_LEN: usize = 512;

/// Builds a PSV image whose payload bytes are never zero, so zeroed regions
/// stand out.
fn psv_image(size: usize, sectors: u8, marker_offset: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..size).map(|i| (i % 253) as u8 | 0x80).collect();
    data[..3].copy_from_slice(b"PSV");
    data[0x68] = sectors;
    data[marker_offset..marker_offset + LICENSE_MARKER.len()].copy_from_slice(&LICENSE_MARKER);
    data
}

fn write_input(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, data).unwrap();
    path
}

/// Expected output: the input shifted by the header with `zeroed` output
/// ranges cleared.
fn expected_output(input: &[u8], header_len: usize, zeroed: &[Range<usize>]) -> Vec<u8> {
    let mut expected = input[header_len..].to_vec();
    for range in zeroed {
        expected[range.clone()].fill(0);
    }
    expected
}

fn strip(input: &Path, output: &Path) -> u64 {
    let mut engine = PatchEngine::new(SilentProgress, true);
    engine.validate(input).unwrap();
    engine.patch(input, output).unwrap()
}

#[test]
fn strips_synthetic_image() {
    let dir = tempfile::tempdir().unwrap();
    let data = psv_image(FILE_SIZE, 1, 0x2400);
    let input = write_input(&dir, "game.psv", &data);
    let output = dir.path().join("stripped.psv");

    let written = strip(&input, &output);
    let result = fs::read(&output).unwrap();

    assert_eq!(written, (FILE_SIZE - HEADER_LEN) as u64);
    assert_eq!(result.len(), FILE_SIZE - HEADER_LEN);

    // License data starts at 0x2410 in the input, 0x2210 in the output.
    let zeroed = [0x1C00..0x1E60, 0x2250..0x2260, 0x22B0..0x2410];
    for range in &zeroed {
        assert!(result[range.clone()].iter().all(|&b| b == 0), "{range:X?} not zeroed");
    }

    assert_eq!(result, expected_output(&data, HEADER_LEN, &zeroed));
}

#[test]
fn output_is_input_shifted_by_header() {
    let dir = tempfile::tempdir().unwrap();
    let data = psv_image(0x8000, 4, 0x5000);
    let input = write_input(&dir, "game.psv", &data);
    let output = dir.path().join("stripped.psv");

    strip(&input, &output);
    let result = fs::read(&output).unwrap();
    let header_len = 4 * 512;

    let mut engine = PatchEngine::new(SilentProgress, true);
    let zeroed: Vec<Range<usize>> = engine
        .validate(&input)
        .unwrap()
        .plan()
        .zeroed_ranges()
        .map(|r| r.start as usize..r.end as usize)
        .collect();

    for (offset, &byte) in result.iter().enumerate() {
        if zeroed.iter().any(|r| r.contains(&offset)) {
            assert_eq!(byte, 0, "output offset {offset:#X}");
        } else {
            assert_eq!(byte, data[offset + header_len], "output offset {offset:#X}");
        }
    }
}

#[test]
fn small_chunks_match_default_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let data = psv_image(FILE_SIZE, 1, 0x2400);
    let input = write_input(&dir, "game.psv", &data);
    let default_out = dir.path().join("default.psv");
    let chunked_out = dir.path().join("chunked.psv");

    strip(&input, &default_out);

    // 0x3E7 divides none of the segment lengths.
    let mut engine = PatchEngine::new(SilentProgress, true).with_chunk_size(0x3E7);
    engine.validate(&input).unwrap();
    engine.patch(&input, &chunked_out).unwrap();

    assert_eq!(fs::read(&default_out).unwrap(), fs::read(&chunked_out).unwrap());
}

#[test]
fn patching_twice_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "game.psv", &psv_image(FILE_SIZE, 1, 0x2400));
    let output = dir.path().join("stripped.psv");

    let mut engine = PatchEngine::new(SilentProgress, true);
    engine.validate(&input).unwrap();

    engine.patch(&input, &output).unwrap();
    let first = fs::read(&output).unwrap();

    engine.patch(&input, &output).unwrap();
    let second = fs::read(&output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn zero_length_header_keeps_magic() {
    let dir = tempfile::tempdir().unwrap();
    let data = psv_image(FILE_SIZE, 0, 0x2400);
    let input = write_input(&dir, "game.psv", &data);
    let output = dir.path().join("stripped.psv");

    assert_eq!(strip(&input, &output), FILE_SIZE as u64);
    let result = fs::read(&output).unwrap();

    assert_eq!(&result[..3], b"PSV");
    assert_eq!(
        result,
        expected_output(&data, 0, &[0x1C00..0x1E60, 0x2450..0x2460, 0x24B0..0x2610])
    );
}

#[test]
fn strip_reports_every_milestone() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "game.psv", &psv_image(FILE_SIZE, 1, 0x2400));
    let output = dir.path().join("stripped.psv");

    let log = MessageLog::new();
    let mut engine = PatchEngine::new(&log, true);
    engine.strip(&input, &output).unwrap();

    assert_eq!(
        log.lines(),
        [
            "PSV header found in input file...",
            "PSV header length found to be: 512 bytes",
            "Scanning input for license file. Please wait...",
            "License found at position: 0x2410",
            "Writing output file. Please wait...",
            "File written!",
        ]
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Clear,
    Message(String),
    Yield,
    Started(u64),
    Bytes(u64),
    Completed,
}

/// Records every progress callback in order.
#[derive(Default)]
struct EventLog {
    events: RefCell<Vec<Event>>,
}

impl PatchProgress for EventLog {
    fn message(&self, line: &str) {
        self.events.borrow_mut().push(Event::Message(line.to_owned()));
    }

    fn yield_now(&self) {
        self.events.borrow_mut().push(Event::Yield);
    }

    fn clear(&self) {
        self.events.borrow_mut().push(Event::Clear);
    }

    fn write_started(&self, total: u64) {
        self.events.borrow_mut().push(Event::Started(total));
    }

    fn bytes_written(&self, written: u64) {
        self.events.borrow_mut().push(Event::Bytes(written));
    }

    fn write_completed(&self) {
        self.events.borrow_mut().push(Event::Completed);
    }
}

#[test]
fn every_message_is_followed_by_a_yield() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "game.psv", &psv_image(FILE_SIZE, 1, 0x2400));
    let output = dir.path().join("stripped.psv");

    let events = EventLog::default();
    let mut engine = PatchEngine::new(&events, true).with_chunk_size(0x400);
    engine.strip(&input, &output).unwrap();
    drop(engine);

    let events = events.events.into_inner();
    let expected_len = (FILE_SIZE - HEADER_LEN) as u64;

    let messages = events
        .iter()
        .filter(|e| matches!(e, Event::Message(_)))
        .count();
    assert_eq!(messages, 6);

    for (i, event) in events.iter().enumerate() {
        if let Event::Message(line) = event {
            assert_eq!(events.get(i + 1), Some(&Event::Yield), "after {line:?}");
        }
    }

    let started = events.iter().position(|e| *e == Event::Started(expected_len));
    let completed = events.iter().position(|e| *e == Event::Completed);
    let (started, completed) = (started.unwrap(), completed.unwrap());
    assert!(started < completed);

    let bytes: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Bytes(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert!(bytes.iter().all(|&n| n > 0 && n <= 0x400));
    assert_eq!(bytes.iter().sum::<u64>(), expected_len);

    // Chunk reports only happen between start and completion.
    assert!(events[..started].iter().all(|e| !matches!(e, Event::Bytes(_))));
    assert!(events[completed..].iter().all(|e| !matches!(e, Event::Bytes(_))));
}

#[test]
fn failed_validation_yields_after_its_message() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "game.psv", b"PKG not a psv");

    let events = EventLog::default();
    let mut engine = PatchEngine::new(&events, true);
    engine.validate(&input).unwrap_err();
    drop(engine);

    let events = events.events.into_inner();
    assert!(matches!(
        events.as_slice(),
        [Event::Clear, Event::Clear, Event::Message(_), Event::Yield]
    ));
}

#[test]
fn empty_path_is_invalid_input() {
    let mut engine = PatchEngine::new(MessageLog::new(), true);
    let err = engine.validate("").unwrap_err();

    assert!(matches!(err, ValidateError::InvalidInput));
    assert_eq!(engine.progress().lines(), ["input path is empty"]);
}

#[test]
fn missing_file_and_directory_are_not_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = PatchEngine::new(SilentProgress, true);

    let err = engine.validate(dir.path().join("missing.psv")).unwrap_err();
    assert!(matches!(err, ValidateError::NotAFile { .. }));

    let err = engine.validate(dir.path()).unwrap_err();
    assert!(matches!(err, ValidateError::NotAFile { .. }));
}

#[test]
fn missing_magic_creates_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = psv_image(FILE_SIZE, 1, 0x2400);
    data[..3].copy_from_slice(b"PKG");
    let input = write_input(&dir, "game.psv", &data);
    let output = dir.path().join("stripped.psv");

    let mut engine = PatchEngine::new(SilentProgress, true);
    let err = engine.strip(&input, &output).unwrap_err();

    assert!(matches!(
        err,
        vita_psv_util::StripError::Validate {
            source: ValidateError::NotAPsvFile { .. }
        }
    ));
    assert!(!output.exists());
}

#[test]
fn missing_license_creates_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = psv_image(FILE_SIZE, 1, 0x2400);
    data[0x240F] = 0x01;
    let input = write_input(&dir, "game.psv", &data);
    let output = dir.path().join("stripped.psv");

    let mut engine = PatchEngine::new(SilentProgress, true);
    let err = engine.strip(&input, &output).unwrap_err();

    assert!(matches!(
        err,
        vita_psv_util::StripError::Validate {
            source: ValidateError::LicenseNotFound { .. }
        }
    ));
    assert!(!output.exists());
}

#[test]
fn license_inside_first_segment_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "game.psv", &psv_image(FILE_SIZE, 1, 0x800));
    let output = dir.path().join("stripped.psv");

    let mut engine = PatchEngine::new(SilentProgress, true);
    let err = engine.validate(&input).unwrap_err();
    assert!(matches!(err, ValidateError::OutOfRange { .. }));

    let err = engine.patch(&input, &output).unwrap_err();
    assert!(matches!(err, PatchError::NotValidated { .. }));
    assert!(!output.exists());
}

#[test]
fn header_past_end_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "game.psv", &psv_image(FILE_SIZE, 0xFF, 0x2400));

    let mut engine = PatchEngine::new(SilentProgress, true);
    let err = engine.validate(&input).unwrap_err();
    assert!(matches!(err, ValidateError::OutOfRange { .. }));
}

#[test]
fn input_shrunk_after_validation_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = psv_image(FILE_SIZE, 1, 0x2400);
    let input = write_input(&dir, "game.psv", &data);
    let output = dir.path().join("stripped.psv");

    let mut engine = PatchEngine::new(SilentProgress, true);
    engine.validate(&input).unwrap();

    fs::write(&input, &data[..0x2800]).unwrap();

    let err = engine.patch(&input, &output).unwrap_err();
    assert!(matches!(err, PatchError::ReadFailed { .. }));
    // Partial output is left in place.
    assert!(output.exists());
}
