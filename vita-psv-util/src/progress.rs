use std::cell::RefCell;

/// Trait for receiving status updates from a [`PatchEngine`](crate::PatchEngine).
///
/// Every method has a no-op default, so hosts only implement what they
/// display.
pub trait PatchProgress {
    /// Called with each human-readable status line.
    fn message(&self, _line: &str) {}

    /// Called after every [`message`](Self::message).
    ///
    /// Hosts driving an event loop should pump pending events here so a long
    /// scan or copy does not freeze the display.
    fn yield_now(&self) {}

    /// Called when the status display should be emptied, at the start of a
    /// validation and before a validation failure is reported.
    fn clear(&self) {}

    /// Called when the output file is about to be written.
    fn write_started(&self, _total: u64) {}

    /// Called after each chunk written to the output file.
    fn bytes_written(&self, _written: u64) {}

    /// Called when the output file has been fully written.
    fn write_completed(&self) {}
}

impl<P: PatchProgress + ?Sized> PatchProgress for &P {
    fn message(&self, line: &str) {
        (**self).message(line);
    }

    fn yield_now(&self) {
        (**self).yield_now();
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn write_started(&self, total: u64) {
        (**self).write_started(total);
    }

    fn bytes_written(&self, written: u64) {
        (**self).bytes_written(written);
    }

    fn write_completed(&self) {
        (**self).write_completed();
    }
}

/// A no-op progress implementation that discards all updates.
pub struct SilentProgress;

impl PatchProgress for SilentProgress {}

/// Collects status lines in memory, the way a status text box would.
#[derive(Debug, Default)]
pub struct MessageLog {
    lines: RefCell<Vec<String>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the lines currently held.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_inner()
    }
}

impl PatchProgress for MessageLog {
    fn message(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_owned());
    }

    fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

/// Console progress reporter.
///
/// Status lines go to stdout; the output file write is shown as an
/// indicatif byte progress bar on stderr.
#[cfg(feature = "cli")]
pub struct ConsoleProgress {
    write_bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            write_bar: indicatif::ProgressBar::hidden(),
        }
    }
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl PatchProgress for ConsoleProgress {
    fn message(&self, line: &str) {
        self.write_bar.suspend(|| println!("{}", line));
    }

    fn write_started(&self, total: u64) {
        self.write_bar
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.write_bar.set_length(total);
        self.write_bar.set_position(0);
        self.write_bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {bytes}/{total_bytes} [{elapsed_precise}]")
                .unwrap()
                .progress_chars("━╸─"),
        );
        self.write_bar.reset();
    }

    fn bytes_written(&self, written: u64) {
        self.write_bar.inc(written);
    }

    fn write_completed(&self) {
        self.write_bar.finish_and_clear();
    }
}
