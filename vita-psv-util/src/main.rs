mod cli;

use clap::Parser;
use cli::{Cli, Command};
use snafu::{ResultExt, Snafu};
use std::path::{Path, PathBuf};
use vita_psv_util::{ConsoleProgress, PatchEngine, SilentProgress};

/// Top-level application errors for vita-psv-util.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to strip '{}'", path.display()))]
    Strip {
        path: PathBuf,
        source: vita_psv_util::StripError,
    },

    #[snafu(display("failed to read '{}'", path.display()))]
    Inspect {
        path: PathBuf,
        source: vita_psv_util::ValidateError,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[snafu::report]
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Strip {
            psv_path,
            output,
            force,
            quiet,
        } => cmd_strip(&psv_path, output.as_deref(), force, quiet),
        Command::Info { psv_path } => cmd_info(&psv_path),
    }
}

fn cmd_strip(path: &Path, output: Option<&Path>, force: bool, quiet: bool) -> Result<()> {
    let output = match output {
        Some(output) => vita_psv_util::with_psv_extension(output),
        None => vita_psv_util::default_output_path(path),
    };

    if !quiet {
        println!("Stripping {} to {}...", path.display(), output.display());
    }

    let start = std::time::Instant::now();

    let written = if quiet {
        let mut engine = PatchEngine::new(SilentProgress, force);
        engine.strip(path, &output).context(StripSnafu { path })?
    } else {
        let mut engine = PatchEngine::new(ConsoleProgress::new(), force);
        engine.strip(path, &output).context(StripSnafu { path })?
    };

    if !quiet {
        println!(
            "Done in {:.2}s ({} bytes written).",
            start.elapsed().as_secs_f64(),
            written
        );
    }

    Ok(())
}

fn cmd_info(path: &Path) -> Result<()> {
    let mut engine = PatchEngine::new(SilentProgress, false);
    let psv = engine.validate(path).context(InspectSnafu { path })?;
    let plan = psv.plan();

    println!("PSV: {}", path.display());
    println!();
    println!("File Size:      {} bytes", psv.file_size());
    println!("Header:         {}", psv.header());
    println!("Marker Offset:  0x{:X}", psv.license().marker_offset());
    println!("License Offset: {}", psv.license());
    println!("Output Size:    {} bytes", plan.output_len());
    println!();
    println!("{:>3}  {:<4}  {:>10}  {:>10}  {:>10}", "#", "Op", "Input", "Output", "Length");
    println!("{:-<3}  {:-<4}  {:-<10}  {:-<10}  {:-<10}", "", "", "", "", "");

    for (index, segment) in plan.segments().iter().enumerate() {
        println!(
            "{:>3}  {:<4}  0x{:08X}  0x{:08X}  0x{:08X}",
            index + 1,
            segment.kind().to_string(),
            segment.input_offset(),
            plan.output_range(segment).start,
            segment.len()
        );
    }

    Ok(())
}
